use tracing::{info, instrument, warn};

use crate::config::Preferences;
use crate::overview::{self, Overview};
use crate::pr::PullRequestRecord;
use crate::source::PullRequestSource;
use crate::store::{SnapshotStore, StoreError};

/// Outcome of one poll cycle.
#[derive(Debug)]
pub struct Cycle {
    pub overview: Overview,
    /// Pull requests to review that were not in the previous snapshot
    pub new_to_review: Vec<PullRequestRecord>,
}

/// Load the previous snapshot, build a fresh overview, diff, and persist.
///
/// Every overview is persisted, a failed one included, replacing the previous
/// snapshot. The save result is returned next to the cycle so the caller can
/// render before surfacing a persistence error.
#[instrument(skip_all, fields(user = %current_user))]
pub async fn poll(
    source: &dyn PullRequestSource,
    current_user: &str,
    preferences: &Preferences,
    store: &dyn SnapshotStore,
) -> (Cycle, Result<(), StoreError>) {
    let previous = store.load();
    let overview = overview::build(source, current_user, preferences).await;

    if let Some(failure) = &overview.failure {
        warn!(kind = %failure.kind, cause = %failure.cause, "cycle failed");
    }

    let new_to_review = overview::determine_new(&overview, &previous);
    info!(new = new_to_review.len(), "compared against previous snapshot");

    let saved = store.save(&overview);
    (
        Cycle {
            overview,
            new_to_review,
        },
        saved,
    )
}
