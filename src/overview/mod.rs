pub mod diff;
pub mod types;

pub use diff::determine_new;
pub use types::{FailureKind, Overview, OverviewFailure};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};

use crate::config::Preferences;
use crate::pr::{self, classify, PullRequestRecord};
use crate::source::{FetchError, FetchFilter, PullRequestSource, Role};

/// Anything that aborts one pipeline.
#[derive(Debug, Error)]
enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Record(#[from] pr::RecordError),
}

impl PipelineError {
    fn kind(&self) -> FailureKind {
        match self {
            PipelineError::Fetch(FetchError::Timeout(_)) => FailureKind::Timeout,
            PipelineError::Fetch(FetchError::ConnectionFailure(_)) => {
                FailureKind::ConnectionFailure
            }
            PipelineError::Fetch(FetchError::Unknown(_)) | PipelineError::Record(_) => {
                FailureKind::Unknown
            }
        }
    }

    fn into_failure(self, role: Role) -> OverviewFailure {
        let kind = self.kind();
        let mut context = format!("while fetching {} pull requests", role);
        let mut source = std::error::Error::source(&self);
        while let Some(err) = source {
            context.push_str(&format!("\n  caused by: {}", err));
            source = err.source();
        }

        OverviewFailure {
            kind,
            message: kind.message().to_string(),
            cause: self.to_string(),
            context,
        }
    }
}

/// Run both pipelines against `source` and package the result.
///
/// Never fails: the first pipeline error is captured on the returned
/// overview and both lists are left empty.
pub async fn build(
    source: &dyn PullRequestSource,
    current_user: &str,
    preferences: &Preferences,
) -> Overview {
    build_at(source, current_user, preferences, Utc::now()).await
}

pub async fn build_at(
    source: &dyn PullRequestSource,
    current_user: &str,
    preferences: &Preferences,
    now: DateTime<Utc>,
) -> Overview {
    let filter = FetchFilter::default();

    let (to_review, authored) = tokio::join!(
        to_review_pipeline(source, &filter, current_user, preferences, now)
            .instrument(info_span!("pipeline", role = "reviewer")),
        authored_pipeline(source, &filter, preferences, now)
            .instrument(info_span!("pipeline", role = "author")),
    );

    // The to-review pipeline has priority when both fail.
    match (to_review, authored) {
        (Ok(to_review), Ok(authored)) => {
            info!(to_review = to_review.len(), authored = authored.len(), "built overview");
            Overview {
                to_review,
                authored_needing_attention: authored,
                failure: None,
            }
        }
        (Err(err), _) => fail(err, Role::Reviewer),
        (_, Err(err)) => fail(err, Role::Author),
    }
}

fn fail(err: PipelineError, role: Role) -> Overview {
    warn!(role = %role, error = %err, "pipeline failed, discarding results of this cycle");
    Overview::failed(err.into_failure(role))
}

async fn to_review_pipeline(
    source: &dyn PullRequestSource,
    filter: &FetchFilter,
    current_user: &str,
    preferences: &Preferences,
    now: DateTime<Utc>,
) -> Result<Vec<PullRequestRecord>, PipelineError> {
    let raw = source.fetch_pull_requests(Role::Reviewer, filter).await?;
    let selected =
        classify::select_to_review(raw, current_user, preferences.omit_reviewed_and_approved)?;
    Ok(pr::normalize_all(selected, preferences.title_abbreviation_length, now)?)
}

async fn authored_pipeline(
    source: &dyn PullRequestSource,
    filter: &FetchFilter,
    preferences: &Preferences,
    now: DateTime<Utc>,
) -> Result<Vec<PullRequestRecord>, PipelineError> {
    let raw = source.fetch_pull_requests(Role::Author, filter).await?;
    let classified = classify::classify_authored(raw)?;
    Ok(pr::normalize_all(classified, preferences.title_abbreviation_length, now)?)
}
