use std::collections::HashSet;

use super::types::Overview;
use crate::pr::PullRequestRecord;

/// Pull requests to review in `current` whose identity is absent from `previous`.
///
/// Order follows `current`. Only the to-review list is compared; authored
/// pull requests are shown in full every cycle.
pub fn determine_new(current: &Overview, previous: &Overview) -> Vec<PullRequestRecord> {
    let seen: HashSet<String> = previous.to_review.iter().map(|pr| pr.identity()).collect();

    current
        .to_review
        .iter()
        .filter(|pr| !seen.contains(&pr.identity()))
        .cloned()
        .collect()
}
