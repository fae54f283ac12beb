use crate::overview::OverviewFailure;
use crate::pr::{PullRequestRecord, PullRequestStatus};

/// One pull request line in the report.
#[derive(Debug, Clone)]
pub struct Entry {
    pub record: PullRequestRecord,
    /// Not present in the previous snapshot
    pub is_new: bool,
}

/// Everything a renderer needs for one poll cycle.
#[derive(Debug)]
pub struct Report {
    pub to_review: Vec<Entry>,
    pub authored: Vec<Entry>,
    /// Pull requests to review that are new since the last check
    pub new_count: usize,
    /// Most actionable status among authored pull requests
    pub authored_worst: Option<PullRequestStatus>,
    pub failure: Option<OverviewFailure>,
}
