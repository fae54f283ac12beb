use serde::{Deserialize, Serialize};

use crate::pr::{PullRequestRecord, PullRequestStatus};

/// Category of a failed build cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    Timeout,
    ConnectionFailure,
    Unknown,
}

impl FailureKind {
    /// Text shown to the user for this kind of failure.
    pub fn message(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "Timed out while fetching pull requests from Bitbucket",
            FailureKind::ConnectionFailure => "Could not connect to Bitbucket",
            FailureKind::Unknown => "Unknown error while fetching pull requests",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::ConnectionFailure => write!(f, "connection failure"),
            FailureKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Failure captured by a build cycle instead of being propagated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverviewFailure {
    pub kind: FailureKind,
    /// User-facing summary
    pub message: String,
    /// Display text of the underlying error
    pub cause: String,
    /// Pipeline that failed plus the error's source chain
    pub context: String,
}

/// Result of one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overview {
    /// Pull requests awaiting the user's review, in source order
    pub to_review: Vec<PullRequestRecord>,
    /// Pull requests authored by the user, each with its overall status, in source order
    pub authored_needing_attention: Vec<PullRequestRecord>,
    pub failure: Option<OverviewFailure>,
}

impl Overview {
    pub fn failed(failure: OverviewFailure) -> Self {
        Self {
            to_review: Vec::new(),
            authored_needing_attention: Vec::new(),
            failure: Some(failure),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Most actionable status across the authored pull requests.
    pub fn authored_worst_status(&self) -> Option<PullRequestStatus> {
        self.authored_needing_attention
            .iter()
            .map(|pr| pr.overall_status)
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_overview_is_empty() {
        let overview = Overview::default();
        assert!(overview.to_review.is_empty());
        assert!(overview.authored_needing_attention.is_empty());
        assert!(!overview.is_failed());
        assert_eq!(overview.authored_worst_status(), None);
    }

    #[test]
    fn test_failed_overview_has_empty_lists() {
        let overview = Overview::failed(OverviewFailure {
            kind: FailureKind::Timeout,
            message: FailureKind::Timeout.message().to_string(),
            cause: "operation timed out".to_string(),
            context: "fetching REVIEWER pull requests".to_string(),
        });
        assert!(overview.is_failed());
        assert!(overview.to_review.is_empty());
        assert!(overview.authored_needing_attention.is_empty());
    }
}
