pub mod bitbucket;
pub mod fixture;

pub use bitbucket::BitbucketSource;
pub use fixture::FixtureSource;

use async_trait::async_trait;
use thiserror::Error;

use crate::pr::RawPullRequest;

/// Which side of a pull request the current user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Reviewer,
    Author,
}

impl Role {
    pub fn as_query(&self) -> &'static str {
        match self {
            Role::Reviewer => "REVIEWER",
            Role::Author => "AUTHOR",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_query())
    }
}

/// Query filters shared by both pipelines.
#[derive(Debug, Clone)]
pub struct FetchFilter {
    /// Pull request state, e.g. "OPEN"
    pub state: String,
    /// Records requested per page
    pub page_size: u32,
}

impl Default for FetchFilter {
    fn default() -> Self {
        Self {
            state: "OPEN".to_string(),
            page_size: 50,
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("Connection failed: {0}")]
    ConnectionFailure(#[source] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Unknown(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err)
        } else if err.is_connect() {
            FetchError::ConnectionFailure(err)
        } else {
            FetchError::Unknown(err.to_string())
        }
    }
}

/// Collaborator that yields raw pull request records for one role.
///
/// Implementations handle pagination and must bound every request with a timeout.
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    async fn fetch_pull_requests(
        &self,
        role: Role,
        filter: &FetchFilter,
    ) -> Result<Vec<RawPullRequest>, FetchError>;
}
