use async_trait::async_trait;
use tracing::debug;

use super::bitbucket::Page;
use super::{FetchError, FetchFilter, PullRequestSource, Role};
use crate::pr::RawPullRequest;

/// User slug the embedded fixtures are written for.
pub const FIXTURE_USER: &str = "jdoe";

const REVIEWER_PAGE: &str = include_str!("../../tests/fixtures/reviewer_page.json");
const AUTHOR_PAGE: &str = include_str!("../../tests/fixtures/author_page.json");

/// Offline source serving the embedded dashboard pages, for `--mock` runs.
#[derive(Debug, Default)]
pub struct FixtureSource;

#[async_trait]
impl PullRequestSource for FixtureSource {
    async fn fetch_pull_requests(
        &self,
        role: Role,
        _filter: &FetchFilter,
    ) -> Result<Vec<RawPullRequest>, FetchError> {
        let body = match role {
            Role::Reviewer => REVIEWER_PAGE,
            Role::Author => AUTHOR_PAGE,
        };
        let page: Page =
            serde_json::from_str(body).map_err(|e| FetchError::Unknown(e.to_string()))?;
        debug!(role = %role, records = page.values.len(), "serving fixture page");
        Ok(page.values)
    }
}
