use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use super::{FetchError, FetchFilter, PullRequestSource, Role};
use crate::pr::RawPullRequest;

/// Dashboard endpoint listing pull requests the authenticated user takes part in.
pub const DASHBOARD_PULL_REQUESTS: &str = "/rest/api/1.0/dashboard/pull-requests";

/// Upper bound on pages followed for one role.
pub const MAX_PAGES: usize = 1000;

/// One page of the Bitbucket Server paged API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default)]
    pub values: Vec<RawPullRequest>,
    pub is_last_page: bool,
    pub next_page_start: Option<u64>,
}

impl Page {
    /// Start offset of the following page, `None` once the last page was read.
    pub fn next_start(&self) -> Result<Option<u64>, FetchError> {
        if self.is_last_page {
            return Ok(None);
        }
        self.next_page_start.map(Some).ok_or_else(|| {
            FetchError::Unknown("page is not the last but has no nextPageStart".to_string())
        })
    }
}

/// Bitbucket Server REST client for the dashboard pull request listing.
pub struct BitbucketSource {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl BitbucketSource {
    /// Every request made through this source is bounded by `timeout`.
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("review-radar")
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    async fn fetch_page(
        &self,
        role: Role,
        filter: &FetchFilter,
        start: u64,
    ) -> Result<Page, FetchError> {
        let url = format!("{}{}", self.base_url, DASHBOARD_PULL_REQUESTS);
        let limit = filter.page_size.to_string();
        let start = start.to_string();

        let page = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[
                ("limit", limit.as_str()),
                ("state", filter.state.as_str()),
                ("role", role.as_query()),
                ("start", start.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<Page>()
            .await?;
        Ok(page)
    }
}

#[async_trait]
impl PullRequestSource for BitbucketSource {
    #[instrument(skip_all, fields(role = %role))]
    async fn fetch_pull_requests(
        &self,
        role: Role,
        filter: &FetchFilter,
    ) -> Result<Vec<RawPullRequest>, FetchError> {
        let mut pull_requests = Vec::new();
        let mut start = 0;
        let mut pages = 0;

        loop {
            let page = self.fetch_page(role, filter, start).await?;
            pages += 1;
            debug!(start, received = page.values.len(), last = page.is_last_page, "received page");
            let next = page.next_start()?;
            pull_requests.extend(page.values);

            match next {
                None => break,
                Some(next) if next <= start => {
                    return Err(FetchError::Unknown(format!(
                        "nextPageStart {} does not advance past {}",
                        next, start
                    )));
                }
                Some(_) if pages >= MAX_PAGES => {
                    return Err(FetchError::Unknown(format!("gave up after {} pages", MAX_PAGES)));
                }
                Some(next) => start = next,
            }
        }

        debug!(total = pull_requests.len(), "fetched all pages");
        Ok(pull_requests)
    }
}
