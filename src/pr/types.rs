use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Review state of a pull request, either for one reviewer or derived overall.
///
/// Variants are declared in ascending "needs attention" order so that
/// `Ord` / `max()` pick the most actionable status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PullRequestStatus {
    Approved,
    Unapproved,
    NeedsWork,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown pull request status: {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for PullRequestStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNAPPROVED" => Ok(PullRequestStatus::Unapproved),
            "NEEDS_WORK" => Ok(PullRequestStatus::NeedsWork),
            "APPROVED" => Ok(PullRequestStatus::Approved),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for PullRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PullRequestStatus::Unapproved => write!(f, "UNAPPROVED"),
            PullRequestStatus::NeedsWork => write!(f, "NEEDS_WORK"),
            PullRequestStatus::Approved => write!(f, "APPROVED"),
        }
    }
}

/// Normalized pull request as shown to the user and stored in snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRecord {
    /// Pull request number within its repository, as a string
    pub id: String,
    /// Title, abbreviated to the configured budget
    pub title: String,
    pub source_branch: String,
    pub target_branch: String,
    /// Slug of the target repository
    pub repository_slug: String,
    pub overall_status: PullRequestStatus,
    pub last_activity: DateTime<Utc>,
    /// e.g. "3 hours ago", relative to construction time
    pub last_activity_label: String,
    /// Browse link of the target repository
    pub repository_link: String,
    /// Link to the pull request itself
    pub self_link: String,
}

impl PullRequestRecord {
    /// Diff key, unique per repository + pull request number.
    pub fn identity(&self) -> String {
        format!("{}-{}", self.repository_slug, self.id)
    }

    /// Link to the repository's pull request list.
    pub fn pull_requests_link(&self) -> String {
        self.repository_link.replace("browse", "pull-requests")
    }
}

/// Pull request as returned by the Bitbucket Server dashboard API.
///
/// Every field is optional here; presence is enforced when the record is
/// normalized so that a missing field can be reported by name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPullRequest {
    pub id: Option<RawId>,
    pub title: Option<String>,
    pub updated_date: Option<i64>,
    #[serde(default)]
    pub reviewers: Vec<RawReviewer>,
    pub from_ref: Option<RawRef>,
    pub to_ref: Option<RawRef>,
    pub links: Option<RawLinks>,
}

/// Pull request ids arrive as numbers, but older exports carry strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(u64),
    Text(String),
}

impl std::fmt::Display for RawId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawId::Number(n) => write!(f, "{}", n),
            RawId::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReviewer {
    pub user: Option<RawUser>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUser {
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRef {
    pub display_id: Option<String>,
    pub repository: Option<RawRepository>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRepository {
    pub slug: Option<String>,
    pub links: Option<RawLinks>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLinks {
    #[serde(rename = "self", default)]
    pub self_links: Vec<RawHref>,
}

impl RawLinks {
    pub fn first_href(&self) -> Option<&str> {
        self.self_links.first().and_then(|l| l.href.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawHref {
    pub href: Option<String>,
}
