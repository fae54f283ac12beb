pub mod classify;
pub mod types;

pub use types::{PullRequestRecord, PullRequestStatus, RawPullRequest};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use types::UnknownStatus;

const ABBREVIATION_MARKER: &str = "...";

/// A raw record that cannot be turned into a `PullRequestRecord`.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Malformed pull request record: missing {0}")]
    MissingField(&'static str),

    #[error("Malformed pull request record: {0}")]
    UnknownStatus(#[from] UnknownStatus),

    #[error("Malformed pull request record: timestamp {0} is out of range")]
    InvalidTimestamp(i64),
}

/// Normalize one raw record that has already been given its overall status.
///
/// `now` anchors the relative activity label.
pub fn normalize(
    raw: &RawPullRequest,
    overall_status: PullRequestStatus,
    title_budget: usize,
    now: DateTime<Utc>,
) -> Result<PullRequestRecord, RecordError> {
    let id = raw.id.as_ref().ok_or(RecordError::MissingField("id"))?.to_string();
    let title = raw.title.as_deref().ok_or(RecordError::MissingField("title"))?;
    let updated = raw.updated_date.ok_or(RecordError::MissingField("updatedDate"))?;
    let last_activity =
        DateTime::from_timestamp_millis(updated).ok_or(RecordError::InvalidTimestamp(updated))?;

    let from_ref = raw.from_ref.as_ref().ok_or(RecordError::MissingField("fromRef"))?;
    let to_ref = raw.to_ref.as_ref().ok_or(RecordError::MissingField("toRef"))?;
    let repository = to_ref
        .repository
        .as_ref()
        .ok_or(RecordError::MissingField("toRef.repository"))?;

    let source_branch = from_ref
        .display_id
        .clone()
        .ok_or(RecordError::MissingField("fromRef.displayId"))?;
    let target_branch = to_ref
        .display_id
        .clone()
        .ok_or(RecordError::MissingField("toRef.displayId"))?;
    let repository_slug = repository
        .slug
        .clone()
        .ok_or(RecordError::MissingField("toRef.repository.slug"))?;
    let repository_link = repository
        .links
        .as_ref()
        .and_then(|l| l.first_href())
        .ok_or(RecordError::MissingField("toRef.repository.links.self"))?
        .to_string();
    let self_link = raw
        .links
        .as_ref()
        .and_then(|l| l.first_href())
        .ok_or(RecordError::MissingField("links.self"))?
        .to_string();

    debug!(slug = %repository_slug, id = %id, status = %overall_status, "normalized pull request");

    Ok(PullRequestRecord {
        id,
        title: abbreviate(title, title_budget),
        source_branch,
        target_branch,
        repository_slug,
        overall_status,
        last_activity,
        last_activity_label: time_ago(last_activity, now),
        repository_link,
        self_link,
    })
}

/// Normalize a whole classified batch. One malformed record rejects the batch.
pub fn normalize_all(
    classified: Vec<(RawPullRequest, PullRequestStatus)>,
    title_budget: usize,
    now: DateTime<Utc>,
) -> Result<Vec<PullRequestRecord>, RecordError> {
    classified
        .iter()
        .map(|(raw, status)| normalize(raw, *status, title_budget, now))
        .collect()
}

/// Cut `text` to at most `budget` characters, marker included.
pub fn abbreviate(text: &str, budget: usize) -> String {
    let len = text.chars().count();
    if len <= budget {
        return text.to_string();
    }

    let marker_len = ABBREVIATION_MARKER.chars().count();
    if budget < marker_len {
        return text.chars().take(budget).collect();
    }

    let mut out: String = text.chars().take(budget - marker_len).collect();
    out.push_str(ABBREVIATION_MARKER);
    out
}

/// Human-readable distance between `then` and `now`, e.g. "3 hours ago".
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(then);
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        plural(minutes, "minute")
    } else if hours < 24 {
        plural(hours, "hour")
    } else if days < 30 {
        plural(days, "day")
    } else if days < 360 {
        plural(days / 30, "month")
    } else {
        plural((days / 365).max(1), "year")
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", n, unit)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    /// Raw record as the dashboard endpoint returns it, minus reviewers.
    pub fn raw_pr(slug: &str, id: u64, title: &str) -> RawPullRequest {
        let repository_link = format!("https://bb.example.com/projects/P/repos/{}/browse", slug);
        let self_link = format!(
            "https://bb.example.com/projects/P/repos/{}/pull-requests/{}",
            slug, id
        );
        let json = serde_json::json!({
            "id": id,
            "title": title,
            "updatedDate": 1_700_000_000_000_i64,
            "reviewers": [],
            "fromRef": { "displayId": "feature/x" },
            "toRef": {
                "displayId": "master",
                "repository": {
                    "slug": slug,
                    "links": { "self": [{ "href": repository_link }] }
                }
            },
            "links": { "self": [{ "href": self_link }] }
        });
        serde_json::from_value(json).unwrap()
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000).unwrap() + Duration::hours(3)
    }

    #[test]
    fn test_normalize_copies_fields() {
        let raw = raw_pr("core", 42, "Add retry to uploader");
        let record = normalize(&raw, PullRequestStatus::NeedsWork, 40, now()).unwrap();

        assert_eq!(record.id, "42");
        assert_eq!(record.title, "Add retry to uploader");
        assert_eq!(record.source_branch, "feature/x");
        assert_eq!(record.target_branch, "master");
        assert_eq!(record.repository_slug, "core");
        assert_eq!(record.overall_status, PullRequestStatus::NeedsWork);
        assert_eq!(record.last_activity.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(record.last_activity_label, "3 hours ago");
        assert_eq!(record.repository_link, "https://bb.example.com/projects/P/repos/core/browse");
        assert_eq!(
            record.self_link,
            "https://bb.example.com/projects/P/repos/core/pull-requests/42"
        );
        assert_eq!(record.identity(), "core-42");
    }

    #[test]
    fn test_normalize_string_id() {
        let mut raw = raw_pr("core", 1, "t");
        raw.id = Some(types::RawId::Text("abc".to_string()));
        let record = normalize(&raw, PullRequestStatus::Unapproved, 40, now()).unwrap();
        assert_eq!(record.id, "abc");
    }

    #[test]
    fn test_normalize_missing_fields_fail() {
        let mut no_id = raw_pr("core", 1, "t");
        no_id.id = None;
        assert!(matches!(
            normalize(&no_id, PullRequestStatus::Unapproved, 40, now()),
            Err(RecordError::MissingField("id"))
        ));

        let mut no_date = raw_pr("core", 1, "t");
        no_date.updated_date = None;
        assert!(matches!(
            normalize(&no_date, PullRequestStatus::Unapproved, 40, now()),
            Err(RecordError::MissingField("updatedDate"))
        ));

        let mut no_link = raw_pr("core", 1, "t");
        no_link.links = None;
        assert!(matches!(
            normalize(&no_link, PullRequestStatus::Unapproved, 40, now()),
            Err(RecordError::MissingField("links.self"))
        ));
    }

    #[test]
    fn test_normalize_all_is_strict() {
        let good = raw_pr("core", 1, "ok");
        let mut bad = raw_pr("core", 2, "broken");
        bad.to_ref = None;
        let batch = vec![
            (good, PullRequestStatus::Unapproved),
            (bad, PullRequestStatus::Unapproved),
        ];
        assert!(normalize_all(batch, 40, now()).is_err());
    }

    #[test]
    fn test_identity_is_injective_over_fixtures() {
        let records: Vec<_> = [("core", 1), ("core", 11), ("core-1", 1), ("web", 1)]
            .iter()
            .map(|(slug, id)| {
                let raw = raw_pr(slug, *id, "t");
                normalize(&raw, PullRequestStatus::Unapproved, 40, now()).unwrap()
            })
            .collect();
        let ids: std::collections::HashSet<_> = records.iter().map(|r| r.identity()).collect();
        assert_eq!(ids.len(), records.len());
    }

    #[test]
    fn test_abbreviate_short_title_untouched() {
        assert_eq!(abbreviate("Fix typo", 10), "Fix typo");
        assert_eq!(abbreviate("0123456789", 10), "0123456789");
    }

    #[test]
    fn test_abbreviate_long_title_hits_budget_exactly() {
        let out = abbreviate("Refactor the upload pipeline", 12);
        assert_eq!(out, "Refactor ...");
        assert_eq!(out.chars().count(), 12);
    }

    #[test]
    fn test_abbreviate_counts_characters_not_bytes() {
        let out = abbreviate("Überarbeitung der Übersicht", 8);
        assert_eq!(out, "Übera...");
        assert_eq!(out.chars().count(), 8);
    }

    #[test]
    fn test_abbreviate_tiny_budget_has_no_marker() {
        assert_eq!(abbreviate("abcdef", 2), "ab");
        assert_eq!(abbreviate("abcdef", 0), "");
    }

    #[test]
    fn test_time_ago_labels() {
        let now = now();
        assert_eq!(time_ago(now, now), "just now");
        assert_eq!(time_ago(now + Duration::minutes(5), now), "just now");
        assert_eq!(time_ago(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(time_ago(now - Duration::minutes(59), now), "59 minutes ago");
        assert_eq!(time_ago(now - Duration::hours(3), now), "3 hours ago");
        assert_eq!(time_ago(now - Duration::days(2), now), "2 days ago");
        assert_eq!(time_ago(now - Duration::days(65), now), "2 months ago");
        assert_eq!(time_ago(now - Duration::days(400), now), "1 year ago");
    }

    #[test]
    fn test_time_ago_never_reaches_twelve_months() {
        let now = now();
        assert_eq!(time_ago(now - Duration::days(359), now), "11 months ago");
        assert_eq!(time_ago(now - Duration::days(360), now), "1 year ago");
        assert_eq!(time_ago(now - Duration::days(364), now), "1 year ago");
        assert_eq!(time_ago(now - Duration::days(730), now), "2 years ago");
    }
}
