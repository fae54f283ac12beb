use super::types::{PullRequestStatus, RawPullRequest};
use super::RecordError;

/// Status of `current_user`'s own reviewer entry on `pr`.
///
/// Returns `Ok(None)` when the user is not a reviewer of the pull request,
/// or when `omit_reviewed_and_approved` is set and the user already approved.
pub fn reviewer_status(
    pr: &RawPullRequest,
    current_user: &str,
    omit_reviewed_and_approved: bool,
) -> Result<Option<PullRequestStatus>, RecordError> {
    let Some(entry) = pr
        .reviewers
        .iter()
        .find(|r| r.user.as_ref().and_then(|u| u.slug.as_deref()) == Some(current_user))
    else {
        return Ok(None);
    };

    let status = parse_status(entry.status.as_deref())?;
    if omit_reviewed_and_approved && status == PullRequestStatus::Approved {
        return Ok(None);
    }
    Ok(Some(status))
}

/// Overall status of an authored pull request from all reviewer statuses.
///
/// Precedence, first match wins:
/// 1. any `NeedsWork` -> `NeedsWork`
/// 2. no `Approved` at all -> `Approved`
/// 3. otherwise -> `Unapproved`
///
/// Rule 2 looks inverted (nobody approved, yet the result is `Approved`), but
/// it is the behavior users of the authored list currently see and is kept
/// until the intended mapping is confirmed.
pub fn author_status<I>(statuses: I) -> PullRequestStatus
where
    I: IntoIterator<Item = PullRequestStatus>,
{
    let mut any_needs_work = false;
    let mut any_approved = false;
    for status in statuses {
        match status {
            PullRequestStatus::NeedsWork => any_needs_work = true,
            PullRequestStatus::Approved => any_approved = true,
            PullRequestStatus::Unapproved => {}
        }
    }

    if any_needs_work {
        PullRequestStatus::NeedsWork
    } else if !any_approved {
        PullRequestStatus::Approved
    } else {
        PullRequestStatus::Unapproved
    }
}

/// Parse every reviewer status on `pr` and derive the author-perspective status.
pub fn authored_status(pr: &RawPullRequest) -> Result<PullRequestStatus, RecordError> {
    let statuses = pr
        .reviewers
        .iter()
        .map(|r| parse_status(r.status.as_deref()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(author_status(statuses))
}

/// Keep only pull requests the user still has to review, annotated with their status.
pub fn select_to_review(
    prs: Vec<RawPullRequest>,
    current_user: &str,
    omit_reviewed_and_approved: bool,
) -> Result<Vec<(RawPullRequest, PullRequestStatus)>, RecordError> {
    let mut selected = Vec::new();
    for pr in prs {
        if let Some(status) = reviewer_status(&pr, current_user, omit_reviewed_and_approved)? {
            selected.push((pr, status));
        }
    }
    Ok(selected)
}

/// Annotate every authored pull request with its overall status. Nothing is filtered.
pub fn classify_authored(
    prs: Vec<RawPullRequest>,
) -> Result<Vec<(RawPullRequest, PullRequestStatus)>, RecordError> {
    prs.into_iter()
        .map(|pr| authored_status(&pr).map(|status| (pr, status)))
        .collect()
}

fn parse_status(raw: Option<&str>) -> Result<PullRequestStatus, RecordError> {
    let raw = raw.ok_or(RecordError::MissingField("reviewers[].status"))?;
    Ok(raw.parse()?)
}
