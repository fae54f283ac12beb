pub mod types;

pub use types::{Entry, Report};

use crate::overview::Overview;
use crate::pr::{PullRequestRecord, PullRequestStatus};
use colored::Colorize;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Pair an overview with the pull requests the differ flagged as new.
pub fn build(overview: &Overview, new_to_review: &[PullRequestRecord], only_new: bool) -> Report {
    let new_ids: HashSet<String> = new_to_review.iter().map(|pr| pr.identity()).collect();

    let to_review = overview
        .to_review
        .iter()
        .map(|pr| Entry {
            is_new: new_ids.contains(&pr.identity()),
            record: pr.clone(),
        })
        .filter(|entry| !only_new || entry.is_new)
        .collect();

    let authored = overview
        .authored_needing_attention
        .iter()
        .map(|pr| Entry {
            is_new: false,
            record: pr.clone(),
        })
        .collect();

    Report {
        to_review,
        authored,
        new_count: new_ids.len(),
        authored_worst: overview.authored_worst_status(),
        failure: overview.failure.clone(),
    }
}

/// Output the report to terminal (default) or to a markdown file.
#[instrument(skip(report), fields(to_review = report.to_review.len(), new = report.new_count))]
pub fn output(report: &Report, output_path: Option<&Path>) -> Result<(), ReportError> {
    match output_path {
        None => {
            debug!("writing report to terminal");
            print_terminal_report(report);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing report to file");
            write_markdown_report(report, path)
        }
    }
}

/// Format and print the report to the terminal with colors.
///
/// ═══ To review: 3 (1 new) ═══
/// ● NEW [core] Add exponential backoff... feature/x → master · 3 hours ago
///       https://bitbucket.example.com/projects/PLAT/repos/core/pull-requests/101
fn print_terminal_report(report: &Report) {
    println!();
    if let Some(failure) = &report.failure {
        println!("{}", format!("✗ {} ({})", failure.message, failure.kind).red().bold());
        println!("  {}", failure.cause);
        println!();
        return;
    }

    println!(
        "═══ To review: {} ({} new) ═══",
        report.to_review.len(),
        report.new_count
    );
    if report.to_review.is_empty() {
        println!("  Nothing to review.");
    }
    for entry in &report.to_review {
        print_entry(entry);
    }
    println!();

    let worst = report
        .authored_worst
        .map(|s| colorize_status(s).to_string())
        .unwrap_or_else(|| "-".to_string());
    println!("═══ Authored: {} (worst: {}) ═══", report.authored.len(), worst);
    if report.authored.is_empty() {
        println!("  No open pull requests.");
    }
    for entry in &report.authored {
        print_entry(entry);
    }
    println!();
}

fn print_entry(entry: &Entry) {
    let pr = &entry.record;
    let tag = if entry.is_new {
        format!("{} ", "NEW".cyan().bold())
    } else {
        String::new()
    };
    println!(
        "{} {}[{}] {} {} → {} · {}",
        status_marker(pr.overall_status),
        tag,
        pr.repository_slug,
        pr.title,
        pr.source_branch.dimmed(),
        pr.target_branch.dimmed(),
        pr.last_activity_label
    );
    println!("      {}", pr.self_link.underline());
}

/// Write the report as a markdown file.
fn write_markdown_report(report: &Report, path: &Path) -> Result<(), ReportError> {
    let mut md = String::new();

    if let Some(failure) = &report.failure {
        md.push_str(&format!("# {}\n\n", failure.message));
        md.push_str(&format!("**Cause:** {}\n\n", failure.cause));
        md.push_str(&format!("```\n{}\n```\n", failure.context));
        std::fs::write(path, md)?;
        return Ok(());
    }

    md.push_str(&format!(
        "## To review ({}, {} new)\n\n",
        report.to_review.len(),
        report.new_count
    ));
    for entry in &report.to_review {
        md.push_str(&markdown_entry(entry));
    }
    md.push('\n');

    md.push_str(&format!("## Authored ({})\n\n", report.authored.len()));
    for entry in &report.authored {
        md.push_str(&markdown_entry(entry));
    }

    std::fs::write(path, md)?;
    Ok(())
}

fn markdown_entry(entry: &Entry) -> String {
    let pr = &entry.record;
    let tag = if entry.is_new { " **NEW**" } else { "" };
    format!(
        "- **[{}]**{} [{}]({}) `{}` → `{}` · {} ([all]({}))\n",
        pr.overall_status,
        tag,
        pr.title,
        pr.self_link,
        pr.source_branch,
        pr.target_branch,
        pr.last_activity_label,
        pr.pull_requests_link()
    )
}

fn status_marker(status: PullRequestStatus) -> colored::ColoredString {
    match status {
        PullRequestStatus::NeedsWork => "●".yellow(),
        PullRequestStatus::Unapproved => "●".white(),
        PullRequestStatus::Approved => "●".green(),
    }
}

fn colorize_status(status: PullRequestStatus) -> colored::ColoredString {
    let label = status.to_string();
    match status {
        PullRequestStatus::NeedsWork => label.yellow().bold(),
        PullRequestStatus::Unapproved => label.white().bold(),
        PullRequestStatus::Approved => label.green().bold(),
    }
}
