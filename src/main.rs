mod config;
mod cycle;
mod overview;
mod pr;
mod report;
mod source;
mod store;

use clap::Parser;
use std::path::PathBuf;
use tracing::{info, info_span};
use tracing_subscriber::EnvFilter;

use source::{BitbucketSource, FixtureSource, PullRequestSource};
use store::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};

/// Review Radar — polls Bitbucket for pull requests waiting on your review
/// and for your own pull requests that reviewers flagged, and highlights
/// what appeared since the last check.
#[derive(Parser, Debug)]
#[command(name = "review-radar", version, about)]
struct Cli {
    /// Config file (default: .review-radar.toml in the current directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Snapshot file used to detect new pull requests (overrides [cache] path)
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Do not read or write a snapshot; everything is reported as new
    #[arg(long)]
    no_cache: bool,

    /// Only list pull requests to review that are new since the last check
    #[arg(long)]
    only_new: bool,

    /// Optional output file path for a markdown report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Use built-in fixture data instead of a Bitbucket server
    #[arg(long)]
    r#mock: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = config::Config::load(cli.config.as_deref())?;

    let (source, current_user): (Box<dyn PullRequestSource>, String) = if cli.r#mock {
        info!("using fixture pull requests for demo");
        let user = config
            .bitbucket
            .user_slug
            .clone()
            .unwrap_or_else(|| source::fixture::FIXTURE_USER.to_string());
        (Box::new(FixtureSource), user)
    } else {
        let live = config.live_settings()?;
        let client = BitbucketSource::new(&live.api_base_url, &live.token, live.request_timeout)?;
        (Box::new(client), live.user_slug)
    };

    let store: Box<dyn SnapshotStore> = if cli.no_cache {
        Box::new(MemorySnapshotStore::default())
    } else {
        let file_store = match cli.cache.clone().or_else(|| config.cache.path.clone()) {
            Some(path) => FileSnapshotStore::new(path),
            None => FileSnapshotStore::open_default()?,
        };
        info!(path = %file_store.path().display(), "using snapshot file");
        Box::new(file_store)
    };

    let _cycle_span = info_span!("poll_cycle", user = %current_user).entered();

    let (cycle, saved) = cycle::poll(
        source.as_ref(),
        &current_user,
        &config.preferences,
        store.as_ref(),
    )
    .await;

    let built_report = report::build(&cycle.overview, &cycle.new_to_review, cli.only_new);
    report::output(&built_report, cli.output.as_deref())?;

    if let Err(err) = saved {
        tracing::error!(
            error = %err,
            "snapshot was not saved; the same pull requests will be reported as new next time"
        );
        return Err(err.into());
    }

    info!(
        to_review = cycle.overview.to_review.len(),
        new = cycle.new_to_review.len(),
        failed = cycle.overview.is_failed(),
        "done"
    );
    Ok(())
}
