//! collect-review: wait for review jobs and build the final manifest

use anyhow::{Context, Result};
use clap::Parser;
use clf_common::ObjectUri;
use clf_review::config::ReviewConfig;
use clf_review::services::{FsObjectStore, HttpJobService};
use clf_review::CollectWorkflow;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "collect-review", version, about = "Collect review results into one manifest")]
struct Args {
    /// Configuration file (falls back to CLF_CONFIG, then the default locations)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Jobs manifest written by start-review, s3://bucket/key
    #[arg(long)]
    jobs_manifest: ObjectUri,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ReviewConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    clf_common::logging::init_tracing(&config.logging).context("Failed to initialize logging")?;

    info!("Starting collect-review v{}", env!("CARGO_PKG_VERSION"));

    let job_service = HttpJobService::new(
        config.job_service.require_endpoint("job_service")?,
        config.job_service.timeout(),
    )
    .context("Failed to create labeling job client")?;
    let store = FsObjectStore::new(config.storage.root.clone());

    let workflow = CollectWorkflow::new(
        Arc::new(store),
        Arc::new(job_service),
        config.labeling.poll_interval(),
    )
    .with_poll_timeout(config.labeling.poll_timeout());

    let outcome = workflow
        .execute(&args.jobs_manifest)
        .await
        .with_context(|| format!("Failed to collect {}", args.jobs_manifest))?;

    info!(
        records = outcome.records,
        statuses = outcome.status_log.len(),
        "Collect complete"
    );

    println!("Output manifest: {}", outcome.output);
    println!("Download: {}", outcome.presigned_url);

    Ok(())
}
