//! start-review: detect labels and submit human review jobs

use anyhow::{Context, Result};
use clap::Parser;
use clf_review::config::ReviewConfig;
use clf_review::services::{FsObjectStore, HttpDetector, HttpJobService};
use clf_review::StartWorkflow;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "start-review", version, about = "Detect custom labels and start review jobs")]
struct Args {
    /// Configuration file (falls back to CLF_CONFIG, then the default locations)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reuse a run id instead of generating one
    #[arg(long)]
    run_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ReviewConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    clf_common::logging::init_tracing(&config.logging).context("Failed to initialize logging")?;

    info!("Starting start-review v{}", env!("CARGO_PKG_VERSION"));

    let settings = config.start_settings().context("Invalid configuration")?;

    let detector = HttpDetector::new(
        config.detector.require_endpoint("detector")?,
        settings.project_version_arn.as_str(),
        config.detector.timeout(),
    )
    .context("Failed to create detector client")?
    .with_min_confidence(settings.minimum_confidence)
    .with_max_results(settings.max_labels);

    let job_service = HttpJobService::new(
        config.job_service.require_endpoint("job_service")?,
        config.job_service.timeout(),
    )
    .context("Failed to create labeling job client")?;

    info!(root = %config.storage.root.display(), "Object store");
    let store = FsObjectStore::new(config.storage.root.clone());

    let workflow = StartWorkflow::new(Arc::new(store), Arc::new(detector), Arc::new(job_service), settings)
        .with_listing(config.listing.clone())
        .with_templates(config.templates.clone());

    let outcome = match args.run_id {
        Some(run_id) => workflow.execute_run(&run_id).await,
        None => workflow.execute().await,
    }
    .context("Review run failed")?;

    info!(
        run_id = %outcome.run_id,
        images = outcome.images,
        bounding_box_jobs = outcome.descriptor.bounding_box_jobs.len(),
        "Run started"
    );

    println!("Jobs manifest: {}", outcome.jobs_descriptor);
    println!();
    println!("When the review jobs are done, run:");
    println!("  collect-review --jobs-manifest {}", outcome.jobs_descriptor);

    Ok(())
}
