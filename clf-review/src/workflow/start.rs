//! Start phase: detect, group, batch, submit
//!
//! Phases:
//! 1. List images under the configured prefix
//! 2. Analyze in bounded chunks and group the results
//! 3. Write the no-label manifest
//! 4. Write bounding-box batches and submit one adjustment job per batch
//! 5. Write label-verification shards and submit the verification job
//! 6. Write the jobs descriptor

use super::artifacts::ArtifactWriter;
use crate::analysis::{GroupedDetections, ImageAnalyzer};
use crate::batching::{BoundingBoxBatcher, LabelVerificationBatcher};
use crate::config::{ListingConfig, StartSettings, TemplateConfig};
use crate::models::{JobStatusLog, JobsDescriptor, RunLayout};
use crate::services::{templates, LabelDetector, LabelingJobRequest, LabelingJobService, ObjectStore, Workforce};
use clf_common::{ObjectUri, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// What a start run produced
#[derive(Debug, Clone)]
pub struct StartOutcome {
    pub run_id: String,
    pub jobs_descriptor: ObjectUri,
    pub descriptor: JobsDescriptor,
    pub images: usize,
    pub status_log: JobStatusLog,
}

/// Detection-to-submission workflow
pub struct StartWorkflow {
    store: Arc<dyn ObjectStore>,
    detector: Arc<dyn LabelDetector>,
    job_service: Arc<dyn LabelingJobService>,
    settings: StartSettings,
    listing: ListingConfig,
    templates: TemplateConfig,
}

impl StartWorkflow {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        detector: Arc<dyn LabelDetector>,
        job_service: Arc<dyn LabelingJobService>,
        settings: StartSettings,
    ) -> Self {
        Self {
            store,
            detector,
            job_service,
            settings,
            listing: ListingConfig::default(),
            templates: TemplateConfig::default(),
        }
    }

    pub fn with_listing(mut self, listing: ListingConfig) -> Self {
        self.listing = listing;
        self
    }

    pub fn with_templates(mut self, templates: TemplateConfig) -> Self {
        self.templates = templates;
        self
    }

    /// Run under a fresh run id
    pub async fn execute(&self) -> Result<StartOutcome> {
        let run_id = clf_common::uuid_utils::generate_run_id();
        self.execute_run(&run_id).await
    }

    pub async fn execute_run(&self, run_id: &str) -> Result<StartOutcome> {
        let layout = RunLayout::new(run_id);
        let bucket = self.settings.output_bucket.as_str();
        let writer = ArtifactWriter::new(self.store.as_ref(), bucket, &layout);
        let mut status_log = JobStatusLog::new();

        info!(run_id, region = %self.settings.region, "Starting review run");

        // Phase 1: images
        let images = self.list_images().await?;
        if images.is_empty() {
            warn!(images = %self.settings.images, "No images found");
        }

        // Phase 2: detection + grouping
        info!("Analyzing images...");
        let analyzer = ImageAnalyzer::new(Arc::clone(&self.detector), self.settings.concurrency_control);
        let grouped = analyzer.analyze(&images).await;

        let mut descriptor = JobsDescriptor::new(run_id);

        // Phase 3: no-label manifest
        let creation_date = clf_common::time::creation_date(clf_common::time::now());
        descriptor.no_labels_manifest = writer.write_no_labels(&grouped.no_labels, &creation_date).await?;

        // Phase 4: bounding-box adjustment
        if !grouped.bounding_box_groups.is_empty() {
            descriptor.bounding_box_jobs = self
                .start_bounding_box_jobs(&grouped, &layout, &writer, &mut status_log)
                .await?;
        }

        // Phase 5: label verification
        if !grouped.label_groups.is_empty() {
            let job = self
                .start_label_verification_job(&grouped, &layout, &writer, &mut status_log)
                .await?;
            descriptor.label_verification_job = Some(job);
        }

        // Phase 6: hand-off
        let jobs_descriptor = writer.write_jobs_descriptor(&descriptor).await?;
        info!(uri = %jobs_descriptor, "Jobs manifest generated");

        Ok(StartOutcome {
            run_id: run_id.to_string(),
            jobs_descriptor,
            descriptor,
            images: images.len(),
            status_log,
        })
    }

    async fn list_images(&self) -> Result<Vec<ObjectUri>> {
        let source = &self.settings.images;
        info!(bucket = %source.bucket, prefix = %source.key, "Getting image list...");

        let keys = self
            .store
            .list(
                &source.bucket,
                &source.key,
                self.listing.max_pages,
                &self.listing.allowed_extensions,
            )
            .await?;

        info!(total = keys.len(), "Total images: {}", keys.len());
        Ok(keys
            .into_iter()
            .map(|key| ObjectUri::new(source.bucket.as_str(), key))
            .collect())
    }

    fn workforce(&self) -> Workforce {
        Workforce {
            role_arn: self.settings.role_arn.clone(),
            workteam_arn: self.settings.workforce_team_arn.clone(),
        }
    }

    async fn start_bounding_box_jobs(
        &self,
        grouped: &GroupedDetections,
        layout: &RunLayout,
        writer: &ArtifactWriter<'_>,
        status_log: &mut JobStatusLog,
    ) -> Result<Vec<String>> {
        info!("Starting bounding box adjustment jobs...");
        for (label, entries) in grouped.bounding_box_groups.iter() {
            info!(label, images = entries.len(), "Bounding-box label");
        }

        let batches = BoundingBoxBatcher::new(self.settings.max_labels_per_bounding_box_job)
            .batch(&grouped.bounding_box_groups);
        let template_html = templates::bounding_box_template(&self.templates);
        let output_path = writer.uri(layout.bounding_box_job_output_dir());
        let workforce = self.workforce();

        let mut jobs = Vec::with_capacity(batches.len());
        for batch in &batches {
            let artifacts = writer.write_bounding_box_batch(batch, &template_html).await?;

            let request = LabelingJobRequest::bounding_box_adjustment(
                layout.bounding_box_job_name(batch.index),
                artifacts.manifest,
                artifacts.labels,
                artifacts.template,
                output_path.clone(),
                &workforce,
                &self.settings.region,
            )?;
            jobs.push(self.job_service.submit(&request).await?);
        }
        info!(jobs = jobs.len(), "Started {} jobs for bounding box adjustment.", jobs.len());

        for job in &jobs {
            self.log_initial_status(job, status_log).await?;
        }
        Ok(jobs)
    }

    async fn start_label_verification_job(
        &self,
        grouped: &GroupedDetections,
        layout: &RunLayout,
        writer: &ArtifactWriter<'_>,
        status_log: &mut JobStatusLog,
    ) -> Result<String> {
        info!("Starting label verification job.");

        let shards = LabelVerificationBatcher::new(self.settings.max_images_per_label_verification_batch)
            .batch(&grouped.label_groups);
        let artifacts = writer
            .write_label_verification(&shards, &templates::label_verification_template())
            .await?;

        let request = LabelingJobRequest::label_verification(
            clf_common::uuid_utils::generate().to_string(),
            artifacts.manifest,
            artifacts.template,
            writer.uri(layout.label_job_output_dir()),
            &self.workforce(),
            &self.settings.label_pre_lambda_arn,
            &self.settings.label_post_lambda_arn,
        );
        let job = self.job_service.submit(&request).await?;
        info!(job = %job, "Started label verification job");

        self.log_initial_status(&job, status_log).await?;
        Ok(job)
    }

    async fn log_initial_status(&self, job: &str, status_log: &mut JobStatusLog) -> Result<()> {
        let description = self.job_service.describe(job).await?;
        info!(job, status = %description.status, "Job status");
        status_log.record(job, description.status);
        Ok(())
    }
}
