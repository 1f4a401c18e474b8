//! Collect phase: wait for jobs, process their outputs, reconcile

use super::artifacts::{read_jobs_descriptor, ArtifactWriter};
use crate::models::{JobDescription, JobStatusLog, JobsDescriptor, RunLayout};
use crate::reconcile::{render_records, BoundingBoxOutputCollector, LabelVerificationCollector, ResultReconciler};
use crate::services::{JobPoller, LabelingJobService, ObjectStore};
use clf_common::{Error, ObjectUri, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// What a collect run produced
#[derive(Debug, Clone)]
pub struct CollectOutcome {
    pub output: ObjectUri,
    pub presigned_url: String,
    pub records: usize,
    pub status_log: JobStatusLog,
}

/// Job-completion-to-final-manifest workflow
pub struct CollectWorkflow {
    store: Arc<dyn ObjectStore>,
    job_service: Arc<dyn LabelingJobService>,
    poll_interval: Duration,
    poll_timeout: Option<Duration>,
}

impl CollectWorkflow {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        job_service: Arc<dyn LabelingJobService>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            job_service,
            poll_interval,
            poll_timeout: None,
        }
    }

    pub fn with_poll_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub async fn execute(&self, jobs_manifest: &ObjectUri) -> Result<CollectOutcome> {
        let descriptor = read_jobs_descriptor(self.store.as_ref(), jobs_manifest).await?;
        info!(uri = %jobs_manifest, run_id = %descriptor.run_id, "Jobs manifest loaded");

        let layout = RunLayout::new(descriptor.run_id.as_str());
        let writer = ArtifactWriter::new(self.store.as_ref(), &jobs_manifest.bucket, &layout);
        let poller = JobPoller::new(self.job_service.as_ref(), self.poll_interval).with_timeout(self.poll_timeout);
        let mut status_log = JobStatusLog::new();

        let labels_text = self
            .collect_label_verification(&descriptor, &poller, &writer, &layout, &mut status_log)
            .await?;
        let bounding_box_text = self
            .collect_bounding_boxes(&descriptor, &poller, &writer, &layout, &mut status_log)
            .await?;
        let no_labels_text = match &descriptor.no_labels_manifest {
            Some(uri) => Some(self.store.read(uri).await?),
            None => None,
        };

        let reconciler = ResultReconciler::reconcile(
            labels_text.as_deref(),
            bounding_box_text.as_deref(),
            no_labels_text.as_deref(),
        )?;

        let output = writer
            .write_manifest(layout.final_output(), &reconciler.render()?)
            .await?;
        let presigned_url = self.store.presign(&output).await?;
        info!(uri = %output, records = reconciler.len(), "Output manifest written");

        Ok(CollectOutcome {
            output,
            presigned_url,
            records: reconciler.len(),
            status_log,
        })
    }

    async fn collect_label_verification(
        &self,
        descriptor: &JobsDescriptor,
        poller: &JobPoller<'_>,
        writer: &ArtifactWriter<'_>,
        layout: &RunLayout,
        status_log: &mut JobStatusLog,
    ) -> Result<Option<String>> {
        let Some(job) = &descriptor.label_verification_job else {
            return Ok(None);
        };

        info!(job = %job, "Waiting for label verification job");
        let description = poller.wait_for(job, status_log).await?;
        let output_text = self.read_job_output(&description).await?;

        let mut collector = LabelVerificationCollector::new();
        collector.collect(self.store.as_ref(), &output_text).await?;

        let creation_date = clf_common::time::creation_date(clf_common::time::now());
        let records = collector.into_records(job, &creation_date);
        let text = render_records(&records)?;

        let uri = writer.write_manifest(layout.labels_output(), &text).await?;
        info!(uri = %uri, images = records.len(), "Label verification output written");
        Ok(Some(text))
    }

    async fn collect_bounding_boxes(
        &self,
        descriptor: &JobsDescriptor,
        poller: &JobPoller<'_>,
        writer: &ArtifactWriter<'_>,
        layout: &RunLayout,
        status_log: &mut JobStatusLog,
    ) -> Result<Option<String>> {
        if descriptor.bounding_box_jobs.is_empty() {
            return Ok(None);
        }

        info!(jobs = descriptor.bounding_box_jobs.len(), "Waiting for bounding box jobs");
        let descriptions = poller.wait_for_all(&descriptor.bounding_box_jobs, status_log).await?;

        let mut collector = BoundingBoxOutputCollector::new();
        for description in &descriptions {
            let output_text = self.read_job_output(description).await?;
            collector.add_output(&output_text)?;
        }
        if collector.duplicates() > 0 {
            info!(duplicates = collector.duplicates(), "Images adjusted in more than one job");
        }

        let records = collector.into_records();
        let text = render_records(&records)?;

        let uri = writer.write_manifest(layout.bounding_box_output(), &text).await?;
        info!(uri = %uri, images = records.len(), "Bounding box output written");
        Ok(Some(text))
    }

    async fn read_job_output(&self, description: &JobDescription) -> Result<String> {
        let manifest = description.output_manifest.as_ref().ok_or_else(|| {
            Error::JobService(format!(
                "Job {} finished with status {} and no output manifest",
                description.name, description.status
            ))
        })?;
        self.store.read(manifest).await
    }
}
