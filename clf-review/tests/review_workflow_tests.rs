//! End-to-end tests for the start and collect workflows
//!
//! Runs both phases against an in-memory object store, a scripted detector
//! and a labeling-job service that completes every job immediately.

use async_trait::async_trait;
use clf_common::{Error, ObjectUri, Result};
use clf_review::config::StartSettings;
use clf_review::models::{DetectedLabel, JobDescription, JobStatus, NormalizedBox};
use clf_review::services::{
    DetectorError, DetectorOutput, LabelDetector, LabelingJobRequest, LabelingJobService,
    MemoryObjectStore, ObjectStore,
};
use clf_review::{CollectWorkflow, StartWorkflow};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct ScriptedDetector {
    outputs: HashMap<String, DetectorOutput>,
}

#[async_trait]
impl LabelDetector for ScriptedDetector {
    async fn detect(&self, image: &ObjectUri) -> std::result::Result<DetectorOutput, DetectorError> {
        self.outputs
            .get(&image.key)
            .cloned()
            .ok_or_else(|| DetectorError::ApiError(500, format!("no model output for {}", image)))
    }
}

#[derive(Default)]
struct InstantJobService {
    submitted: Mutex<Vec<LabelingJobRequest>>,
    outputs: Mutex<HashMap<String, ObjectUri>>,
}

impl InstantJobService {
    fn submitted(&self) -> Vec<LabelingJobRequest> {
        self.submitted.lock().unwrap().clone()
    }

    fn set_output(&self, job: &str, manifest: ObjectUri) {
        self.outputs.lock().unwrap().insert(job.to_string(), manifest);
    }
}

#[async_trait]
impl LabelingJobService for InstantJobService {
    async fn submit(&self, request: &LabelingJobRequest) -> Result<String> {
        self.submitted.lock().unwrap().push(request.clone());
        Ok(request.job_name.clone())
    }

    async fn describe(&self, job_name: &str) -> Result<JobDescription> {
        let output_manifest = self.outputs.lock().unwrap().get(job_name).cloned();
        let status = if output_manifest.is_some() {
            JobStatus::Completed
        } else {
            JobStatus::InProgress
        };
        Ok(JobDescription {
            name: job_name.to_string(),
            status,
            output_manifest,
        })
    }
}

fn settings() -> StartSettings {
    StartSettings {
        images: ObjectUri::new("photos", "batch/"),
        output_bucket: "out".to_string(),
        region: "us-east-1".to_string(),
        project_version_arn: "arn:model/1".to_string(),
        concurrency_control: 2,
        minimum_confidence: None,
        max_labels: None,
        max_labels_per_bounding_box_job: 10,
        max_images_per_label_verification_batch: 10,
        role_arn: "arn:role".to_string(),
        workforce_team_arn: "arn:team".to_string(),
        label_pre_lambda_arn: "arn:pre".to_string(),
        label_post_lambda_arn: "arn:post".to_string(),
    }
}

fn detector() -> ScriptedDetector {
    let mut outputs = HashMap::new();
    outputs.insert(
        "batch/cat.jpg".to_string(),
        DetectorOutput {
            width: 640,
            height: 480,
            labels: vec![DetectedLabel::classification("cat", 95.123)],
        },
    );
    outputs.insert(
        "batch/dog.jpg".to_string(),
        DetectorOutput {
            width: 200,
            height: 100,
            labels: vec![DetectedLabel::localized(
                "dog",
                vec![NormalizedBox {
                    left: 0.1,
                    top: 0.2,
                    width: 0.5,
                    height: 0.5,
                }],
            )],
        },
    );
    outputs.insert(
        "batch/empty.png".to_string(),
        DetectorOutput {
            width: 10,
            height: 10,
            labels: Vec::new(),
        },
    );
    ScriptedDetector { outputs }
}

async fn seeded_store() -> Arc<MemoryObjectStore> {
    let store = Arc::new(MemoryObjectStore::new());
    for key in ["batch/broken.jpg", "batch/cat.jpg", "batch/dog.jpg", "batch/empty.png", "batch/notes.txt"] {
        store.write(&ObjectUri::new("photos", key), "binary").await.unwrap();
    }
    store
}

fn lines(text: &str) -> Vec<Value> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[tokio::test]
async fn test_start_then_collect_produces_merged_manifest() {
    let store = seeded_store().await;
    let jobs = Arc::new(InstantJobService::default());

    let start = StartWorkflow::new(store.clone(), Arc::new(detector()), jobs.clone(), settings());
    let outcome = start.execute_run("run-1").await.unwrap();

    // notes.txt is filtered out by extension
    assert_eq!(outcome.images, 4);
    assert_eq!(
        outcome.jobs_descriptor.to_string(),
        "s3://out/datasets/run-1/jobs/jobs.json"
    );
    assert_eq!(outcome.descriptor.bounding_box_jobs, vec!["run-1-0".to_string()]);
    assert_eq!(
        outcome.descriptor.no_labels_manifest.as_ref().map(|u| u.to_string()),
        Some("s3://out/datasets/run-1/no-labels/manifest/nolabels.json".to_string())
    );
    let label_job = outcome.descriptor.label_verification_job.clone().unwrap();
    assert!(uuid::Uuid::parse_str(&label_job).is_ok());
    assert_eq!(outcome.status_log.len(), 2);

    let submitted = jobs.submitted();
    assert_eq!(submitted.len(), 2);
    assert_eq!(submitted[0].label_attribute_name, "bounding-box-new");
    assert_eq!(
        submitted[0].output_path.key,
        "datasets/run-1/bounding-box-verification/ground-truth-output"
    );
    assert_eq!(submitted[1].label_attribute_name, "labels");
    assert_eq!(submitted[1].task.pre_lambda_arn, "arn:pre");

    let shard_uri = ObjectUri::new("out", "datasets/run-1/label-verification/manifest/manifest-cat-0.json");
    let shard: Value = serde_json::from_str(&store.read(&shard_uri).await.unwrap()).unwrap();
    assert_eq!(shard[0]["imageUrl"], "s3://photos/batch/cat.jpg");
    assert_eq!(shard[0]["confidence"], 95.12);

    let bbox_manifest = ObjectUri::new("out", "datasets/run-1/bounding-box-verification/manifest/manifest-0.json");
    let bbox_lines = lines(&store.read(&bbox_manifest).await.unwrap());
    assert_eq!(bbox_lines.len(), 1);
    assert_eq!(bbox_lines[0]["source-ref"], "s3://photos/batch/dog.jpg");
    assert_eq!(bbox_lines[0]["bounding-box"]["annotations"][0]["left"], 20);
    assert_eq!(bbox_lines[0]["bounding-box-metadata"]["class-map"]["0"], "dog");

    // Reviewers finish: one confirmed cat, one adjusted dog box
    let label_output = ObjectUri::new("out", "gt/labels/output.manifest");
    store
        .write(
            &label_output,
            &format!(
                "{{\"source-ref\":\"{}\",\"labels\":{{\"item-0\":\"Confirmed\"}}}}\n",
                shard_uri
            ),
        )
        .await
        .unwrap();
    jobs.set_output(&label_job, label_output);

    let bbox_output = ObjectUri::new("out", "gt/boxes/output.manifest");
    store
        .write(
            &bbox_output,
            r#"{"source-ref":"s3://photos/batch/dog.jpg","bounding-box-new":{"annotations":[{"class_id":0,"left":22,"top":20,"width":100,"height":50}]},"bounding-box-new-metadata":{"class-map":{"0":"dog"}}}"#,
        )
        .await
        .unwrap();
    jobs.set_output("run-1-0", bbox_output);

    let collect = CollectWorkflow::new(store.clone(), jobs.clone(), Duration::from_millis(1));
    let collected = collect.execute(&outcome.jobs_descriptor).await.unwrap();

    assert_eq!(collected.output.to_string(), "s3://out/datasets/run-1/output/output.manifest");
    assert_eq!(collected.presigned_url, "memory://out/datasets/run-1/output/output.manifest");
    assert_eq!(collected.records, 4);

    let records = lines(&store.read(&collected.output).await.unwrap());
    let refs: Vec<&str> = records.iter().map(|r| r["source-ref"].as_str().unwrap()).collect();
    assert_eq!(
        refs,
        vec![
            "s3://photos/batch/cat.jpg",
            "s3://photos/batch/dog.jpg",
            "s3://photos/batch/broken.jpg",
            "s3://photos/batch/empty.png",
        ]
    );
    assert_eq!(records[0]["label-0"], "0");
    assert_eq!(records[0]["label-0-metadata"]["class-name"], "cat");
    assert_eq!(records[0]["label-0-metadata"]["job-name"], label_job.as_str());
    assert_eq!(records[1]["bounding-box-new"]["annotations"][0]["left"], 22);
    assert_eq!(records[2]["nolabel"]["image_size"][0]["width"], 0);
    assert_eq!(records[3]["nolabel-metadata"]["job-name"], "labeling-job/nolabels");

    // Intermediate outputs are persisted next to the final manifest
    assert!(store
        .contains(&ObjectUri::new("out", "datasets/run-1/label-verification/output/labels-output.manifest"))
        .await);
    assert!(store
        .contains(&ObjectUri::new(
            "out",
            "datasets/run-1/bounding-box-verification/output/bounding-box-output.manifest"
        ))
        .await);
}

#[tokio::test]
async fn test_start_without_images_writes_empty_descriptor() {
    let store = Arc::new(MemoryObjectStore::new());
    let jobs = Arc::new(InstantJobService::default());

    let start = StartWorkflow::new(store.clone(), Arc::new(detector()), jobs.clone(), settings());
    let outcome = start.execute_run("empty-run").await.unwrap();

    assert_eq!(outcome.images, 0);
    assert!(outcome.descriptor.is_empty());
    assert!(jobs.submitted().is_empty());

    let text = store.read(&outcome.jobs_descriptor).await.unwrap();
    let raw: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(raw["runid"], "empty-run");
    assert_eq!(raw["label-verification-job"], "");
    assert_eq!(raw["no-labels-manifest-file"], "");

    let collect = CollectWorkflow::new(store.clone(), jobs, Duration::from_millis(1));
    let collected = collect.execute(&outcome.jobs_descriptor).await.unwrap();
    assert_eq!(collected.records, 0);
    assert!(collected.status_log.is_empty());
}

#[tokio::test]
async fn test_unsupported_region_fails_bounding_box_submission() {
    let store = seeded_store().await;
    let jobs = Arc::new(InstantJobService::default());
    let mut settings = settings();
    settings.region = "mars-north-1".to_string();

    let start = StartWorkflow::new(store, Arc::new(detector()), jobs.clone(), settings);
    let err = start.execute_run("run-2").await.unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert!(jobs.submitted().is_empty());
}

#[tokio::test]
async fn test_collect_times_out_on_pending_job() {
    let store = seeded_store().await;
    let jobs = Arc::new(InstantJobService::default());

    let start = StartWorkflow::new(store.clone(), Arc::new(detector()), jobs.clone(), settings());
    let outcome = start.execute_run("run-3").await.unwrap();

    // No outputs registered: every job stays InProgress
    let collect = CollectWorkflow::new(store, jobs, Duration::from_millis(1))
        .with_poll_timeout(Some(Duration::from_millis(20)));
    let err = collect.execute(&outcome.jobs_descriptor).await.unwrap_err();
    assert!(matches!(err, Error::JobService(_)));
}

#[tokio::test]
async fn test_collect_missing_descriptor_is_storage_error() {
    let store = Arc::new(MemoryObjectStore::new());
    let jobs = Arc::new(InstantJobService::default());

    let collect = CollectWorkflow::new(store, jobs, Duration::from_millis(1));
    let err = collect
        .execute(&ObjectUri::new("out", "datasets/nope/jobs/jobs.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
}
