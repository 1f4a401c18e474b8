//! Labeling-job service client and status poller
//!
//! Jobs are submitted once and then described until they reach a terminal
//! status. Request and response bodies use the service's PascalCase keys.

use crate::models::{JobDescription, JobStatus, JobStatusLog};
use async_trait::async_trait;
use clf_common::{Error, ObjectUri, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

const USER_AGENT: &str = concat!("clf-review/", env!("CARGO_PKG_VERSION"));

/// Label attribute written by bounding-box adjustment jobs
pub const BOUNDING_BOX_ATTRIBUTE: &str = "bounding-box-new";

/// Label attribute written by the label-verification job
pub const LABEL_VERIFICATION_ATTRIBUTE: &str = "labels";

pub const CONTENT_CLASSIFIER: &str = "FreeOfPersonallyIdentifiableInformation";
pub const WORKERS_PER_OBJECT: u32 = 1;
pub const TASK_TIME_LIMIT_SECS: u32 = 600;
pub const MAX_CONCURRENT_TASKS: u32 = 10;

/// Accounts hosting the built-in bounding-box adjustment lambdas, per region
const ADJUSTMENT_LAMBDA_ACCOUNTS: &[(&str, &str)] = &[
    ("us-east-1", "432418664414"),
    ("us-east-2", "266458841044"),
    ("us-west-2", "081040173940"),
    ("ca-central-1", "918755190332"),
    ("eu-west-1", "568282634449"),
    ("eu-west-2", "487402164563"),
    ("eu-central-1", "203001061592"),
    ("ap-northeast-1", "477331159723"),
    ("ap-northeast-2", "845288260483"),
    ("ap-south-1", "565803892007"),
    ("ap-southeast-1", "377565633583"),
    ("ap-southeast-2", "454466003867"),
];

/// Pre-task and consolidation lambdas of the built-in adjustment workflow
pub fn adjustment_lambdas(region: &str) -> Result<(String, String)> {
    let account = ADJUSTMENT_LAMBDA_ACCOUNTS
        .iter()
        .find(|(r, _)| *r == region)
        .map(|(_, account)| *account)
        .ok_or_else(|| {
            Error::Config(format!(
                "Region {} has no bounding-box adjustment lambdas",
                region
            ))
        })?;

    Ok((
        format!("arn:aws:lambda:{}:{}:function:PRE-AdjustmentBoundingBox", region, account),
        format!("arn:aws:lambda:{}:{}:function:ACS-AdjustmentBoundingBox", region, account),
    ))
}

/// Role and work team every job runs under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workforce {
    pub role_arn: String,
    pub workteam_arn: String,
}

/// Human task portion of a job
#[derive(Debug, Clone, PartialEq)]
pub struct HumanTaskConfig {
    pub workteam_arn: String,
    pub ui_template: ObjectUri,
    pub pre_lambda_arn: String,
    pub post_lambda_arn: String,
    pub title: String,
    pub description: String,
    pub workers_per_object: u32,
    pub time_limit_secs: u32,
    pub max_concurrent_tasks: u32,
}

/// One labeling job to create
#[derive(Debug, Clone, PartialEq)]
pub struct LabelingJobRequest {
    pub job_name: String,
    pub label_attribute_name: String,
    pub manifest: ObjectUri,
    /// Prefix the service writes its output under
    pub output_path: ObjectUri,
    pub role_arn: String,
    pub label_categories: Option<ObjectUri>,
    pub task: HumanTaskConfig,
}

impl LabelingJobRequest {
    /// Bounding-box adjustment job for one batch
    pub fn bounding_box_adjustment(
        job_name: String,
        manifest: ObjectUri,
        label_categories: ObjectUri,
        ui_template: ObjectUri,
        output_path: ObjectUri,
        workforce: &Workforce,
        region: &str,
    ) -> Result<Self> {
        let (pre_lambda_arn, post_lambda_arn) = adjustment_lambdas(region)?;

        Ok(Self {
            job_name,
            label_attribute_name: BOUNDING_BOX_ATTRIBUTE.to_string(),
            manifest,
            output_path,
            role_arn: workforce.role_arn.clone(),
            label_categories: Some(label_categories),
            task: HumanTaskConfig {
                workteam_arn: workforce.workteam_arn.clone(),
                ui_template,
                pre_lambda_arn,
                post_lambda_arn,
                title: "Confirm Bounding Boxes".to_string(),
                description: "Confirm bounding boxes.".to_string(),
                workers_per_object: WORKERS_PER_OBJECT,
                time_limit_secs: TASK_TIME_LIMIT_SECS,
                max_concurrent_tasks: MAX_CONCURRENT_TASKS,
            },
        })
    }

    /// The run's single label-verification job
    pub fn label_verification(
        job_name: String,
        manifest: ObjectUri,
        ui_template: ObjectUri,
        output_path: ObjectUri,
        workforce: &Workforce,
        pre_lambda_arn: &str,
        post_lambda_arn: &str,
    ) -> Self {
        Self {
            job_name,
            label_attribute_name: LABEL_VERIFICATION_ATTRIBUTE.to_string(),
            manifest,
            output_path,
            role_arn: workforce.role_arn.clone(),
            label_categories: None,
            task: HumanTaskConfig {
                workteam_arn: workforce.workteam_arn.clone(),
                ui_template,
                pre_lambda_arn: pre_lambda_arn.to_string(),
                post_lambda_arn: post_lambda_arn.to_string(),
                title: "Confirm label for images below".to_string(),
                description: "Confirm images for label.".to_string(),
                workers_per_object: WORKERS_PER_OBJECT,
                time_limit_secs: TASK_TIME_LIMIT_SECS,
                max_concurrent_tasks: MAX_CONCURRENT_TASKS,
            },
        }
    }

    /// Request body in the service's wire format
    pub fn to_wire(&self) -> Value {
        let mut body = json!({
            "LabelingJobName": self.job_name,
            "LabelAttributeName": self.label_attribute_name,
            "InputConfig": {
                "DataSource": {
                    "S3DataSource": { "ManifestS3Uri": self.manifest.to_string() }
                },
                "DataAttributes": { "ContentClassifiers": [CONTENT_CLASSIFIER] }
            },
            "OutputConfig": { "S3OutputPath": self.output_path.to_string() },
            "RoleArn": self.role_arn,
            "HumanTaskConfig": {
                "WorkteamArn": self.task.workteam_arn,
                "UiConfig": { "UiTemplateS3Uri": self.task.ui_template.to_string() },
                "PreHumanTaskLambdaArn": self.task.pre_lambda_arn,
                "TaskTitle": self.task.title,
                "TaskDescription": self.task.description,
                "NumberOfHumanWorkersPerDataObject": self.task.workers_per_object,
                "TaskTimeLimitInSeconds": self.task.time_limit_secs,
                "MaxConcurrentTaskCount": self.task.max_concurrent_tasks,
                "AnnotationConsolidationConfig": {
                    "AnnotationConsolidationLambdaArn": self.task.post_lambda_arn
                }
            }
        });

        if let (Some(categories), Some(obj)) = (&self.label_categories, body.as_object_mut()) {
            obj.insert(
                "LabelCategoryConfigS3Uri".to_string(),
                Value::String(categories.to_string()),
            );
        }

        body
    }
}

/// Labeling-job collaborator
#[async_trait]
pub trait LabelingJobService: Send + Sync {
    /// Create a job; returns its name
    async fn submit(&self, request: &LabelingJobRequest) -> Result<String>;

    async fn describe(&self, job_name: &str) -> Result<JobDescription>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeResponse {
    labeling_job_name: String,
    labeling_job_status: String,
    labeling_job_output: Option<JobOutput>,
}

#[derive(Debug, Deserialize)]
struct JobOutput {
    #[serde(rename = "OutputDatasetS3Uri")]
    output_dataset_s3_uri: Option<String>,
}

/// HTTP labeling-job service client
pub struct HttpJobService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpJobService {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::JobService(format!("HTTP client setup failed: {}", e)))?;
        let endpoint: String = endpoint.into();

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    async fn check(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::JobService(format!(
            "{} failed with status {}: {}",
            action,
            status.as_u16(),
            body
        )))
    }
}

#[async_trait]
impl LabelingJobService for HttpJobService {
    async fn submit(&self, request: &LabelingJobRequest) -> Result<String> {
        let url = format!("{}/labeling-jobs", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&request.to_wire())
            .send()
            .await
            .map_err(|e| Error::JobService(format!("Create job {} failed: {}", request.job_name, e)))?;

        Self::check(response, &format!("Create job {}", request.job_name)).await?;

        tracing::info!(
            job = %request.job_name,
            attribute = %request.label_attribute_name,
            manifest = %request.manifest,
            "Labeling job created"
        );
        Ok(request.job_name.clone())
    }

    async fn describe(&self, job_name: &str) -> Result<JobDescription> {
        let url = format!("{}/labeling-jobs/{}", self.endpoint, job_name);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::JobService(format!("Describe job {} failed: {}", job_name, e)))?;

        let response = Self::check(response, &format!("Describe job {}", job_name)).await?;

        let body: DescribeResponse = response
            .json()
            .await
            .map_err(|e| Error::JobService(format!("Describe job {}: invalid response: {}", job_name, e)))?;

        let output_manifest = body
            .labeling_job_output
            .and_then(|o| o.output_dataset_s3_uri)
            .filter(|uri| !uri.is_empty())
            .map(|uri| uri.parse::<ObjectUri>())
            .transpose()
            .map_err(|e| Error::JobService(format!("Job {} output location: {}", job_name, e)))?;

        Ok(JobDescription {
            name: body.labeling_job_name,
            status: JobStatus::from(body.labeling_job_status),
            output_manifest,
        })
    }
}

/// Blocking wait on job completion, one job at a time
pub struct JobPoller<'a> {
    service: &'a dyn LabelingJobService,
    interval: Duration,
    timeout: Option<Duration>,
}

impl<'a> JobPoller<'a> {
    pub fn new(service: &'a dyn LabelingJobService, interval: Duration) -> Self {
        Self {
            service,
            interval,
            timeout: None,
        }
    }

    /// Bound each job's wait; without it the poller waits forever
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Describe `job_name` until it leaves the pending states
    pub async fn wait_for(&self, job_name: &str, log: &mut JobStatusLog) -> Result<JobDescription> {
        let started = Instant::now();

        loop {
            let description = self.service.describe(job_name).await?;
            tracing::info!(job = %job_name, status = %description.status, "Job status");
            log.record(job_name, description.status.clone());

            if description.status.is_terminal() {
                if description.status != JobStatus::Completed {
                    tracing::warn!(
                        job = %job_name,
                        status = %description.status,
                        "Job finished without completing"
                    );
                }
                return Ok(description);
            }

            if let Some(timeout) = self.timeout {
                if started.elapsed() >= timeout {
                    return Err(Error::JobService(format!(
                        "Timed out after {}s waiting for job {} (last status {})",
                        timeout.as_secs(),
                        job_name,
                        description.status
                    )));
                }
            }

            tokio::time::sleep(self.interval).await;
        }
    }

    /// Wait for every job in order
    pub async fn wait_for_all(
        &self,
        job_names: &[String],
        log: &mut JobStatusLog,
    ) -> Result<Vec<JobDescription>> {
        let mut descriptions = Vec::with_capacity(job_names.len());
        for job_name in job_names {
            descriptions.push(self.wait_for(job_name, log).await?);
        }
        Ok(descriptions)
    }
}
