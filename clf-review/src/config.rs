//! Review pipeline configuration
//!
//! Loaded from a TOML file resolved by [`clf_common::config::resolve_config_path`]
//! (CLI → `CLF_CONFIG` → user config dir → `/etc/clf`). Both binaries read
//! the same file; settings only `start-review` needs are optional here and
//! validated by [`ReviewConfig::start_settings`].

use clf_common::config::LoggingConfig;
use clf_common::{Error, ObjectUri, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONCURRENCY_CONTROL: usize = 10;
pub const DEFAULT_MAX_LABELS_PER_BOUNDING_BOX_JOB: usize = 10;
pub const DEFAULT_MAX_IMAGES_PER_LABEL_VERIFICATION_BATCH: usize = 10;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_PAGES: usize = 100;

fn default_concurrency_control() -> usize {
    DEFAULT_CONCURRENCY_CONTROL
}

fn default_max_labels_per_bounding_box_job() -> usize {
    DEFAULT_MAX_LABELS_PER_BOUNDING_BOX_JOB
}

fn default_max_images_per_label_verification_batch() -> usize {
    DEFAULT_MAX_IMAGES_PER_LABEL_VERIFICATION_BATCH
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

fn default_allowed_extensions() -> Vec<String> {
    vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()]
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("object-store")
}

/// Complete configuration file
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewConfig {
    /// Image prefix to analyze, `s3://bucket/prefix`
    pub images: Option<String>,
    /// Bucket receiving every run artifact
    pub output_bucket: Option<String>,
    /// Region used to resolve the built-in bounding-box adjustment lambdas
    pub region: Option<String>,
    /// Detector model to run
    pub project_version_arn: Option<String>,
    #[serde(default = "default_concurrency_control")]
    pub concurrency_control: usize,
    pub minimum_confidence: Option<f64>,
    pub max_labels: Option<u32>,
    #[serde(default = "default_max_labels_per_bounding_box_job")]
    pub max_labels_per_bounding_box_job: usize,
    #[serde(default = "default_max_images_per_label_verification_batch")]
    pub max_images_per_label_verification_batch: usize,
    #[serde(default)]
    pub labeling: LabelingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub detector: HttpEndpointConfig,
    #[serde(default)]
    pub job_service: HttpEndpointConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub templates: TemplateConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[labeling]` section
#[derive(Debug, Clone, Deserialize)]
pub struct LabelingConfig {
    pub role_arn: Option<String>,
    pub workforce_team_arn: Option<String>,
    /// Pre-task lambda of the label-verification job
    pub pre_lambda_arn: Option<String>,
    /// Consolidation lambda of the label-verification job
    pub post_lambda_arn: Option<String>,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Upper bound on each job's wait; absent waits forever
    pub poll_timeout_secs: Option<u64>,
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            role_arn: None,
            workforce_team_arn: None,
            pre_lambda_arn: None,
            post_lambda_arn: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            poll_timeout_secs: None,
        }
    }
}

impl LabelingConfig {
    pub fn poll_interval(&self) -> Duration {
        clf_common::time::secs_to_duration(self.poll_interval_secs)
    }

    pub fn poll_timeout(&self) -> Option<Duration> {
        self.poll_timeout_secs.map(clf_common::time::secs_to_duration)
    }
}

/// `[storage]` section
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one subdirectory per bucket
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

/// `[detector]` / `[job_service]` sections
#[derive(Debug, Clone, Deserialize)]
pub struct HttpEndpointConfig {
    pub endpoint: Option<String>,
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpEndpointConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl HttpEndpointConfig {
    /// Endpoint URL, or a `Config` error naming `section`
    pub fn require_endpoint(&self, section: &str) -> Result<&str> {
        self.endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| Error::Config(format!("Missing required setting: {}.endpoint", section)))
    }

    pub fn timeout(&self) -> Duration {
        clf_common::time::secs_to_duration(self.timeout_secs)
    }
}

/// `[listing]` section
#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

/// `[templates]` section; unset fields use the built-in text
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateConfig {
    pub header: Option<String>,
    pub full_instructions: Option<String>,
    pub short_instructions: Option<String>,
}

/// Validated settings for `start-review`
#[derive(Debug, Clone, PartialEq)]
pub struct StartSettings {
    pub images: ObjectUri,
    pub output_bucket: String,
    pub region: String,
    pub project_version_arn: String,
    pub concurrency_control: usize,
    pub minimum_confidence: Option<f64>,
    pub max_labels: Option<u32>,
    pub max_labels_per_bounding_box_job: usize,
    pub max_images_per_label_verification_batch: usize,
    pub role_arn: String,
    pub workforce_team_arn: String,
    pub label_pre_lambda_arn: String,
    pub label_post_lambda_arn: String,
}

fn required(value: &Option<String>, key: &str) -> Result<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::Config(format!("Missing required setting: {}", key)))
}

fn positive(value: usize, key: &str) -> Result<usize> {
    if value == 0 {
        return Err(Error::Config(format!("{} must be greater than 0", key)));
    }
    Ok(value)
}

impl ReviewConfig {
    /// Resolve and load the configuration file
    pub fn load(cli_arg: Option<&Path>) -> Result<Self> {
        let path = clf_common::config::resolve_config_path(cli_arg)?;
        tracing::info!(path = %path.display(), "Loading configuration");
        clf_common::config::load_toml_config(&path)
    }

    /// Validate everything `start-review` needs
    pub fn start_settings(&self) -> Result<StartSettings> {
        let images = required(&self.images, "images")?;
        let images = ObjectUri::parse_prefix(&images)
            .map_err(|e| Error::Config(format!("Invalid images location: {}", e)))?;

        if let Some(confidence) = self.minimum_confidence {
            if !(0.0..=100.0).contains(&confidence) {
                return Err(Error::Config(format!(
                    "minimum_confidence must be within 0..=100, got {}",
                    confidence
                )));
            }
        }

        Ok(StartSettings {
            images,
            output_bucket: required(&self.output_bucket, "output_bucket")?,
            region: required(&self.region, "region")?,
            project_version_arn: required(&self.project_version_arn, "project_version_arn")?,
            concurrency_control: positive(self.concurrency_control, "concurrency_control")?,
            minimum_confidence: self.minimum_confidence,
            max_labels: self.max_labels,
            max_labels_per_bounding_box_job: positive(
                self.max_labels_per_bounding_box_job,
                "max_labels_per_bounding_box_job",
            )?,
            max_images_per_label_verification_batch: positive(
                self.max_images_per_label_verification_batch,
                "max_images_per_label_verification_batch",
            )?,
            role_arn: required(&self.labeling.role_arn, "labeling.role_arn")?,
            workforce_team_arn: required(
                &self.labeling.workforce_team_arn,
                "labeling.workforce_team_arn",
            )?,
            label_pre_lambda_arn: required(&self.labeling.pre_lambda_arn, "labeling.pre_lambda_arn")?,
            label_post_lambda_arn: required(
                &self.labeling.post_lambda_arn,
                "labeling.post_lambda_arn",
            )?,
        })
    }
}
