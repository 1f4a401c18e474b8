//! Custom-label detector client
//!
//! The detector reports one raw entry per detection. Entries sharing a name
//! are folded into a single [`DetectedLabel`]: entries with geometry become
//! instances, an entry without geometry carries the whole-image confidence.

use crate::models::{DetectedLabel, NormalizedBox};
use async_trait::async_trait;
use clf_common::ObjectUri;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("clf-review/", env!("CARGO_PKG_VERSION"));

/// Detector errors; contained per image, never fatal to a run
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Detector output for one image
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorOutput {
    pub width: u32,
    pub height: u32,
    pub labels: Vec<DetectedLabel>,
}

/// Detector collaborator
#[async_trait]
pub trait LabelDetector: Send + Sync {
    async fn detect(&self, image: &ObjectUri) -> Result<DetectorOutput, DetectorError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DetectRequest<'a> {
    image: RequestImage<'a>,
    project_version_arn: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_results: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct RequestImage<'a> {
    s3_object: RequestObject<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct RequestObject<'a> {
    bucket: &'a str,
    name: &'a str,
}

/// Raw detector response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetectResponse {
    pub image_width: u32,
    pub image_height: u32,
    #[serde(default)]
    pub custom_labels: Vec<RawCustomLabel>,
}

/// One raw detection
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawCustomLabel {
    pub name: String,
    pub confidence: f64,
    pub geometry: Option<RawGeometry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawGeometry {
    pub bounding_box: NormalizedBox,
}

/// Fold raw detections by label name, keeping first-seen order
pub fn fold_labels(raw: Vec<RawCustomLabel>) -> Vec<DetectedLabel> {
    let mut folded: IndexMap<String, DetectedLabel> = IndexMap::new();

    for entry in raw {
        let label = folded
            .entry(entry.name.clone())
            .or_insert_with(|| DetectedLabel::localized(entry.name.clone(), Vec::new()));

        match entry.geometry {
            Some(geometry) => label.instances.push(geometry.bounding_box),
            None => label.confidence = Some(entry.confidence),
        }
    }

    folded.into_values().collect()
}

/// HTTP detector client
pub struct HttpDetector {
    client: reqwest::Client,
    endpoint: String,
    project_version_arn: String,
    min_confidence: Option<f64>,
    max_results: Option<u32>,
}

impl HttpDetector {
    pub fn new(
        endpoint: impl Into<String>,
        project_version_arn: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DetectorError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| DetectorError::NetworkError(e.to_string()))?;
        let endpoint: String = endpoint.into();

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project_version_arn: project_version_arn.into(),
            min_confidence: None,
            max_results: None,
        })
    }

    pub fn with_min_confidence(mut self, min_confidence: Option<f64>) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn with_max_results(mut self, max_results: Option<u32>) -> Self {
        self.max_results = max_results;
        self
    }
}

#[async_trait]
impl LabelDetector for HttpDetector {
    async fn detect(&self, image: &ObjectUri) -> Result<DetectorOutput, DetectorError> {
        let url = format!("{}/detect-custom-labels", self.endpoint);
        let request = DetectRequest {
            image: RequestImage {
                s3_object: RequestObject {
                    bucket: &image.bucket,
                    name: &image.key,
                },
            },
            project_version_arn: &self.project_version_arn,
            min_confidence: self.min_confidence,
            max_results: self.max_results,
        };

        tracing::debug!(image = %image, "Detecting custom labels");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DetectorError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DetectorError::ApiError(status.as_u16(), body));
        }

        let body: DetectResponse = response
            .json()
            .await
            .map_err(|e| DetectorError::ParseError(e.to_string()))?;

        let labels = fold_labels(body.custom_labels);

        tracing::debug!(
            image = %image,
            width = body.image_width,
            height = body.image_height,
            labels = labels.len(),
            "Detection complete"
        );

        Ok(DetectorOutput {
            width: body.image_width,
            height: body.image_height,
            labels,
        })
    }
}
