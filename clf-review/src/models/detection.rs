//! Per-image detector output
//!
//! A [`DetectionResult`] is produced once per image by the analyzer and is
//! never mutated afterwards. Geometry arrives normalized (0..1) from the
//! detector and is scaled to pixels when the result is grouped.

use clf_common::ObjectUri;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whole-image confidence reported for labels that only carry instances
pub const UNSCORED_CONFIDENCE: f64 = -1.0;

/// Round to 2 decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Opaque image identity (the image's `s3://` location)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&ObjectUri> for ImageRef {
    fn from(uri: &ObjectUri) -> Self {
        Self(uri.to_string())
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bounding box relative to image dimensions (all values 0..1)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NormalizedBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// One localized occurrence of a label, in absolute pixels (2 decimals)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionInstance {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl DetectionInstance {
    /// Scale a normalized box to pixels of a `image_width` x `image_height` image
    pub fn from_normalized(bbox: &NormalizedBox, image_width: u32, image_height: u32) -> Self {
        let w = f64::from(image_width);
        let h = f64::from(image_height);
        Self {
            left: round2(bbox.left * w),
            top: round2(bbox.top * h),
            width: round2(bbox.width * w),
            height: round2(bbox.height * h),
        }
    }
}

/// One label reported for an image, folded across all raw detections of that name
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedLabel {
    pub name: String,
    /// Whole-image confidence; `None` when the label only came with instances
    pub confidence: Option<f64>,
    /// Localized instances (empty for whole-image classifications)
    pub instances: Vec<NormalizedBox>,
}

impl DetectedLabel {
    pub fn classification(name: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            confidence: Some(confidence),
            instances: Vec::new(),
        }
    }

    pub fn localized(name: impl Into<String>, instances: Vec<NormalizedBox>) -> Self {
        Self {
            name: name.into(),
            confidence: None,
            instances,
        }
    }

    pub fn has_instances(&self) -> bool {
        !self.instances.is_empty()
    }

    /// Confidence as a number, [`UNSCORED_CONFIDENCE`] when absent
    pub fn confidence_or_unscored(&self) -> f64 {
        self.confidence.unwrap_or(UNSCORED_CONFIDENCE)
    }
}

/// What the detector produced for one image
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionOutcome {
    /// Zero or more labels (zero means the image has no detections)
    Labels(Vec<DetectedLabel>),
    /// Detector call failed; the message replaces the label list
    Failed(String),
}

/// One image's full detector output
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    pub image: ImageRef,
    pub width: u32,
    pub height: u32,
    pub outcome: DetectionOutcome,
}

impl DetectionResult {
    pub fn labeled(image: ImageRef, width: u32, height: u32, labels: Vec<DetectedLabel>) -> Self {
        Self {
            image,
            width,
            height,
            outcome: DetectionOutcome::Labels(labels),
        }
    }

    /// Failure marker result; dimensions are unknown and recorded as 0
    pub fn failed(image: ImageRef, message: impl Into<String>) -> Self {
        Self {
            image,
            width: 0,
            height: 0,
            outcome: DetectionOutcome::Failed(message.into()),
        }
    }

    /// Labels to group; a failed detection has none
    pub fn labels(&self) -> &[DetectedLabel] {
        match &self.outcome {
            DetectionOutcome::Labels(labels) => labels,
            DetectionOutcome::Failed(_) => &[],
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, DetectionOutcome::Failed(_))
    }
}
