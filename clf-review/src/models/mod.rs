//! Data model for the review pipeline

pub mod detection;
pub mod groups;
pub mod jobs;
pub mod manifest;
pub mod run_layout;

pub use detection::{
    round2, DetectedLabel, DetectionInstance, DetectionOutcome, DetectionResult, ImageRef,
    NormalizedBox,
};
pub use groups::{
    BoundingBoxGroupEntry, BoundingBoxGroups, ImageDimensions, LabelGroupEntry, LabelGroups,
    NoLabelSet,
};
pub use jobs::{JobDescription, JobStatus, JobStatusLog, JobsDescriptor};
pub use run_layout::RunLayout;
