//! Size-bounded packing of grouped detections into review manifests

pub mod bounding_box;
pub mod label_verification;

pub use bounding_box::{BoundingBoxBatcher, ManifestBatch, PLACEHOLDER_CONFIDENCE};
pub use label_verification::{aggregate_manifest, LabelVerificationBatcher, ManifestShard};
