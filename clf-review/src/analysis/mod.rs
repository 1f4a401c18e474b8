//! Detection and grouping

pub mod grouping;
pub mod image_analyzer;

pub use grouping::{GroupedDetections, GroupingEngine};
pub use image_analyzer::ImageAnalyzer;
