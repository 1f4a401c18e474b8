//! clf-review library interface
//!
//! Human-in-the-loop review of custom-label detections: detect labels on a
//! set of images, route them to bounding-box adjustment and label
//! verification jobs, then merge the reviewed results into one manifest.

pub mod analysis;
pub mod batching;
pub mod config;
pub mod models;
pub mod reconcile;
pub mod services;
pub mod workflow;

pub use crate::config::{ReviewConfig, StartSettings};
pub use crate::workflow::{CollectWorkflow, StartWorkflow};
