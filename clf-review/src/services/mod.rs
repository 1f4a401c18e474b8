//! External collaborators: object storage, label detector, labeling-job service

pub mod detector;
pub mod job_service;
pub mod storage;
pub mod templates;

pub use detector::{DetectorError, DetectorOutput, HttpDetector, LabelDetector};
pub use job_service::{
    HttpJobService, JobPoller, LabelingJobRequest, LabelingJobService, Workforce,
};
pub use storage::{FsObjectStore, MemoryObjectStore, ObjectStore};
