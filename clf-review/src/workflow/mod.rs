//! The two review phases
//!
//! `start` runs detection through job submission and leaves a jobs
//! descriptor behind; `collect` picks that descriptor up once the human
//! reviewers are done and produces the final manifest.

pub mod artifacts;
pub mod collect;
pub mod start;

pub use artifacts::{read_jobs_descriptor, ArtifactWriter};
pub use collect::{CollectOutcome, CollectWorkflow};
pub use start::{StartOutcome, StartWorkflow};
