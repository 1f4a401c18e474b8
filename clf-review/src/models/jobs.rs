//! Labeling-job bookkeeping
//!
//! The jobs descriptor is the hand-off between `start-review` and
//! `collect-review`. It is written as `jobs.json` under the run directory.

use chrono::{DateTime, Utc};
use clf_common::ObjectUri;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which jobs a run created, and where its no-label manifest lives
///
/// Absent values are written as `""` and read back as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobsDescriptor {
    #[serde(rename = "runid")]
    pub run_id: String,
    #[serde(rename = "bounding-box-verification-jobs", default)]
    pub bounding_box_jobs: Vec<String>,
    #[serde(rename = "label-verification-job", default, with = "empty_as_none")]
    pub label_verification_job: Option<String>,
    #[serde(rename = "no-labels-manifest-file", default, with = "empty_as_none")]
    pub no_labels_manifest: Option<ObjectUri>,
}

impl JobsDescriptor {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            bounding_box_jobs: Vec::new(),
            label_verification_job: None,
            no_labels_manifest: None,
        }
    }

    /// True when the run produced nothing to collect
    pub fn is_empty(&self) -> bool {
        self.bounding_box_jobs.is_empty()
            && self.label_verification_job.is_none()
            && self.no_labels_manifest.is_none()
    }
}

/// `""` ⇄ `None` for string-shaped optional values
mod empty_as_none {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::fmt::Display;
    use std::str::FromStr;

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        match value {
            Some(v) => serializer.collect_str(v),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => s.parse().map(Some).map_err(D::Error::custom),
        }
    }
}

/// Labeling-job lifecycle status as reported by the job service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Initializing,
    InProgress,
    Stopping,
    Completed,
    Failed,
    Stopped,
    /// Any status string this tool does not know; treated as terminal
    Other(String),
}

impl JobStatus {
    /// Still running; keep polling
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Initializing | Self::InProgress | Self::Stopping)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Initializing => "Initializing",
            Self::InProgress => "InProgress",
            Self::Stopping => "Stopping",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Stopped => "Stopped",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Initializing" => Self::Initializing,
            "InProgress" => Self::InProgress,
            "Stopping" => Self::Stopping,
            "Completed" => Self::Completed,
            "Failed" => Self::Failed,
            "Stopped" => Self::Stopped,
            _ => Self::Other(s),
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current state of one labeling job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescription {
    pub name: String,
    pub status: JobStatus,
    /// Output manifest; only meaningful once the job is terminal
    pub output_manifest: Option<ObjectUri>,
}

/// One observed status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatusEntry {
    pub job_name: String,
    pub status: JobStatus,
    pub observed_at: DateTime<Utc>,
}

/// Every status observed while waiting on jobs, in observation order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobStatusLog {
    entries: Vec<JobStatusEntry>,
}

impl JobStatusLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, job_name: &str, status: JobStatus) {
        self.entries.push(JobStatusEntry {
            job_name: job_name.to_string(),
            status,
            observed_at: clf_common::time::now(),
        });
    }

    pub fn entries(&self) -> &[JobStatusEntry] {
        &self.entries
    }

    /// Last status seen for `job_name`
    pub fn last_status(&self, job_name: &str) -> Option<&JobStatus> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.job_name == job_name)
            .map(|e| &e.status)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
