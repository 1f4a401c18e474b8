//! Per-run storage layout
//!
//! Every artifact of a run lives under `datasets/<run-id>/` in the output
//! bucket. All keys are pure functions of run id, batch index and label.

use clf_common::ObjectUri;

/// Key prefix shared by all runs
pub const DATASETS_PREFIX: &str = "datasets";

/// Deterministic artifact keys for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    run_id: String,
    root: String,
}

impl RunLayout {
    pub fn new(run_id: impl Into<String>) -> Self {
        let run_id = run_id.into();
        let root = format!("{}/{}", DATASETS_PREFIX, run_id);
        Self { run_id, root }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn label_manifest_dir(&self) -> String {
        format!("{}/label-verification/manifest", self.root)
    }

    /// Shard `index` of `label`; spaces in the label become `-`
    pub fn label_shard(&self, label: &str, index: usize) -> String {
        format!(
            "{}/manifest-{}-{}.json",
            self.label_manifest_dir(),
            file_safe_label(label),
            index
        )
    }

    pub fn label_manifest(&self) -> String {
        format!("{}/manifest.json", self.label_manifest_dir())
    }

    pub fn label_template(&self) -> String {
        format!("{}/html-template.html", self.label_manifest_dir())
    }

    pub fn label_job_output_dir(&self) -> String {
        format!("{}/label-verification/ground-truth-output", self.root)
    }

    pub fn labels_output(&self) -> String {
        format!("{}/label-verification/output/labels-output.manifest", self.root)
    }

    pub fn bounding_box_manifest_dir(&self) -> String {
        format!("{}/bounding-box-verification/manifest", self.root)
    }

    pub fn bounding_box_manifest(&self, batch: usize) -> String {
        format!("{}/manifest-{}.json", self.bounding_box_manifest_dir(), batch)
    }

    pub fn bounding_box_labels(&self, batch: usize) -> String {
        format!("{}/labels-{}.json", self.bounding_box_manifest_dir(), batch)
    }

    pub fn bounding_box_template(&self, batch: usize) -> String {
        format!("{}/html-template-{}.html", self.bounding_box_manifest_dir(), batch)
    }

    pub fn bounding_box_job_output_dir(&self) -> String {
        format!("{}/bounding-box-verification/ground-truth-output", self.root)
    }

    pub fn bounding_box_output(&self) -> String {
        format!(
            "{}/bounding-box-verification/output/bounding-box-output.manifest",
            self.root
        )
    }

    pub fn no_labels_manifest(&self) -> String {
        format!("{}/no-labels/manifest/nolabels.json", self.root)
    }

    pub fn jobs_descriptor(&self) -> String {
        format!("{}/jobs/jobs.json", self.root)
    }

    pub fn final_output(&self) -> String {
        format!("{}/output/output.manifest", self.root)
    }

    /// Bounding-box adjustment job name for `batch`
    pub fn bounding_box_job_name(&self, batch: usize) -> String {
        format!("{}-{}", self.run_id, batch)
    }

    /// `s3://bucket/key` for a key of this layout
    pub fn uri(&self, bucket: &str, key: impl Into<String>) -> ObjectUri {
        ObjectUri::new(bucket, key)
    }
}

/// Label name usable inside an object key
pub fn file_safe_label(label: &str) -> String {
    label.replace(' ', "-")
}
