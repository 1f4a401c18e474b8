//! Merge of the three review result streams into the final manifest
//!
//! 1. Label-verification records seed the merge map verbatim.
//! 2. Bounding-box records overlay an existing record field by field
//!    (everything but `source-ref`), or are inserted as new records.
//! 3. No-label records replace whatever is stored for their image.

use super::{parse_records, render_records, Record};
use crate::models::manifest::SOURCE_REF;
use clf_common::Result;
use indexmap::IndexMap;

pub const LABEL_STREAM: &str = "labels output";
pub const BOUNDING_BOX_STREAM: &str = "bounding-box output";
pub const NO_LABEL_STREAM: &str = "no-labels manifest";

/// Merge map keyed by `source-ref`
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ResultReconciler {
    records: IndexMap<String, Record>,
}

impl ResultReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run all three steps; any stream may be absent
    pub fn reconcile(
        label_verification: Option<&str>,
        bounding_box: Option<&str>,
        no_labels: Option<&str>,
    ) -> Result<Self> {
        let mut reconciler = Self::new();
        if let Some(text) = label_verification {
            reconciler.seed_labels(text)?;
        }
        if let Some(text) = bounding_box {
            reconciler.overlay_bounding_boxes(text)?;
        }
        if let Some(text) = no_labels {
            reconciler.apply_no_labels(text)?;
        }
        Ok(reconciler)
    }

    pub fn seed_labels(&mut self, text: &str) -> Result<()> {
        for (source_ref, record) in parse_records(text, LABEL_STREAM)? {
            self.records.insert(source_ref, record);
        }
        Ok(())
    }

    pub fn overlay_bounding_boxes(&mut self, text: &str) -> Result<()> {
        for (source_ref, record) in parse_records(text, BOUNDING_BOX_STREAM)? {
            self.overlay(source_ref, record);
        }
        Ok(())
    }

    /// Copy every field except `source-ref` onto the stored record
    pub fn overlay(&mut self, source_ref: String, record: Record) {
        match self.records.get_mut(&source_ref) {
            Some(existing) => {
                for (key, value) in record {
                    if key != SOURCE_REF {
                        existing.insert(key, value);
                    }
                }
            }
            None => {
                self.records.insert(source_ref, record);
            }
        }
    }

    pub fn apply_no_labels(&mut self, text: &str) -> Result<()> {
        for (source_ref, record) in parse_records(text, NO_LABEL_STREAM)? {
            if self.records.contains_key(&source_ref) {
                tracing::warn!(
                    source_ref = %source_ref,
                    "No-label record replaces a labeled record"
                );
            }
            self.records.insert(source_ref, record);
        }
        Ok(())
    }

    pub fn get(&self, source_ref: &str) -> Option<&Record> {
        self.records.get(source_ref)
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Final manifest text, one record per line
    pub fn render(&self) -> Result<String> {
        render_records(self.records.values())
    }
}
