//! Bounding-box adjustment job output
//!
//! An image can appear in several batches (one per label batch it had
//! boxes in). The first occurrence creates the image's record; later
//! occurrences are kept under collision-free `<uuid>-bounding-box-new`
//! keys.

use super::{parse_json_lines, Record};
use crate::models::manifest::{BoundingBoxOutputLine, SOURCE_REF};
use crate::services::job_service::BOUNDING_BOX_ATTRIBUTE;
use clf_common::Result;
use indexmap::IndexMap;
use serde_json::Value;

pub const STREAM: &str = "bounding-box output";

/// Adjusted boxes per image, in first-seen image order
#[derive(Debug, Default)]
pub struct BoundingBoxOutputCollector {
    records: IndexMap<String, Record>,
    duplicates: usize,
}

impl BoundingBoxOutputCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_line(&mut self, line: BoundingBoxOutputLine) {
        let metadata_key = format!("{}-metadata", BOUNDING_BOX_ATTRIBUTE);

        match self.records.get_mut(&line.source_ref) {
            Some(record) => {
                let id = clf_common::uuid_utils::generate();
                record.insert(format!("{}-{}", id, BOUNDING_BOX_ATTRIBUTE), line.bounding_box);
                record.insert(format!("{}-{}", id, metadata_key), line.metadata);
                self.duplicates += 1;
            }
            None => {
                let mut record = Record::new();
                record.insert(SOURCE_REF.to_string(), Value::String(line.source_ref.clone()));
                record.insert(BOUNDING_BOX_ATTRIBUTE.to_string(), line.bounding_box);
                record.insert(metadata_key, line.metadata);
                self.records.insert(line.source_ref, record);
            }
        }
    }

    /// Add every line of one job's output manifest
    pub fn add_output(&mut self, output_text: &str) -> Result<()> {
        let lines: Vec<BoundingBoxOutputLine> = parse_json_lines(output_text, STREAM)?;
        for line in lines {
            self.add_line(line);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Occurrences stored under generated keys
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clf_common::Error;
    use serde_json::json;

    fn output_line(source: &str, marker: i64) -> String {
        json!({
            "source-ref": source,
            "bounding-box-new": {"annotations": [{"class_id": 0, "left": marker}]},
            "bounding-box-new-metadata": {"job-name": "labeling-job/run-0"},
            "ignored-extra": true
        })
        .to_string()
    }

    #[test]
    fn test_first_occurrence_creates_record() {
        let mut collector = BoundingBoxOutputCollector::new();
        collector
            .add_output(&format!("{}\n{}\n", output_line("s3://p/a.jpg", 1), output_line("s3://p/b.jpg", 2)))
            .unwrap();

        let records = collector.into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0][SOURCE_REF], "s3://p/a.jpg");
        assert_eq!(records[0]["bounding-box-new"]["annotations"][0]["left"], 1);
        assert!(records[0].contains_key("bounding-box-new-metadata"));
        assert!(!records[0].contains_key("ignored-extra"));
    }

    #[test]
    fn test_duplicate_image_kept_under_generated_keys() {
        let mut collector = BoundingBoxOutputCollector::new();
        collector.add_output(&output_line("s3://p/a.jpg", 1)).unwrap();
        collector.add_output(&output_line("s3://p/a.jpg", 2)).unwrap();
        assert_eq!(collector.duplicates(), 1);

        let records = collector.into_records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.len(), 5);
        assert_eq!(record["bounding-box-new"]["annotations"][0]["left"], 1);

        let extra_key = record
            .keys()
            .find(|k| k.ends_with("-bounding-box-new") && k.as_str() != "bounding-box-new")
            .unwrap();
        assert_eq!(record[extra_key.as_str()]["annotations"][0]["left"], 2);
        assert!(record.contains_key(&format!("{}-metadata", extra_key)));
    }

    #[test]
    fn test_line_missing_attribute_is_malformed() {
        let mut collector = BoundingBoxOutputCollector::new();
        let result = collector.add_output("{\"source-ref\":\"s3://p/a.jpg\"}\n");
        assert!(matches!(result, Err(Error::MalformedRecord { line: 1, .. })));
    }
}
