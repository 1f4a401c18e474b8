//! Label-verification job output
//!
//! Each output line answers one shard: `labels["item-<i>"]` is the
//! reviewer's verdict on shard entry `i`. Confirmed entries become
//! `label-<n>` / `label-<n>-metadata` fields on the image's record.

use super::{parse_json_lines, Record};
use crate::models::manifest::{
    LabelVerificationOutputLine, ShardEntry, IMAGE_CLASSIFICATION_TYPE, SOURCE_REF,
};
use crate::services::ObjectStore;
use clf_common::{Error, ObjectUri, Result};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};

/// Stream name used in malformed-record errors
pub const STREAM: &str = "label-verification output";

/// True for a checked checkbox (`"Confirmed"`), a `"Yes"`, or JSON `true`
pub fn is_confirmed(answer: &Value) -> bool {
    match answer {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("confirmed") || s.eq_ignore_ascii_case("yes"),
        _ => false,
    }
}

/// Confirmed labels per image, in first-seen image order
#[derive(Debug, Default)]
pub struct LabelVerificationCollector {
    verified: IndexMap<String, Vec<String>>,
}

impl LabelVerificationCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one reviewer answer set to the shard it refers to
    pub fn add_answers(&mut self, shard: &[ShardEntry], answers: &Map<String, Value>) {
        for (i, entry) in shard.iter().enumerate() {
            let confirmed = answers
                .get(&format!("item-{}", i))
                .map(is_confirmed)
                .unwrap_or(false);
            if confirmed {
                self.verified
                    .entry(entry.image_url.clone())
                    .or_default()
                    .push(entry.label.clone());
            }
        }
    }

    /// Read the job output and every shard it references
    pub async fn collect(&mut self, store: &dyn ObjectStore, output_text: &str) -> Result<()> {
        let lines: Vec<LabelVerificationOutputLine> = parse_json_lines(output_text, STREAM)?;

        for line in lines {
            let shard_uri: ObjectUri = line.source_ref.parse()?;
            let shard_text = store.read(&shard_uri).await?;
            let shard: Vec<ShardEntry> = serde_json::from_str(&shard_text).map_err(|e| {
                Error::MalformedRecord {
                    stream: shard_uri.to_string(),
                    line: 1,
                    reason: e.to_string(),
                }
            })?;
            self.add_answers(&shard, &line.labels);
        }

        tracing::debug!(images = self.verified.len(), "Label verification answers collected");
        Ok(())
    }

    /// Images with at least one confirmed label
    pub fn len(&self) -> usize {
        self.verified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verified.is_empty()
    }

    /// One record per image with a confirmed label
    pub fn into_records(self, job_name: &str, creation_date: &str) -> Vec<Record> {
        self.verified
            .into_iter()
            .map(|(image_url, labels)| {
                let mut record = Record::new();
                record.insert(SOURCE_REF.to_string(), Value::String(image_url));
                for (n, label) in labels.into_iter().enumerate() {
                    record.insert(format!("label-{}", n), Value::String("0".to_string()));
                    record.insert(
                        format!("label-{}-metadata", n),
                        json!({
                            "class-name": label,
                            "confidence": 1,
                            "type": IMAGE_CLASSIFICATION_TYPE,
                            "job-name": job_name,
                            "human-annotated": "yes",
                            "creation-date": creation_date,
                        }),
                    );
                }
                record
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryObjectStore;

    fn shard(entries: &[(&str, &str)]) -> Vec<ShardEntry> {
        entries
            .iter()
            .map(|(url, label)| ShardEntry {
                image_url: url.to_string(),
                label: label.to_string(),
                confidence: 0.95,
            })
            .collect()
    }

    fn answers(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_confirmation_values() {
        assert!(is_confirmed(&json!("Confirmed")));
        assert!(is_confirmed(&json!("Yes")));
        assert!(is_confirmed(&json!(true)));
        assert!(!is_confirmed(&json!("No")));
        assert!(!is_confirmed(&json!(false)));
        assert!(!is_confirmed(&json!(null)));
    }

    #[test]
    fn test_confirmed_cat_becomes_label_field() {
        let mut collector = LabelVerificationCollector::new();
        collector.add_answers(
            &shard(&[("s3://photos/cat.jpg", "cat")]),
            &answers(json!({"item-0": "Confirmed"})),
        );

        let records = collector.into_records("job-1", "2024-01-01T00:00:00.000000");
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record[SOURCE_REF], "s3://photos/cat.jpg");
        assert_eq!(record["label-0"], "0");
        assert_eq!(record["label-0-metadata"]["class-name"], "cat");
        assert_eq!(record["label-0-metadata"]["confidence"], 1);
        assert_eq!(record["label-0-metadata"]["type"], IMAGE_CLASSIFICATION_TYPE);
        assert_eq!(record["label-0-metadata"]["job-name"], "job-1");
    }

    #[test]
    fn test_unanswered_and_rejected_items_dropped() {
        let mut collector = LabelVerificationCollector::new();
        collector.add_answers(
            &shard(&[("s3://p/a.jpg", "cat"), ("s3://p/b.jpg", "cat"), ("s3://p/c.jpg", "cat")]),
            &answers(json!({"item-0": "No", "item-2": "Yes"})),
        );
        let records = collector.into_records("job", "now");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0][SOURCE_REF], "s3://p/c.jpg");
    }

    #[test]
    fn test_labels_from_several_shards_numbered_per_image() {
        let mut collector = LabelVerificationCollector::new();
        collector.add_answers(&shard(&[("s3://p/a.jpg", "cat")]), &answers(json!({"item-0": "Yes"})));
        collector.add_answers(&shard(&[("s3://p/a.jpg", "pet")]), &answers(json!({"item-0": "Yes"})));

        let records = collector.into_records("job", "now");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["label-0-metadata"]["class-name"], "cat");
        assert_eq!(records[0]["label-1-metadata"]["class-name"], "pet");
    }

    #[tokio::test]
    async fn test_collect_reads_referenced_shards() {
        let store = MemoryObjectStore::new();
        let shard_uri = ObjectUri::new("out", "lv/manifest-cat-0.json");
        let entries = shard(&[("s3://p/a.jpg", "cat"), ("s3://p/b.jpg", "cat")]);
        store
            .write(&shard_uri, &serde_json::to_string(&entries).unwrap())
            .await
            .unwrap();

        let output = format!(
            "{}\n",
            json!({"source-ref": shard_uri.to_string(), "labels": {"item-0": "Confirmed", "item-1": "Confirmed"}})
        );

        let mut collector = LabelVerificationCollector::new();
        collector.collect(&store, &output).await.unwrap();
        assert_eq!(collector.len(), 2);
    }

    #[tokio::test]
    async fn test_collect_missing_shard_is_storage_error() {
        let store = MemoryObjectStore::new();
        let output = "{\"source-ref\":\"s3://out/missing.json\",\"labels\":{}}\n";
        let mut collector = LabelVerificationCollector::new();
        assert!(matches!(
            collector.collect(&store, output).await,
            Err(Error::Storage(_))
        ));
    }
}
