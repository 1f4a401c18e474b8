//! Job-output processing and reconciliation scenarios
//!
//! Chains the output collectors into the reconciler the way the collect
//! phase does, without storage or polling.

use clf_common::Error;
use clf_review::models::manifest::ShardEntry;
use clf_review::reconcile::{render_records, BoundingBoxOutputCollector, LabelVerificationCollector, ResultReconciler};
use serde_json::{json, Value};

fn entry(url: &str, label: &str) -> ShardEntry {
    ShardEntry {
        image_url: url.to_string(),
        label: label.to_string(),
        confidence: 90.0,
    }
}

fn answers(value: Value) -> serde_json::Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn parse(text: &str) -> Vec<Value> {
    text.lines().map(|l| serde_json::from_str(l).unwrap()).collect()
}

#[test]
fn test_image_in_two_batches_keeps_both_adjustments() {
    let mut boxes = BoundingBoxOutputCollector::new();
    let first = json!({"source-ref": "s3://p/a.jpg", "bounding-box-new": {"annotations": [1]}, "bounding-box-new-metadata": {"batch": 0}});
    let second = json!({"source-ref": "s3://p/a.jpg", "bounding-box-new": {"annotations": [2]}, "bounding-box-new-metadata": {"batch": 1}});
    boxes
        .add_output(&format!("{}\n{}\n", first, second))
        .unwrap();

    assert_eq!(boxes.len(), 1);
    assert_eq!(boxes.duplicates(), 1);

    let records = boxes.into_records();
    let record = &records[0];
    assert_eq!(record["bounding-box-new"]["annotations"][0], 1);

    let extra: Vec<&String> = record
        .keys()
        .filter(|k| k.ends_with("-bounding-box-new"))
        .collect();
    assert_eq!(extra.len(), 1);
    let prefix = extra[0].trim_end_matches("-bounding-box-new");
    assert!(uuid::Uuid::parse_str(prefix).is_ok());
    assert_eq!(record[&format!("{}-bounding-box-new-metadata", prefix)]["batch"], 1);
}

#[test]
fn test_verified_labels_merge_with_adjusted_boxes() {
    let mut labels = LabelVerificationCollector::new();
    let shard = vec![entry("s3://p/a.jpg", "cat"), entry("s3://p/b.jpg", "cat")];
    labels.add_answers(&shard, &answers(json!({"item-0": "Confirmed", "item-1": "No"})));
    labels.add_answers(&[entry("s3://p/a.jpg", "pet")], &answers(json!({"item-0": true})));
    assert_eq!(labels.len(), 1);

    let label_text = render_records(&labels.into_records("job-1", "2024-05-01T10:00:00.000000")).unwrap();

    let mut boxes = BoundingBoxOutputCollector::new();
    boxes
        .add_output(r#"{"source-ref":"s3://p/a.jpg","bounding-box-new":{"annotations":[]},"bounding-box-new-metadata":{}}"#)
        .unwrap();
    let box_text = render_records(&boxes.into_records()).unwrap();

    let reconciler = ResultReconciler::reconcile(Some(&label_text), Some(&box_text), None).unwrap();
    assert_eq!(reconciler.len(), 1);

    let merged = parse(&reconciler.render().unwrap());
    let record = &merged[0];
    assert_eq!(record["label-0-metadata"]["class-name"], "cat");
    assert_eq!(record["label-1-metadata"]["class-name"], "pet");
    assert_eq!(record["label-1-metadata"]["confidence"], 1);
    assert!(record.get("bounding-box-new").is_some());

    // source-ref first, labels next, overlaid fields last
    let keys: Vec<&String> = record.as_object().unwrap().keys().collect();
    assert_eq!(keys[0], "source-ref");
    assert_eq!(keys.last().map(|k| k.as_str()), Some("bounding-box-new-metadata"));
}

#[test]
fn test_malformed_bounding_box_line_reports_position() {
    let text = "{\"source-ref\":\"s3://p/a.jpg\"}\n\nnot json\n";
    let err = ResultReconciler::reconcile(None, Some(text), None).unwrap_err();
    match err {
        Error::MalformedRecord { line, .. } => assert_eq!(line, 3),
        other => panic!("expected MalformedRecord, got {:?}", other),
    }
}

#[test]
fn test_record_without_source_ref_is_malformed() {
    let err = ResultReconciler::reconcile(Some("{\"label-0\":\"0\"}"), None, None).unwrap_err();
    assert!(matches!(err, Error::MalformedRecord { line: 1, .. }));
}
