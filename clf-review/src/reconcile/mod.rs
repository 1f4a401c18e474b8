//! Collect-phase processing: job outputs → per-source manifests → merge
//!
//! Every stream is newline-delimited JSON. Blank lines are skipped; any
//! other unparseable line aborts with [`Error::MalformedRecord`].

pub mod bounding_box_output;
pub mod label_output;
pub mod merger;

pub use bounding_box_output::BoundingBoxOutputCollector;
pub use label_output::LabelVerificationCollector;
pub use merger::ResultReconciler;

use crate::models::manifest::SOURCE_REF;
use clf_common::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Manifest record: field name → value, including `source-ref`
pub type Record = Map<String, Value>;

/// Parse typed lines, skipping blanks
pub fn parse_json_lines<T: DeserializeOwned>(text: &str, stream: &str) -> Result<Vec<T>> {
    let mut items = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(line).map_err(|e| Error::MalformedRecord {
            stream: stream.to_string(),
            line: idx + 1,
            reason: e.to_string(),
        })?;
        items.push(item);
    }
    Ok(items)
}

/// Parse records keyed by their `source-ref`
pub fn parse_records(text: &str, stream: &str) -> Result<Vec<(String, Record)>> {
    let mut records = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let malformed = |reason: String| Error::MalformedRecord {
            stream: stream.to_string(),
            line: idx + 1,
            reason,
        };

        let record: Record = serde_json::from_str(line).map_err(|e| malformed(e.to_string()))?;
        let source_ref = record
            .get(SOURCE_REF)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| malformed(format!("missing string {}", SOURCE_REF)))?;
        records.push((source_ref, record));
    }
    Ok(records)
}

/// Serialize records one JSON object per line
pub fn render_records<'a>(records: impl IntoIterator<Item = &'a Record>) -> Result<String> {
    Ok(crate::models::manifest::to_json_lines(records)?)
}
