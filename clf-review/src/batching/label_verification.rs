//! Label-verification shard packing
//!
//! Each label's images are cut into shards of at most `max_images_per_batch`
//! entries. Shard indexes restart at 0 for every label. One aggregate
//! manifest line points at each shard.
//!
//! Shard files are named after a per-run unique file stem. Distinct labels
//! whose key-safe names coincide ("golden retriever", "golden-retriever")
//! get numbered stems so neither overwrites the other.

use crate::models::manifest::{to_json_lines, ShardEntry, ShardPointer};
use crate::models::run_layout::file_safe_label;
use crate::models::{LabelGroups, RunLayout};
use clf_common::ObjectUri;
use std::collections::HashSet;

/// Up to `max_images_per_batch` entries of one label
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestShard {
    pub label: String,
    /// Key-safe name of `label`, unique among the run's labels
    pub file_stem: String,
    /// Position among this label's shards
    pub index: usize,
    pub entries: Vec<ShardEntry>,
}

impl ManifestShard {
    /// Storage key of this shard within a run
    pub fn key(&self, layout: &RunLayout) -> String {
        layout.label_shard(&self.file_stem, self.index)
    }

    /// Shard file content: a JSON array of entries
    pub fn render(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.entries)
    }
}

/// Packs label groups into shards
#[derive(Debug, Clone, Copy)]
pub struct LabelVerificationBatcher {
    max_images_per_batch: usize,
}

impl LabelVerificationBatcher {
    /// `max_images_per_batch` of 0 is treated as 1
    pub fn new(max_images_per_batch: usize) -> Self {
        Self {
            max_images_per_batch: max_images_per_batch.max(1),
        }
    }

    pub fn batch(&self, groups: &LabelGroups) -> Vec<ManifestShard> {
        let mut shards = Vec::new();
        let mut stems = HashSet::new();

        for (label, entries) in groups.iter() {
            let file_stem = unique_stem(label, &mut stems);
            for (index, chunk) in entries.chunks(self.max_images_per_batch).enumerate() {
                shards.push(ManifestShard {
                    label: label.to_string(),
                    file_stem: file_stem.clone(),
                    index,
                    entries: chunk
                        .iter()
                        .map(|entry| ShardEntry {
                            image_url: entry.image.to_string(),
                            label: label.to_string(),
                            confidence: entry.confidence,
                        })
                        .collect(),
                });
            }
        }

        tracing::debug!(
            labels = groups.len(),
            shards = shards.len(),
            max_images_per_batch = self.max_images_per_batch,
            "Label-verification shards packed"
        );
        shards
    }
}

/// Key-safe stem for `label`, numbered when another label already took it
fn unique_stem(label: &str, used: &mut HashSet<String>) -> String {
    let base = file_safe_label(label);
    let mut stem = base.clone();
    let mut n = 1;
    while used.contains(&stem) {
        n += 1;
        stem = format!("{}-{}", base, n);
    }
    if stem != base {
        tracing::warn!(label, file_stem = %stem, "Label file name already in use; shards renamed");
    }
    used.insert(stem.clone());
    stem
}

/// Aggregate manifest: one `{"source-ref": <shard uri>}` line per shard
pub fn aggregate_manifest(shard_uris: &[ObjectUri]) -> serde_json::Result<String> {
    to_json_lines(shard_uris.iter().map(|uri| ShardPointer {
        source_ref: uri.to_string(),
    }))
}
