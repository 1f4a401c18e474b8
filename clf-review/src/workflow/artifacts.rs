//! Run artifact persistence
//!
//! All artifacts of a run go to one bucket under the run's [`RunLayout`].
//! Writes are independent: a failure part-way through a batch leaves the
//! already-written artifacts in place.

use crate::batching::{aggregate_manifest, ManifestBatch, ManifestShard};
use crate::models::manifest::{to_json_lines, NoLabelManifestLine};
use crate::models::{JobsDescriptor, NoLabelSet, RunLayout};
use crate::services::ObjectStore;
use clf_common::{Error, ObjectUri, Result};
use std::collections::HashSet;

/// Locations of one bounding-box batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchArtifacts {
    pub manifest: ObjectUri,
    pub labels: ObjectUri,
    pub template: ObjectUri,
}

/// Locations of the label-verification inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelVerificationArtifacts {
    pub manifest: ObjectUri,
    pub template: ObjectUri,
    pub shards: Vec<ObjectUri>,
}

/// Writes a run's artifacts to storage
pub struct ArtifactWriter<'a> {
    store: &'a dyn ObjectStore,
    bucket: &'a str,
    layout: &'a RunLayout,
}

impl<'a> ArtifactWriter<'a> {
    pub fn new(store: &'a dyn ObjectStore, bucket: &'a str, layout: &'a RunLayout) -> Self {
        Self {
            store,
            bucket,
            layout,
        }
    }

    pub fn uri(&self, key: String) -> ObjectUri {
        self.layout.uri(self.bucket, key)
    }

    async fn put(&self, key: String, content: &str) -> Result<ObjectUri> {
        let uri = self.uri(key);
        self.store.write(&uri, content).await?;
        Ok(uri)
    }

    /// No-label manifest; nothing is written for an empty set.
    ///
    /// Images whose detection failed carry a 0x0 `image_size`: zero width
    /// and height mean the size is unknown, not an empty image.
    pub async fn write_no_labels(
        &self,
        no_labels: &NoLabelSet,
        creation_date: &str,
    ) -> Result<Option<ObjectUri>> {
        if no_labels.is_empty() {
            return Ok(None);
        }

        let text = to_json_lines(no_labels.iter().map(|(image, dims)| {
            NoLabelManifestLine::new(image.as_str(), dims.width, dims.height, creation_date.to_string())
        }))?;

        let uri = self.put(self.layout.no_labels_manifest(), &text).await?;
        tracing::info!(uri = %uri, images = no_labels.len(), "No-label manifest written");
        Ok(Some(uri))
    }

    /// Label catalog, UI template and manifest of one batch
    pub async fn write_bounding_box_batch(
        &self,
        batch: &ManifestBatch,
        template_html: &str,
    ) -> Result<BatchArtifacts> {
        let catalog = serde_json::to_string(&batch.catalog())?;
        let labels = self
            .put(self.layout.bounding_box_labels(batch.index), &catalog)
            .await?;

        let template = self
            .put(self.layout.bounding_box_template(batch.index), template_html)
            .await?;

        let manifest_text = batch.render_manifest()?;
        let manifest = self
            .put(self.layout.bounding_box_manifest(batch.index), &manifest_text)
            .await?;

        tracing::debug!(
            batch = batch.index,
            labels = batch.labels.len(),
            images = batch.images.len(),
            "Bounding-box batch written"
        );

        Ok(BatchArtifacts {
            manifest,
            labels,
            template,
        })
    }

    /// Shards, aggregate manifest and UI template for label verification
    pub async fn write_label_verification(
        &self,
        shards: &[ManifestShard],
        template_html: &str,
    ) -> Result<LabelVerificationArtifacts> {
        let mut keys = HashSet::with_capacity(shards.len());
        for shard in shards {
            if !keys.insert(shard.key(self.layout)) {
                return Err(Error::Internal(format!(
                    "label '{}' shard {} would overwrite another shard",
                    shard.label, shard.index
                )));
            }
        }

        let mut shard_uris = Vec::with_capacity(shards.len());
        for shard in shards {
            let uri = self.put(shard.key(self.layout), &shard.render()?).await?;
            shard_uris.push(uri);
        }

        let manifest = self
            .put(self.layout.label_manifest(), &aggregate_manifest(&shard_uris)?)
            .await?;
        tracing::info!(uri = %manifest, shards = shard_uris.len(), "Generated label verification manifest");

        let template = self.put(self.layout.label_template(), template_html).await?;

        Ok(LabelVerificationArtifacts {
            manifest,
            template,
            shards: shard_uris,
        })
    }

    pub async fn write_jobs_descriptor(&self, descriptor: &JobsDescriptor) -> Result<ObjectUri> {
        let text = serde_json::to_string(descriptor)?;
        self.put(self.layout.jobs_descriptor(), &text).await
    }

    /// Persist a finished manifest under `key`
    pub async fn write_manifest(&self, key: String, text: &str) -> Result<ObjectUri> {
        self.put(key, text).await
    }
}

/// Load a jobs descriptor written by `start-review`
pub async fn read_jobs_descriptor(store: &dyn ObjectStore, uri: &ObjectUri) -> Result<JobsDescriptor> {
    let text = store.read(uri).await?;
    Ok(serde_json::from_str(&text)?)
}
