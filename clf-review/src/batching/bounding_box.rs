//! Bounding-box batch packing
//!
//! Labels are packed into batches of at most `max_labels_per_batch`. A
//! running label index `i` spans all batches: a new batch starts whenever
//! `i % max_labels_per_batch == 0` and the label gets class id `i`. A label
//! therefore never spans two batches and no class id repeats across batches.

use crate::models::manifest::{
    Annotation, BoundingBoxAttribute, BoundingBoxManifestLine, BoundingBoxMetadata, ImageSize,
    LabelCatalog, ObjectConfidence, BOUNDING_BOX_INPUT_JOB_NAME, OBJECT_DETECTION_TYPE,
};
use crate::models::{BoundingBoxGroups, DetectionInstance, ImageRef};
use indexmap::IndexMap;

/// Confidence attached to every submitted annotation
///
/// This is input to the adjustment task, not a detector score.
pub const PLACEHOLDER_CONFIDENCE: f64 = 0.9;

/// Per-image accumulation inside one batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchImage {
    pub image: ImageRef,
    pub width: u32,
    pub height: u32,
    pub annotations: Vec<Annotation>,
    pub confidences: Vec<f64>,
    /// Class ids used by this image's annotations
    pub class_map: IndexMap<u32, String>,
}

impl BatchImage {
    fn new(image: ImageRef, width: u32, height: u32) -> Self {
        Self {
            image,
            width,
            height,
            annotations: Vec::new(),
            confidences: Vec::new(),
            class_map: IndexMap::new(),
        }
    }

    fn add_instance(&mut self, class_id: u32, instance: &DetectionInstance) {
        self.annotations.push(Annotation {
            class_id,
            left: instance.left as i64,
            top: instance.top as i64,
            width: instance.width as i64,
            height: instance.height as i64,
        });
        self.confidences.push(PLACEHOLDER_CONFIDENCE);
    }

    fn manifest_line(&self) -> BoundingBoxManifestLine {
        BoundingBoxManifestLine {
            source_ref: self.image.to_string(),
            bounding_box: BoundingBoxAttribute {
                image_size: vec![ImageSize::new(self.width, self.height)],
                annotations: self.annotations.clone(),
            },
            metadata: BoundingBoxMetadata {
                objects: self
                    .confidences
                    .iter()
                    .map(|&confidence| ObjectConfidence { confidence })
                    .collect(),
                class_map: self.class_map.clone(),
                annotation_type: OBJECT_DETECTION_TYPE.to_string(),
                job_name: BOUNDING_BOX_INPUT_JOB_NAME.to_string(),
            },
        }
    }
}

/// One adjustment job's worth of labels and images
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestBatch {
    pub index: usize,
    /// Class id → label, in class-id order
    pub labels: IndexMap<u32, String>,
    pub images: IndexMap<ImageRef, BatchImage>,
}

impl ManifestBatch {
    fn new(index: usize) -> Self {
        Self {
            index,
            labels: IndexMap::new(),
            images: IndexMap::new(),
        }
    }

    pub fn manifest_lines(&self) -> Vec<BoundingBoxManifestLine> {
        self.images.values().map(BatchImage::manifest_line).collect()
    }

    /// Newline-delimited manifest, one image per line
    pub fn render_manifest(&self) -> serde_json::Result<String> {
        crate::models::manifest::to_json_lines(self.manifest_lines())
    }

    pub fn catalog(&self) -> LabelCatalog {
        LabelCatalog::new(self.labels.values().map(String::as_str))
    }

    pub fn annotation_count(&self) -> usize {
        self.images.values().map(|i| i.annotations.len()).sum()
    }
}

/// Packs bounding-box groups into batches
#[derive(Debug, Clone, Copy)]
pub struct BoundingBoxBatcher {
    max_labels_per_batch: usize,
}

impl BoundingBoxBatcher {
    /// `max_labels_per_batch` of 0 is treated as 1
    pub fn new(max_labels_per_batch: usize) -> Self {
        Self {
            max_labels_per_batch: max_labels_per_batch.max(1),
        }
    }

    pub fn batch(&self, groups: &BoundingBoxGroups) -> Vec<ManifestBatch> {
        let mut batches: Vec<ManifestBatch> = Vec::new();

        for (label_index, (label, entries)) in groups.iter().enumerate() {
            if label_index % self.max_labels_per_batch == 0 {
                batches.push(ManifestBatch::new(batches.len()));
            }
            let Some(batch) = batches.last_mut() else {
                continue;
            };

            let class_id = label_index as u32;
            batch.labels.insert(class_id, label.to_string());

            for entry in entries {
                let image = batch
                    .images
                    .entry(entry.image.clone())
                    .or_insert_with(|| BatchImage::new(entry.image.clone(), entry.width, entry.height));

                for instance in &entry.instances {
                    image.add_instance(class_id, instance);
                }
                image.class_map.entry(class_id).or_insert_with(|| label.to_string());
            }
        }

        tracing::debug!(
            labels = groups.len(),
            batches = batches.len(),
            max_labels_per_batch = self.max_labels_per_batch,
            "Bounding-box batches packed"
        );
        batches
    }
}
