//! Manifest line formats
//!
//! Manifests are newline-delimited JSON consumed and produced by the
//! labeling-job service. Field names follow the service's hyphenated keys.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Version tag of the label-category catalog format
pub const LABEL_CATALOG_VERSION: &str = "2018-11-28";

/// Annotation type tag for object-detection records
pub const OBJECT_DETECTION_TYPE: &str = "groundtruth/object-detection";

/// Annotation type tag for image-classification records
pub const IMAGE_CLASSIFICATION_TYPE: &str = "groundtruth/image-classification";

/// `job-name` tag carried by bounding-box review inputs
pub const BOUNDING_BOX_INPUT_JOB_NAME: &str = "labeling-job/test";

/// `job-name` tag carried by no-label records
pub const NO_LABEL_JOB_NAME: &str = "labeling-job/nolabels";

/// Colour depth reported for every image
pub const IMAGE_DEPTH: u8 = 3;

/// Key of the record identity in every manifest line
pub const SOURCE_REF: &str = "source-ref";

/// Image size block (`image_size` entries)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
    pub depth: u8,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth: IMAGE_DEPTH,
        }
    }
}

/// One bounding box submitted for adjustment, integer pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub class_id: u32,
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

/// Per-object confidence entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectConfidence {
    pub confidence: f64,
}

/// `bounding-box` attribute of a review input line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBoxAttribute {
    pub image_size: Vec<ImageSize>,
    pub annotations: Vec<Annotation>,
}

/// `bounding-box-metadata` attribute of a review input line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBoxMetadata {
    pub objects: Vec<ObjectConfidence>,
    #[serde(rename = "class-map")]
    pub class_map: IndexMap<u32, String>,
    #[serde(rename = "type")]
    pub annotation_type: String,
    #[serde(rename = "job-name")]
    pub job_name: String,
}

/// One image line of a bounding-box batch manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBoxManifestLine {
    #[serde(rename = "source-ref")]
    pub source_ref: String,
    #[serde(rename = "bounding-box")]
    pub bounding_box: BoundingBoxAttribute,
    #[serde(rename = "bounding-box-metadata")]
    pub metadata: BoundingBoxMetadata,
}

/// Label-category catalog of one bounding-box batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelCatalog {
    #[serde(rename = "document-version")]
    pub document_version: String,
    pub labels: Vec<CatalogLabel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogLabel {
    pub label: String,
}

impl LabelCatalog {
    pub fn new<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            document_version: LABEL_CATALOG_VERSION.to_string(),
            labels: labels
                .into_iter()
                .map(|label| CatalogLabel {
                    label: label.to_string(),
                })
                .collect(),
        }
    }
}

/// One entry of a label-verification shard file (the shard is a JSON array)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardEntry {
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    pub label: String,
    pub confidence: f64,
}

/// Aggregate manifest line pointing at one shard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardPointer {
    #[serde(rename = "source-ref")]
    pub source_ref: String,
}

/// `nolabel` attribute of a no-label record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoLabelAttribute {
    pub annotations: Vec<Annotation>,
    pub image_size: Vec<ImageSize>,
}

/// `nolabel-metadata` attribute of a no-label record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoLabelMetadata {
    #[serde(rename = "job-name")]
    pub job_name: String,
    #[serde(rename = "class-map")]
    pub class_map: IndexMap<u32, String>,
    #[serde(rename = "human-annotated")]
    pub human_annotated: String,
    pub objects: Vec<ObjectConfidence>,
    #[serde(rename = "creation-date")]
    pub creation_date: String,
    #[serde(rename = "type")]
    pub annotation_type: String,
}

/// One line of the no-label manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoLabelManifestLine {
    #[serde(rename = "source-ref")]
    pub source_ref: String,
    pub nolabel: NoLabelAttribute,
    #[serde(rename = "nolabel-metadata")]
    pub metadata: NoLabelMetadata,
}

impl NoLabelManifestLine {
    pub fn new(source_ref: impl Into<String>, width: u32, height: u32, creation_date: String) -> Self {
        Self {
            source_ref: source_ref.into(),
            nolabel: NoLabelAttribute {
                annotations: Vec::new(),
                image_size: vec![ImageSize::new(width, height)],
            },
            metadata: NoLabelMetadata {
                job_name: NO_LABEL_JOB_NAME.to_string(),
                class_map: IndexMap::new(),
                human_annotated: "yes".to_string(),
                objects: Vec::new(),
                creation_date,
                annotation_type: OBJECT_DETECTION_TYPE.to_string(),
            },
        }
    }
}

/// One line of a label-verification job output
///
/// `source-ref` points at the shard file that was reviewed; `labels` holds
/// the reviewer's answers keyed `item-<i>`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabelVerificationOutputLine {
    #[serde(rename = "source-ref")]
    pub source_ref: String,
    #[serde(default)]
    pub labels: Map<String, Value>,
}

/// One line of a bounding-box adjustment job output
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoundingBoxOutputLine {
    #[serde(rename = "source-ref")]
    pub source_ref: String,
    #[serde(rename = "bounding-box-new")]
    pub bounding_box: Value,
    #[serde(rename = "bounding-box-new-metadata")]
    pub metadata: Value,
}

/// Serialize records as newline-delimited JSON (one object per line)
pub fn to_json_lines<T: Serialize>(records: impl IntoIterator<Item = T>) -> serde_json::Result<String> {
    let mut text = String::new();
    for record in records {
        text.push_str(&serde_json::to_string(&record)?);
        text.push('\n');
    }
    Ok(text)
}
