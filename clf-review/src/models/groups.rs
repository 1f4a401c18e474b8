//! Grouping outcome sets
//!
//! All three structures live for the duration of one run. They are built
//! append-only by the grouping engine and then handed to the batchers.
//! Label order is first-seen order; within a label, entries keep insertion
//! order.

use super::detection::{DetectionInstance, ImageRef};
use indexmap::IndexMap;

/// Image classified with a whole-image label
#[derive(Debug, Clone, PartialEq)]
pub struct LabelGroupEntry {
    pub image: ImageRef,
    /// Confidence rounded to 2 decimals
    pub confidence: f64,
}

/// Image where a label produced at least one instance
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBoxGroupEntry {
    pub image: ImageRef,
    pub width: u32,
    pub height: u32,
    pub instances: Vec<DetectionInstance>,
}

/// Label name → ordered entries
#[derive(Debug, Clone, PartialEq)]
pub struct LabelIndex<E> {
    groups: IndexMap<String, Vec<E>>,
}

/// Whole-image label groups
pub type LabelGroups = LabelIndex<LabelGroupEntry>;

/// Bounding-box groups
pub type BoundingBoxGroups = LabelIndex<BoundingBoxGroupEntry>;

impl<E> Default for LabelIndex<E> {
    fn default() -> Self {
        Self {
            groups: IndexMap::new(),
        }
    }
}

impl<E> LabelIndex<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry under `label`, creating the group on first sight
    pub fn push(&mut self, label: &str, entry: E) {
        match self.groups.get_mut(label) {
            Some(entries) => entries.push(entry),
            None => {
                self.groups.insert(label.to_string(), vec![entry]);
            }
        }
    }

    pub fn get(&self, label: &str) -> Option<&[E]> {
        self.groups.get(label).map(Vec::as_slice)
    }

    /// Labels with their entries, in first-seen label order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[E])> {
        self.groups.iter().map(|(label, entries)| (label.as_str(), entries.as_slice()))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Number of distinct labels
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total entries across all labels
    pub fn entry_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

/// Width/height of an image, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Images with zero detected labels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoLabelSet {
    images: IndexMap<ImageRef, ImageDimensions>,
}

impl NoLabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an image; first write wins
    ///
    /// Returns false (and leaves the stored dimensions untouched) when the
    /// image is already present.
    pub fn insert(&mut self, image: ImageRef, width: u32, height: u32) -> bool {
        if self.images.contains_key(&image) {
            return false;
        }
        self.images.insert(image, ImageDimensions { width, height });
        true
    }

    pub fn contains(&self, image: &ImageRef) -> bool {
        self.images.contains_key(image)
    }

    pub fn get(&self, image: &ImageRef) -> Option<ImageDimensions> {
        self.images.get(image).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ImageRef, &ImageDimensions)> {
        self.images.iter()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
