//! Partition detection results into outcome sets
//!
//! Every image lands in the no-label set, or contributes one entry per label
//! to the label groups (whole-image labels) or bounding-box groups (labels
//! with instances). Failed detections count as having no labels.

use crate::models::{
    round2, BoundingBoxGroupEntry, BoundingBoxGroups, DetectionInstance, DetectionResult,
    LabelGroupEntry, LabelGroups, NoLabelSet,
};

/// The three disjoint outcome sets of one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedDetections {
    pub label_groups: LabelGroups,
    pub bounding_box_groups: BoundingBoxGroups,
    pub no_labels: NoLabelSet,
}

impl GroupedDetections {
    pub fn is_empty(&self) -> bool {
        self.label_groups.is_empty() && self.bounding_box_groups.is_empty() && self.no_labels.is_empty()
    }
}

/// Incremental grouping state for one run
#[derive(Debug, Default)]
pub struct GroupingEngine {
    grouped: GroupedDetections,
    ingested: usize,
    failed: usize,
}

impl GroupingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, result: &DetectionResult) {
        self.ingested += 1;
        if result.is_failed() {
            self.failed += 1;
        }

        let labels = result.labels();
        if labels.is_empty() {
            let inserted = self
                .grouped
                .no_labels
                .insert(result.image.clone(), result.width, result.height);
            if !inserted {
                tracing::debug!(image = %result.image, "Image already in no-label set");
            }
            return;
        }

        for label in labels {
            if label.has_instances() {
                let instances = label
                    .instances
                    .iter()
                    .map(|bbox| DetectionInstance::from_normalized(bbox, result.width, result.height))
                    .collect();
                self.grouped.bounding_box_groups.push(
                    &label.name,
                    BoundingBoxGroupEntry {
                        image: result.image.clone(),
                        width: result.width,
                        height: result.height,
                        instances,
                    },
                );
            } else {
                self.grouped.label_groups.push(
                    &label.name,
                    LabelGroupEntry {
                        image: result.image.clone(),
                        confidence: round2(label.confidence_or_unscored()),
                    },
                );
            }
        }
    }

    pub fn ingest_all<'a>(&mut self, results: impl IntoIterator<Item = &'a DetectionResult>) {
        for result in results {
            self.ingest(result);
        }
    }

    /// Images ingested so far
    pub fn ingested(&self) -> usize {
        self.ingested
    }

    /// Images whose detection failed
    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn finish(self) -> GroupedDetections {
        tracing::info!(
            images = self.ingested,
            failed = self.failed,
            label_groups = self.grouped.label_groups.len(),
            bounding_box_groups = self.grouped.bounding_box_groups.len(),
            no_labels = self.grouped.no_labels.len(),
            "Grouping complete"
        );
        self.grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DetectedLabel, ImageRef, NormalizedBox};

    fn image(name: &str) -> ImageRef {
        ImageRef::new(format!("s3://photos/{}", name))
    }

    fn bbox(left: f64, top: f64, width: f64, height: f64) -> NormalizedBox {
        NormalizedBox {
            left,
            top,
            width,
            height,
        }
    }

    #[test]
    fn test_classification_goes_to_label_groups() {
        let mut engine = GroupingEngine::new();
        engine.ingest(&DetectionResult::labeled(
            image("cat.jpg"),
            640,
            480,
            vec![DetectedLabel::classification("cat", 0.954)],
        ));
        let grouped = engine.finish();

        let cats = grouped.label_groups.get("cat").unwrap();
        assert_eq!(cats.len(), 1);
        assert_eq!(cats[0].image, image("cat.jpg"));
        assert_eq!(cats[0].confidence, 0.95);
        assert!(grouped.bounding_box_groups.is_empty());
        assert!(grouped.no_labels.is_empty());
    }

    #[test]
    fn test_instances_scaled_to_pixels() {
        let mut engine = GroupingEngine::new();
        engine.ingest(&DetectionResult::labeled(
            image("dog.jpg"),
            400,
            300,
            vec![DetectedLabel::localized(
                "dog",
                vec![bbox(0.1, 0.1, 0.25, 0.5), bbox(0.5, 0.2, 0.123456, 0.3)],
            )],
        ));
        let grouped = engine.finish();

        let dogs = grouped.bounding_box_groups.get("dog").unwrap();
        assert_eq!(dogs.len(), 1);
        assert_eq!(dogs[0].width, 400);
        assert_eq!(dogs[0].instances.len(), 2);
        assert_eq!(dogs[0].instances[0].left, 40.0);
        assert_eq!(dogs[0].instances[0].height, 150.0);
        assert_eq!(dogs[0].instances[1].width, 49.38);
        assert!(grouped.label_groups.get("dog").is_none());
    }

    #[test]
    fn test_image_with_both_kinds_of_labels() {
        let mut engine = GroupingEngine::new();
        engine.ingest(&DetectionResult::labeled(
            image("park.jpg"),
            100,
            100,
            vec![
                DetectedLabel::classification("outdoor", 0.8),
                DetectedLabel::localized("dog", vec![bbox(0.0, 0.0, 0.5, 0.5)]),
            ],
        ));
        let grouped = engine.finish();

        assert_eq!(grouped.label_groups.get("outdoor").unwrap().len(), 1);
        assert_eq!(grouped.bounding_box_groups.get("dog").unwrap().len(), 1);
        assert!(!grouped.no_labels.contains(&image("park.jpg")));
    }

    #[test]
    fn test_no_labels_first_write_wins() {
        let mut engine = GroupingEngine::new();
        engine.ingest(&DetectionResult::labeled(image("empty.jpg"), 10, 20, vec![]));
        engine.ingest(&DetectionResult::labeled(image("empty.jpg"), 30, 40, vec![]));
        let grouped = engine.finish();

        assert_eq!(grouped.no_labels.len(), 1);
        let dims = grouped.no_labels.get(&image("empty.jpg")).unwrap();
        assert_eq!((dims.width, dims.height), (10, 20));
    }

    #[test]
    fn test_failed_detection_routed_to_no_labels() {
        let mut engine = GroupingEngine::new();
        engine.ingest(&DetectionResult::failed(image("broken.jpg"), "timeout"));
        assert_eq!(engine.failed(), 1);
        let grouped = engine.finish();

        assert!(grouped.no_labels.contains(&image("broken.jpg")));
        assert!(grouped.label_groups.is_empty());
        assert!(grouped.bounding_box_groups.is_empty());
    }

    #[test]
    fn test_label_order_is_first_seen() {
        let mut engine = GroupingEngine::new();
        engine.ingest_all(&[
            DetectionResult::labeled(image("a.jpg"), 1, 1, vec![DetectedLabel::classification("zebra", 0.5)]),
            DetectionResult::labeled(image("b.jpg"), 1, 1, vec![DetectedLabel::classification("ant", 0.5)]),
            DetectionResult::labeled(image("c.jpg"), 1, 1, vec![DetectedLabel::classification("zebra", 0.7)]),
        ]);
        let grouped = engine.finish();

        let labels: Vec<&str> = grouped.label_groups.labels().collect();
        assert_eq!(labels, vec!["zebra", "ant"]);
        let zebras = grouped.label_groups.get("zebra").unwrap();
        assert_eq!(zebras[0].image, image("a.jpg"));
        assert_eq!(zebras[1].image, image("c.jpg"));
    }
}
