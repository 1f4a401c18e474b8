//! Bounded-concurrency detection
//!
//! Images are sent to the detector in chunks of `concurrency` and each chunk
//! is joined before its results are grouped, so at most `concurrency`
//! detector calls are outstanding. A failed call becomes a failure marker
//! for that image; it never aborts the chunk.

use super::grouping::{GroupedDetections, GroupingEngine};
use crate::models::{DetectionResult, ImageRef};
use crate::services::LabelDetector;
use clf_common::ObjectUri;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Runs the detector over a list of images
pub struct ImageAnalyzer {
    detector: Arc<dyn LabelDetector>,
    concurrency: usize,
}

impl ImageAnalyzer {
    /// `concurrency` of 0 is treated as 1
    pub fn new(detector: Arc<dyn LabelDetector>, concurrency: usize) -> Self {
        Self {
            detector,
            concurrency: concurrency.max(1),
        }
    }

    /// Detect one image, downgrading failure to a failure marker
    pub async fn analyze_image(&self, image: &ObjectUri) -> DetectionResult {
        let image_ref = ImageRef::from(image);
        debug!(image = %image, "Analyzing image");

        match self.detector.detect(image).await {
            Ok(output) => DetectionResult::labeled(image_ref, output.width, output.height, output.labels),
            Err(e) => {
                warn!(image = %image, error = %e, "Failed to process labels (image treated as unlabeled)");
                DetectionResult::failed(image_ref, e.to_string())
            }
        }
    }

    /// Analyze every image, feeding results into `engine` chunk by chunk
    pub async fn analyze_into(&self, images: &[ObjectUri], engine: &mut GroupingEngine) {
        let total = images.len();
        let mut analyzed = 0;

        for chunk in images.chunks(self.concurrency) {
            let results = join_all(chunk.iter().map(|image| self.analyze_image(image))).await;
            engine.ingest_all(&results);

            analyzed += chunk.len();
            info!("Analyzed images: {}/{}", analyzed, total);
        }
    }

    /// Analyze and group a whole image list
    pub async fn analyze(&self, images: &[ObjectUri]) -> GroupedDetections {
        let mut engine = GroupingEngine::new();
        self.analyze_into(images, &mut engine).await;
        engine.finish()
    }
}
