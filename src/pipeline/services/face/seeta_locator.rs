use std::fs::File;
use std::io::BufReader;

use image::RgbImage;
use tracing::debug;

use super::{FaceLocator, FaceLocatorConfig, FaceRegion};
use crate::error::AnalyzerError;

// Cascade score per requested neighbour; five neighbours map to a score of 2.0.
const SCORE_PER_NEIGHBOR: f64 = 0.4;

/// Frontal face locator backed by the `rustface` crate (SeetaFace funnel
/// cascade). The model is read once; each call builds a cheap detector around
/// a clone of it, so the locator is shared freely between threads.
pub struct SeetaFaceLocator {
    model: rustface::Model,
    settings: FaceLocatorConfig,
}

impl SeetaFaceLocator {
    pub fn load(settings: &FaceLocatorConfig) -> Result<Self, AnalyzerError> {
        let path = &settings.model_path;
        let model_load_error = |reason: String| AnalyzerError::ModelLoad {
            path: path.clone(),
            reason,
        };

        let file = File::open(path).map_err(|e| model_load_error(e.to_string()))?;
        let model = rustface::read_model(BufReader::new(file))
            .map_err(|e| model_load_error(e.to_string()))?;

        debug!(path = %path.display(), "Loaded face model");
        Ok(Self {
            model,
            settings: settings.clone(),
        })
    }
}

impl FaceLocator for SeetaFaceLocator {
    fn locate(&self, frame: &RgbImage) -> Vec<FaceRegion> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Vec::new();
        }

        let gray = image::imageops::grayscale(frame);
        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(self.settings.min_face_size);
        detector.set_score_thresh(self.settings.min_neighbors as f64 * SCORE_PER_NEIGHBOR);
        detector.set_pyramid_scale_factor(1.0 / self.settings.scale_factor);
        detector.set_slide_window_step(
            self.settings.slide_window_step,
            self.settings.slide_window_step,
        );

        let faces = detector.detect(&rustface::ImageData::new(gray.as_raw(), width, height));

        faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceRegion::clipped(
                    bbox.x() as i64,
                    bbox.y() as i64,
                    bbox.width() as i64,
                    bbox.height() as i64,
                    (width, height),
                )
            })
            .filter(|region| self.settings.admits(region))
            .collect()
    }
}
