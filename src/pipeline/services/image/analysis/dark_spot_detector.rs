use image::GrayImage;

use super::config::{AcceptanceBand, DarkSpotTuning};
use super::core::{ContourDetector, IssueDetector, RegionContext};
use crate::error::DetectorError;
use crate::pipeline::domain::{Finding, IssueType};
use crate::pipeline::services::image::contours::{mean_in_rect, ContourShape};
use crate::pipeline::services::image::mask;

/// Compact patches darker than both the region as a whole and their
/// immediate surroundings.
pub struct DarkSpotDetector {
    tuning: DarkSpotTuning,
}

impl DarkSpotDetector {
    pub fn new(tuning: DarkSpotTuning) -> Self {
        Self { tuning }
    }
}

impl ContourDetector for DarkSpotDetector {
    type Measure = ();

    fn band(&self) -> &AcceptanceBand {
        &self.tuning.band
    }

    fn build_mask(&self, context: &RegionContext) -> (GrayImage, Self::Measure) {
        let lightness = &context.lab().lightness;
        let globally_dark = mask::otsu_mask(lightness, true);
        let locally_dark = mask::adaptive_dark_mask(
            lightness,
            self.tuning.adaptive_block_size,
            self.tuning.adaptive_delta,
        );
        let kernel = self.tuning.kernel;
        let combined = mask::and(&globally_dark, &locally_dark);
        (mask::close(&mask::open(&combined, kernel), kernel), ())
    }

    fn raw_confidence(
        &self,
        context: &RegionContext,
        _measure: &(),
        shape: &ContourShape,
    ) -> Option<f64> {
        let t = &self.tuning;
        let mean_lightness = mean_in_rect(&context.lab().lightness, &shape.bounds)?;
        let darkness_score = ((255.0 - mean_lightness) / t.darkness_scale).min(1.0);
        let shape_score = shape
            .circularity()
            .map(|c| (c * t.circularity_boost).min(1.0))
            .unwrap_or(t.fallback_shape);
        Some(darkness_score * t.darkness_weight + shape_score * t.shape_weight + t.bias)
    }
}

impl IssueDetector for DarkSpotDetector {
    fn issue_type(&self) -> IssueType {
        IssueType::DarkSpots
    }

    fn detect(&self, context: &RegionContext) -> Result<Vec<Finding>, DetectorError> {
        self.detect_contours(context)
    }
}
