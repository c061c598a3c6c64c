use image::GrayImage;
use imageproc::filter::gaussian_blur_f32;

use super::config::{AcceptanceBand, OilySkinTuning};
use super::core::{ContourDetector, IssueDetector, RegionContext};
use crate::error::DetectorError;
use crate::pipeline::domain::{Finding, IssueType};
use crate::pipeline::services::image::color_space::weighted_blend;
use crate::pipeline::services::image::contours::{mean_in_rect, ContourShape};
use crate::pipeline::services::image::mask;

/// Bright specular areas, scored on a blend of Lab lightness and HSV value.
pub struct OilySkinDetector {
    tuning: OilySkinTuning,
}

impl OilySkinDetector {
    pub fn new(tuning: OilySkinTuning) -> Self {
        Self { tuning }
    }

    fn shine(&self, context: &RegionContext) -> GrayImage {
        weighted_blend(
            &context.lab().lightness,
            self.tuning.lightness_weight,
            &context.hsv().value,
            self.tuning.value_weight,
        )
    }
}

impl ContourDetector for OilySkinDetector {
    type Measure = GrayImage;

    fn band(&self) -> &AcceptanceBand {
        &self.tuning.band
    }

    fn build_mask(&self, context: &RegionContext) -> (GrayImage, Self::Measure) {
        let shine = self.shine(context);
        let smoothed = gaussian_blur_f32(&shine, self.tuning.blur_sigma);
        let kernel = self.tuning.kernel;
        let cleaned = mask::open(&mask::close(&mask::otsu_mask(&smoothed, false), kernel), kernel);
        (cleaned, shine)
    }

    // Brightness is measured on the unblurred blend.
    fn raw_confidence(
        &self,
        _context: &RegionContext,
        shine: &GrayImage,
        shape: &ContourShape,
    ) -> Option<f64> {
        let t = &self.tuning;
        let mean_shine = mean_in_rect(shine, &shape.bounds)?;
        let brightness_score =
            ((mean_shine - t.brightness_floor) / t.brightness_span).clamp(0.0, 1.0);
        let area_score = (shape.area / t.area_scale).min(1.0);
        Some(brightness_score * t.brightness_weight + area_score * t.area_weight + t.bias)
    }
}

impl IssueDetector for OilySkinDetector {
    fn issue_type(&self) -> IssueType {
        IssueType::OilySkin
    }

    fn detect(&self, context: &RegionContext) -> Result<Vec<Finding>, DetectorError> {
        self.detect_contours(context)
    }
}
