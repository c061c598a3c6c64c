use image::{GrayImage, Luma};

use super::config::{AcceptanceBand, RednessTuning};
use super::core::{ContourDetector, IssueDetector, RegionContext};
use crate::error::DetectorError;
use crate::pipeline::domain::{Finding, IssueType};
use crate::pipeline::services::image::color_space::saturate_u8;
use crate::pipeline::services::image::contours::{mean_in_rect, ContourShape};
use crate::pipeline::services::image::mask;

/// Diffuse red patches: red hue, high Lab `a` and red dominating green+blue.
pub struct RednessDetector {
    tuning: RednessTuning,
}

impl RednessDetector {
    pub fn new(tuning: RednessTuning) -> Self {
        Self { tuning }
    }
}

/// `255 * r / (g + b + 1)` per pixel, saturated to 8 bits.
fn red_dominance(context: &RegionContext) -> GrayImage {
    let region = context.region();
    let (width, height) = region.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let [r, g, b] = region.get_pixel(x, y).0;
        let ratio = r as f32 / (g as f32 + b as f32 + 1.0);
        Luma([saturate_u8(ratio * 255.0)])
    })
}

impl ContourDetector for RednessDetector {
    type Measure = ();

    fn band(&self) -> &AcceptanceBand {
        &self.tuning.band
    }

    fn build_mask(&self, context: &RegionContext) -> (GrayImage, Self::Measure) {
        let hue_mask = mask::hsv_in_ranges(context.hsv(), &self.tuning.hsv_ranges);
        let a_mask = mask::otsu_mask(&context.lab().a, false);
        let dominance_mask =
            mask::fixed_mask(&red_dominance(context), self.tuning.dominance_threshold);

        let combined = mask::and(&mask::and(&hue_mask, &a_mask), &dominance_mask);
        let kernel = self.tuning.kernel;
        (mask::open(&mask::close(&combined, kernel), kernel), ())
    }

    fn raw_confidence(
        &self,
        context: &RegionContext,
        _measure: &(),
        shape: &ContourShape,
    ) -> Option<f64> {
        let t = &self.tuning;
        let mean_a = mean_in_rect(&context.lab().a, &shape.bounds)?;
        let intensity_score = ((mean_a - t.a_neutral) / t.a_span).clamp(0.0, 1.0);
        let area_score = (shape.area / t.area_scale).min(1.0);
        Some(intensity_score * t.intensity_weight + area_score * t.area_weight + t.bias)
    }
}

impl IssueDetector for RednessDetector {
    fn issue_type(&self) -> IssueType {
        IssueType::Redness
    }

    fn detect(&self, context: &RegionContext) -> Result<Vec<Finding>, DetectorError> {
        self.detect_contours(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use imageproc::drawing::draw_filled_circle_mut;

    #[test]
    fn finds_an_inflamed_patch() {
        let mut region = RgbImage::from_pixel(80, 80, Rgb([205, 185, 160]));
        draw_filled_circle_mut(&mut region, (40, 40), 12, Rgb([220, 60, 60]));
        let context = RegionContext::new(&region, (0, 0));

        let findings = RednessDetector::new(RednessTuning::default())
            .detect(&context)
            .unwrap();

        assert_eq!(findings.len(), 1);
        let finding = &findings[0];
        assert_eq!(finding.issue_type, IssueType::Redness);
        assert!(finding.id.starts_with("redness_"));
        assert!(finding.confidence > 0.4 && finding.confidence <= 0.88);
        assert!(finding.bbox.x.abs_diff(28) <= 2 && finding.bbox.width.abs_diff(25) <= 4);
    }

    #[test]
    fn dominance_saturates_instead_of_wrapping() {
        let region = RgbImage::from_pixel(2, 1, Rgb([250, 0, 0]));
        let context = RegionContext::new(&region, (0, 0));
        assert_eq!(red_dominance(&context).get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn neutral_skin_is_not_red() {
        let region = RgbImage::from_pixel(50, 50, Rgb([205, 185, 160]));
        let context = RegionContext::new(&region, (0, 0));
        let detector = RednessDetector::new(RednessTuning::default());
        assert!(detector.detect(&context).unwrap().is_empty());
    }

    #[test]
    fn empty_region_short_circuits() {
        let region = RgbImage::new(0, 0);
        let context = RegionContext::new(&region, (0, 0));
        let detector = RednessDetector::new(RednessTuning::default());
        assert!(detector.detect(&context).unwrap().is_empty());
    }
}
