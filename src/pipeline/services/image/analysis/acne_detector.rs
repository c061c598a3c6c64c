use image::GrayImage;

use super::config::{AcceptanceBand, AcneTuning};
use super::core::{ContourDetector, IssueDetector, RegionContext};
use crate::error::DetectorError;
use crate::pipeline::domain::{Finding, IssueType};
use crate::pipeline::services::image::contours::ContourShape;
use crate::pipeline::services::image::mask;

/// Small, round, strongly red blobs.
pub struct AcneDetector {
    tuning: AcneTuning,
}

impl AcneDetector {
    pub fn new(tuning: AcneTuning) -> Self {
        Self { tuning }
    }
}

impl ContourDetector for AcneDetector {
    type Measure = ();

    fn band(&self) -> &AcceptanceBand {
        &self.tuning.band
    }

    fn build_mask(&self, context: &RegionContext) -> (GrayImage, Self::Measure) {
        let red = mask::hsv_in_ranges(context.hsv(), &self.tuning.hsv_ranges);
        let kernel = self.tuning.kernel;
        (mask::close(&mask::open(&red, kernel), kernel), ())
    }

    fn raw_confidence(
        &self,
        _context: &RegionContext,
        _measure: &(),
        shape: &ContourShape,
    ) -> Option<f64> {
        let t = &self.tuning;
        let circularity_score = shape
            .circularity()
            .map(|c| (c * t.circularity_boost).min(1.0))
            .unwrap_or(t.fallback_circularity);
        let size_score = (shape.area / t.size_scale).min(1.0);
        Some(size_score * t.size_weight + circularity_score * t.circularity_weight + t.bias)
    }
}

impl IssueDetector for AcneDetector {
    fn issue_type(&self) -> IssueType {
        IssueType::Acne
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

    fn skin() -> Rgb<u8> {
        Rgb([205, 185, 160])
    }

    #[test]
    fn finds_a_red_papule() {
        let mut region = RgbImage::from_pixel(80, 80, skin());
        draw_filled_circle_mut(&mut region, (40, 40), 8, Rgb([210, 35, 0]));
        let context = RegionContext::new(&region, (10, 20));

        let findings = AcneDetector::new(AcneTuning::default())
            .detect(&context)
            .unwrap();

        assert_eq!(findings.len(), 1);
        let finding = &findings[0];
        assert_eq!(finding.issue_type, IssueType::Acne);
        assert!(finding.confidence > 0.3 && finding.confidence <= 0.95);
        assert!(finding.id.starts_with("acne_0_"));
        // Disc spans x 32..=48 locally, offset by 10.
        assert!(finding.bbox.x.abs_diff(42) <= 1, "bbox {:?}", finding.bbox);
        assert!(finding.bbox.y.abs_diff(52) <= 1, "bbox {:?}", finding.bbox);
    }

    #[test]
    fn ignores_large_red_areas() {
        let mut region = RgbImage::from_pixel(80, 80, skin());
        draw_filled_circle_mut(&mut region, (40, 40), 25, Rgb([210, 35, 0]));
        let context = RegionContext::new(&region, (0, 0));
        let findings = AcneDetector::new(AcneTuning::default())
            .detect(&context)
            .unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn plain_skin_has_no_acne() {
        let region = RgbImage::from_pixel(60, 60, skin());
        let context = RegionContext::new(&region, (0, 0));
        let detector = AcneDetector::new(AcneTuning::default());
        assert!(detector.detect(&context).unwrap().is_empty());
    }

    #[test]
    fn empty_region_short_circuits() {
        let region = RgbImage::new(0, 0);
        let context = RegionContext::new(&region, (0, 0));
        let detector = AcneDetector::new(AcneTuning::default());
        assert!(detector.detect(&context).unwrap().is_empty());
    }
}
