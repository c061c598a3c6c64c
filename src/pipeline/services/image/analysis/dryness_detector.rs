use image::{GrayImage, Luma};
use imageproc::filter::laplacian_filter;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

use super::config::{AcceptanceBand, DrynessTuning};
use super::core::{ContourDetector, IssueDetector, RegionContext};
use crate::error::DetectorError;
use crate::pipeline::domain::{Finding, IssueType};
use crate::pipeline::services::image::color_space::{saturate_u8, weighted_blend};
use crate::pipeline::services::image::contours::{mean_in_rect, ContourShape};
use crate::pipeline::services::image::mask;

/// Flaky, high-texture areas found from second-derivative and gradient
/// energy of the grayscale region.
pub struct DrynessDetector {
    tuning: DrynessTuning,
}

impl DrynessDetector {
    pub fn new(tuning: DrynessTuning) -> Self {
        Self { tuning }
    }

    fn texture(&self, gray: &GrayImage) -> GrayImage {
        let (width, height) = gray.dimensions();

        let laplacian = laplacian_filter(gray);
        let curvature = GrayImage::from_fn(width, height, |x, y| {
            Luma([saturate_u8(laplacian.get_pixel(x, y)[0].unsigned_abs() as f32)])
        });

        let gx = horizontal_sobel(gray);
        let gy = vertical_sobel(gray);
        let gradient = GrayImage::from_fn(width, height, |x, y| {
            let dx = gx.get_pixel(x, y)[0] as f32;
            let dy = gy.get_pixel(x, y)[0] as f32;
            Luma([saturate_u8((dx * dx + dy * dy).sqrt())])
        });

        weighted_blend(
            &curvature,
            self.tuning.laplacian_weight,
            &gradient,
            self.tuning.gradient_weight,
        )
    }
}

impl ContourDetector for DrynessDetector {
    type Measure = GrayImage;

    fn band(&self) -> &AcceptanceBand {
        &self.tuning.band
    }

    fn build_mask(&self, context: &RegionContext) -> (GrayImage, Self::Measure) {
        let texture = self.texture(context.gray());
        let rough = mask::close(&mask::otsu_mask(&texture, false), self.tuning.kernel);
        (rough, texture)
    }

    fn raw_confidence(
        &self,
        _context: &RegionContext,
        texture: &GrayImage,
        shape: &ContourShape,
    ) -> Option<f64> {
        let t = &self.tuning;
        let roughness_score = (mean_in_rect(texture, &shape.bounds)? / 255.0).min(1.0);
        let area_score = (shape.area / t.area_scale).min(1.0);
        Some(roughness_score * t.roughness_weight + area_score * t.area_weight + t.bias)
    }
}

impl IssueDetector for DrynessDetector {
    fn issue_type(&self) -> IssueType {
        IssueType::Dryness
    }

    fn detect(&self, context: &RegionContext) -> Result<Vec<Finding>, DetectorError> {
        self.detect_contours(context)
    }
}
