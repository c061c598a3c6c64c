use std::sync::OnceLock;

use image::{GrayImage, RgbImage};

use super::config::AcceptanceBand;
use crate::error::DetectorError;
use crate::pipeline::domain::{BoundingBox, Finding, IssueType};
use crate::pipeline::services::image::color_space::{self, HsvPlanes, LabPlanes};
use crate::pipeline::services::image::contours::{external_contours, ContourShape};

/// Cropped face region handed to every detector, with colour planes derived
/// lazily and shared between detectors.
pub struct RegionContext<'a> {
    region: &'a RgbImage,
    offset: (u32, u32),
    hsv: OnceLock<HsvPlanes>,
    lab: OnceLock<LabPlanes>,
    gray: OnceLock<GrayImage>,
}

impl<'a> RegionContext<'a> {
    /// `offset` is the region's top-left corner in frame coordinates.
    pub fn new(region: &'a RgbImage, offset: (u32, u32)) -> Self {
        Self {
            region,
            offset,
            hsv: OnceLock::new(),
            lab: OnceLock::new(),
            gray: OnceLock::new(),
        }
    }

    pub fn region(&self) -> &RgbImage {
        self.region
    }

    pub fn offset(&self) -> (u32, u32) {
        self.offset
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.region.dimensions()
    }

    pub fn is_empty(&self) -> bool {
        let (width, height) = self.dimensions();
        width == 0 || height == 0
    }

    pub fn hsv(&self) -> &HsvPlanes {
        self.hsv.get_or_init(|| color_space::to_hsv(self.region))
    }

    pub fn lab(&self) -> &LabPlanes {
        self.lab.get_or_init(|| color_space::to_lab(self.region))
    }

    pub fn gray(&self) -> &GrayImage {
        self.gray.get_or_init(|| color_space::to_gray(self.region))
    }

    /// Builds a finding from a region-local box. The id carries the local
    /// position; the stored box is translated into frame coordinates.
    pub fn finding(
        &self,
        issue_type: IssueType,
        index: usize,
        local: BoundingBox,
        confidence: f32,
    ) -> Finding {
        let id = format!("{}_{}_{}_{}", issue_type.id_prefix(), index, local.x, local.y);
        let (dx, dy) = self.offset;
        Finding::new(id, issue_type, confidence, local.translate(dx, dy))
    }
}

/// Strategy for one kind of skin issue
pub trait IssueDetector: Send + Sync {
    fn issue_type(&self) -> IssueType;

    /// Findings in frame coordinates. An empty region yields no findings.
    fn detect(&self, context: &RegionContext) -> Result<Vec<Finding>, DetectorError>;

    fn name(&self) -> &'static str {
        self.issue_type().as_str()
    }
}

/// Mask-then-contours detectors share their tail: external contours inside
/// the area band are scored, capped and kept above the accept threshold.
pub trait ContourDetector: IssueDetector {
    /// Per-region plane the scorer reads besides the shared colour planes.
    type Measure;

    fn band(&self) -> &AcceptanceBand;

    /// Cleaned binary mask over the region, plus the scoring plane.
    fn build_mask(&self, context: &RegionContext) -> (GrayImage, Self::Measure);

    /// Uncapped confidence for one contour, `None` to skip it.
    fn raw_confidence(
        &self,
        context: &RegionContext,
        measure: &Self::Measure,
        shape: &ContourShape,
    ) -> Option<f64>;

    fn detect_contours(&self, context: &RegionContext) -> Result<Vec<Finding>, DetectorError> {
        if context.is_empty() {
            return Ok(Vec::new());
        }

        let issue_type = self.issue_type();
        let band = *self.band();
        let (mask, measure) = self.build_mask(context);
        let mut findings = Vec::new();

        for shape in external_contours(&mask) {
            if !shape.area_within(band.min_area, band.max_area) {
                continue;
            }
            let Some(raw) = self.raw_confidence(context, &measure, &shape) else {
                continue;
            };
            let accepted = accept(issue_type, raw, band.max_confidence, band.accept_threshold)?;
            if let Some(confidence) = accepted {
                findings.push(context.finding(issue_type, shape.index, shape.bounds, confidence));
            }
        }

        Ok(findings)
    }
}

/// Caps `raw` at `max_confidence` and keeps it only when strictly above
/// `accept_threshold`. Non-finite scores are reported as numeric faults.
pub fn accept(
    issue_type: IssueType,
    raw: f64,
    max_confidence: f32,
    accept_threshold: f32,
) -> Result<Option<f32>, DetectorError> {
    if !raw.is_finite() {
        return Err(DetectorError::Numeric {
            detector: issue_type,
            what: "confidence",
        });
    }
    let confidence = (raw as f32).min(max_confidence);
    Ok((confidence > accept_threshold).then_some(confidence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn findings_are_translated_but_keep_local_ids() {
        let region = RgbImage::from_pixel(10, 10, Rgb([1, 2, 3]));
        let context = RegionContext::new(&region, (40, 25));
        let finding = context.finding(IssueType::DarkSpots, 3, BoundingBox::new(2, 4, 5, 5), 0.5);
        assert_eq!(finding.id, "dark_spot_3_2_4");
        assert_eq!(finding.bbox, BoundingBox::new(42, 29, 5, 5));
    }

    #[test]
    fn planes_are_computed_once() {
        let region = RgbImage::from_pixel(4, 4, Rgb([200, 100, 50]));
        let context = RegionContext::new(&region, (0, 0));
        let first: *const GrayImage = context.gray();
        let second: *const GrayImage = context.gray();
        assert_eq!(first, second);
        assert_eq!(context.hsv().hue.dimensions(), (4, 4));
    }

    #[test]
    fn accept_caps_and_thresholds() {
        assert_eq!(accept(IssueType::Acne, 1.4, 0.95, 0.3), Ok(Some(0.95)));
        assert_eq!(accept(IssueType::Acne, 0.3, 0.95, 0.3), Ok(None));
        assert!(accept(IssueType::Acne, f64::NAN, 0.95, 0.3).is_err());
    }

    #[test]
    fn empty_region_is_detected() {
        let region = RgbImage::new(0, 7);
        assert!(RegionContext::new(&region, (3, 3)).is_empty());
    }
}
