use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;

use super::config::WrinkleTuning;
use super::core::{accept, IssueDetector, RegionContext};
use crate::error::DetectorError;
use crate::pipeline::domain::{BoundingBox, Finding, IssueType};
use crate::pipeline::services::image::line_segments::{detect_segments, LineSegment};

/// Long straight creases traced on the edge map.
pub struct WrinkleDetector {
    tuning: WrinkleTuning,
}

impl WrinkleDetector {
    pub fn new(tuning: WrinkleTuning) -> Self {
        Self { tuning }
    }

    /// Segment extent padded by the margin on every side, clipped to the region.
    fn padded_box(&self, segment: &LineSegment, width: u32, height: u32) -> BoundingBox {
        let margin = self.tuning.margin as i64;
        let (x1, y1) = (segment.start.0 as i64, segment.start.1 as i64);
        let (x2, y2) = (segment.end.0 as i64, segment.end.1 as i64);

        let x = (x1.min(x2) - margin).max(0);
        let y = (y1.min(y2) - margin).max(0);
        let w = ((x1 - x2).abs() + 2 * margin).min(width as i64 - x).max(0);
        let h = ((y1 - y2).abs() + 2 * margin).min(height as i64 - y).max(0);

        BoundingBox::new(x as u32, y as u32, w as u32, h as u32)
    }
}

impl IssueDetector for WrinkleDetector {
    fn issue_type(&self) -> IssueType {
        IssueType::Wrinkles
    }

    fn detect(&self, context: &RegionContext) -> Result<Vec<Finding>, DetectorError> {
        if context.is_empty() {
            return Ok(Vec::new());
        }

        let t = &self.tuning;
        let (width, height) = context.dimensions();
        let smoothed = gaussian_blur_f32(context.gray(), t.blur_sigma);
        let edges = canny(&smoothed, t.canny_low, t.canny_high);

        let mut findings = Vec::new();
        for (index, segment) in detect_segments(&edges, &t.segments).iter().enumerate() {
            let length = segment.length();
            if length <= t.min_length {
                continue;
            }

            let bbox = self.padded_box(segment, width, height);
            if bbox.width == 0 || bbox.height == 0 {
                continue;
            }

            let raw = (length / t.length_scale).min(1.0) * t.length_weight + t.bias;
            if let Some(confidence) =
                accept(IssueType::Wrinkles, raw, t.max_confidence, t.accept_threshold)?
            {
                findings.push(context.finding(IssueType::Wrinkles, index, bbox, confidence));
            }
        }

        Ok(findings)
    }
}
