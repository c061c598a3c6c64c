//! Debug overlay of findings on top of the analysed frame.
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::pipeline::domain::{Finding, IssueType};

pub fn issue_color(issue_type: IssueType) -> Rgb<u8> {
    match issue_type {
        IssueType::Acne => Rgb([0xff, 0x47, 0x57]),
        IssueType::DarkSpots => Rgb([0xff, 0xa5, 0x02]),
        IssueType::Wrinkles => Rgb([0x37, 0x42, 0xfa]),
        IssueType::Redness => Rgb([0xff, 0x6b, 0x81]),
        IssueType::Dryness => Rgb([0x70, 0xa1, 0xff]),
        IssueType::OilySkin => Rgb([0x5f, 0x27, 0xcd]),
    }
}

/// Copy of `frame` with every finding outlined in its issue colour.
pub fn annotate(frame: &RgbImage, findings: &[Finding]) -> RgbImage {
    let mut canvas = frame.clone();
    let (width, height) = canvas.dimensions();

    for finding in findings {
        let bbox = finding.bbox;
        if bbox.x >= width || bbox.y >= height {
            continue;
        }
        let w = bbox.width.min(width - bbox.x);
        let h = bbox.height.min(height - bbox.y);
        if w == 0 || h == 0 {
            continue;
        }
        let rect = Rect::at(bbox.x as i32, bbox.y as i32).of_size(w, h);
        draw_hollow_rect_mut(&mut canvas, rect, issue_color(finding.issue_type));
    }

    canvas
}
