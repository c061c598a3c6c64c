//! External contour extraction and per-contour measurements.
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::geometry::arc_length;
use imageproc::point::Point;

use crate::pipeline::domain::BoundingBox;

/// Outer boundary of one connected foreground component, with the
/// measurements the detectors score on.
#[derive(Debug, Clone)]
pub struct ContourShape {
    /// Position in discovery order among the external contours of the mask.
    pub index: usize,
    pub area: f64,
    pub perimeter: f64,
    /// Inclusive pixel extent of the boundary, in region coordinates.
    pub bounds: BoundingBox,
}

impl ContourShape {
    fn from_points(index: usize, points: &[Point<i32>]) -> Option<Self> {
        let bounds = bounding_rect(points)?;
        Some(Self {
            index,
            area: polygon_area(points),
            perimeter: arc_length(points, true),
            bounds,
        })
    }

    /// `4π·area / perimeter²`; `None` for a zero-length boundary.
    pub fn circularity(&self) -> Option<f64> {
        if self.perimeter > 0.0 {
            Some(4.0 * std::f64::consts::PI * self.area / (self.perimeter * self.perimeter))
        } else {
            None
        }
    }

    pub fn area_within(&self, min: f64, max: f64) -> bool {
        self.area > min && self.area < max
    }
}

/// Outer borders that are not nested inside another component.
pub fn external_contours(mask: &GrayImage) -> Vec<ContourShape> {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    // Border following needs a background frame; components touching the
    // image edge otherwise come back as parentless holes.
    let padded = pad_with_background(mask);
    let contours: Vec<Contour<i32>> = find_contours(&padded);
    contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .enumerate()
        .filter_map(|(index, c)| {
            let points: Vec<Point<i32>> =
                c.points.iter().map(|p| Point::new(p.x - 1, p.y - 1)).collect();
            ContourShape::from_points(index, &points)
        })
        .collect()
}

fn pad_with_background(mask: &GrayImage) -> GrayImage {
    let (width, height) = mask.dimensions();
    let mut padded = GrayImage::new(width + 2, height + 2);
    image::imageops::replace(&mut padded, mask, 1, 1);
    padded
}

/// Shoelace area of the closed polygon through `points`.
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(p, q)| p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64)
        .sum();
    twice.abs() as f64 / 2.0
}

fn bounding_rect(points: &[Point<i32>]) -> Option<BoundingBox> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    if min_x < 0 || min_y < 0 {
        return None;
    }
    Some(BoundingBox::new(
        min_x as u32,
        min_y as u32,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    ))
}

/// Mean of `plane` over `rect`, `None` when the rectangle is empty.
pub fn mean_in_rect(plane: &GrayImage, rect: &BoundingBox) -> Option<f64> {
    let (width, height) = plane.dimensions();
    let x1 = rect.right().min(width);
    let y1 = rect.bottom().min(height);
    if rect.x >= x1 || rect.y >= y1 {
        return None;
    }
    let mut sum = 0u64;
    for y in rect.y..y1 {
        for x in rect.x..x1 {
            sum += plane.get_pixel(x, y)[0] as u64;
        }
    }
    let count = ((x1 - rect.x) * (y1 - rect.y)) as f64;
    Some(sum as f64 / count)
}
