//! Binary mask construction and cleanup.
//!
//! Masks are `GrayImage`s holding 0 (background) or 255 (foreground).
use image::{GrayImage, Luma};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask};
use serde::Deserialize;

use super::color_space::HsvPlanes;

pub const FOREGROUND: u8 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelShape {
    Ellipse,
    Rect,
}

/// Structuring element for opening/closing. `size` is the odd side length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StructuringElement {
    pub shape: KernelShape,
    pub size: u8,
}

impl StructuringElement {
    pub fn ellipse(size: u8) -> Self {
        Self {
            shape: KernelShape::Ellipse,
            size,
        }
    }

    pub fn rect(size: u8) -> Self {
        Self {
            shape: KernelShape::Rect,
            size,
        }
    }

    pub fn radius(&self) -> u8 {
        self.size / 2
    }

    pub fn is_valid(&self) -> bool {
        self.size % 2 == 1
    }

    /// Footprint of the element as a `size`×`size` image. Ellipse rows span
    /// `c ± round(c·sqrt(1 - dy²/r²))` around the centre column.
    fn footprint(&self) -> GrayImage {
        let size = u32::from(self.size);
        let r = f64::from(self.radius());
        match self.shape {
            KernelShape::Rect => GrayImage::from_pixel(size, size, Luma([FOREGROUND])),
            KernelShape::Ellipse => GrayImage::from_fn(size, size, |x, y| {
                let dy = f64::from(y) - r;
                let half_width = if r > 0.0 {
                    (r * (1.0 - dy * dy / (r * r)).max(0.0).sqrt()).round_ties_even()
                } else {
                    0.0
                };
                flag((f64::from(x) - r).abs() <= half_width)
            }),
        }
    }

    fn mask(&self) -> Mask {
        let r = self.radius();
        Mask::from_image(&self.footprint(), r, r)
    }
}

/// Inclusive per-channel HSV bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    fn contains(&self, h: u8, s: u8, v: u8) -> bool {
        (self.lower[0]..=self.upper[0]).contains(&h)
            && (self.lower[1]..=self.upper[1]).contains(&s)
            && (self.lower[2]..=self.upper[2]).contains(&v)
    }
}

/// Foreground where the pixel falls inside any of `ranges`.
pub fn hsv_in_ranges(hsv: &HsvPlanes, ranges: &[HsvRange]) -> GrayImage {
    let (width, height) = hsv.hue.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let h = hsv.hue.get_pixel(x, y)[0];
        let s = hsv.saturation.get_pixel(x, y)[0];
        let v = hsv.value.get_pixel(x, y)[0];
        flag(ranges.iter().any(|range| range.contains(h, s, v)))
    })
}

/// Otsu binarisation. Pixels strictly above the level become foreground,
/// or background when `inverted`.
pub fn otsu_mask(plane: &GrayImage, inverted: bool) -> GrayImage {
    let level = otsu_level(plane);
    let kind = if inverted {
        ThresholdType::BinaryInverted
    } else {
        ThresholdType::Binary
    };
    threshold(plane, level, kind)
}

/// Foreground where `plane > level`.
pub fn fixed_mask(plane: &GrayImage, level: u8) -> GrayImage {
    threshold(plane, level, ThresholdType::Binary)
}

/// Inverted local threshold against a Gaussian-weighted neighbourhood mean:
/// foreground where `pixel <= local_mean - delta`.
pub fn adaptive_dark_mask(plane: &GrayImage, block_size: u32, delta: i16) -> GrayImage {
    let (width, height) = plane.dimensions();
    if width == 0 || height == 0 {
        return GrayImage::new(width, height);
    }
    let local_mean = gaussian_blur_f32(plane, block_sigma(block_size));
    GrayImage::from_fn(width, height, |x, y| {
        let diff = plane.get_pixel(x, y)[0] as i16 - local_mean.get_pixel(x, y)[0] as i16;
        flag(diff <= -delta)
    })
}

// Gaussian sigma implied by a square block of the given side.
fn block_sigma(block_size: u32) -> f32 {
    0.3 * ((block_size.max(1) as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

pub fn and(a: &GrayImage, b: &GrayImage) -> GrayImage {
    combine(a, b, |p, q| p && q)
}

pub fn or(a: &GrayImage, b: &GrayImage) -> GrayImage {
    combine(a, b, |p, q| p || q)
}

fn combine(a: &GrayImage, b: &GrayImage, op: impl Fn(bool, bool) -> bool) -> GrayImage {
    let (width, height) = a.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        flag(op(a.get_pixel(x, y)[0] > 0, b.get_pixel(x, y)[0] > 0))
    })
}

/// Erosion followed by dilation: removes specks smaller than the element.
pub fn open(mask: &GrayImage, element: StructuringElement) -> GrayImage {
    dilate_with(&erode_with(mask, element), element)
}

/// Dilation followed by erosion: fills gaps smaller than the element.
pub fn close(mask: &GrayImage, element: StructuringElement) -> GrayImage {
    erode_with(&dilate_with(mask, element), element)
}

// Pixels outside the image are ignored by both operations.
fn erode_with(mask: &GrayImage, element: StructuringElement) -> GrayImage {
    grayscale_erode(mask, &element.mask())
}

fn dilate_with(mask: &GrayImage, element: StructuringElement) -> GrayImage {
    grayscale_dilate(mask, &element.mask())
}

fn flag(on: bool) -> Luma<u8> {
    Luma([if on { FOREGROUND } else { 0 }])
}
