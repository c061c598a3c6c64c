//! Colour-space conversions for 8-bit RGB regions.
//!
//! Channel ranges follow the usual 8-bit conventions: hue is stored as
//! degrees / 2 (0..180), saturation and value span 0..=255, and Lab is stored
//! as `L * 255 / 100`, `a + 128`, `b + 128` computed on gamma-decoded sRGB
//! under a D65 white point.
use image::{GrayImage, RgbImage};
use palette::white_point::D65;
use palette::{FromColor, Hsv, Lab, Srgb};

/// Hue / saturation / value planes of a region.
#[derive(Debug, Clone)]
pub struct HsvPlanes {
    pub hue: GrayImage,
    pub saturation: GrayImage,
    pub value: GrayImage,
}

/// CIE Lab planes of a region (L = lightness, a = green-red, b = blue-yellow).
#[derive(Debug, Clone)]
pub struct LabPlanes {
    pub lightness: GrayImage,
    pub a: GrayImage,
    pub b: GrayImage,
}

pub fn to_hsv(rgb: &RgbImage) -> HsvPlanes {
    let (width, height) = rgb.dimensions();
    let mut hue = GrayImage::new(width, height);
    let mut saturation = GrayImage::new(width, height);
    let mut value = GrayImage::new(width, height);

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let (h, s, v) = pixel_to_hsv(r, g, b);
        hue.put_pixel(x, y, image::Luma([h]));
        saturation.put_pixel(x, y, image::Luma([s]));
        value.put_pixel(x, y, image::Luma([v]));
    }

    HsvPlanes {
        hue,
        saturation,
        value,
    }
}

pub fn to_lab(rgb: &RgbImage) -> LabPlanes {
    let (width, height) = rgb.dimensions();
    let mut lightness = GrayImage::new(width, height);
    let mut a = GrayImage::new(width, height);
    let mut b = GrayImage::new(width, height);

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let [r, g, bl] = pixel.0;
        let (l, a_val, b_val) = pixel_to_lab(r, g, bl);
        lightness.put_pixel(x, y, image::Luma([l]));
        a.put_pixel(x, y, image::Luma([a_val]));
        b.put_pixel(x, y, image::Luma([b_val]));
    }

    LabPlanes { lightness, a, b }
}

pub fn to_gray(rgb: &RgbImage) -> GrayImage {
    image::imageops::grayscale(rgb)
}

/// `first * first_weight + second * second_weight`, rounded and saturated.
pub fn weighted_blend(
    first: &GrayImage,
    first_weight: f32,
    second: &GrayImage,
    second_weight: f32,
) -> GrayImage {
    let (width, height) = first.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let v = first.get_pixel(x, y)[0] as f32 * first_weight
            + second.get_pixel(x, y)[0] as f32 * second_weight;
        image::Luma([saturate_u8(v)])
    })
}

/// Rounds to the nearest integer and clamps into the 8-bit range.
pub fn saturate_u8(value: f32) -> u8 {
    if value.is_nan() {
        0
    } else {
        value.round().clamp(0.0, 255.0) as u8
    }
}

pub fn pixel_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let hsv: Hsv = Hsv::from_color(Srgb::new(r, g, b).into_format::<f32>());

    let mut half = (hsv.hue.into_positive_degrees() / 2.0).round();
    if half >= 180.0 {
        half -= 180.0;
    }

    (
        half as u8,
        saturate_u8(hsv.saturation * 255.0),
        saturate_u8(hsv.value * 255.0),
    )
}

/// D65 Lab of an sRGB pixel, scaled to 8 bits.
pub fn pixel_to_lab(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let linear = Srgb::new(r, g, b).into_format::<f32>().into_linear();
    let lab: Lab<D65, f32> = Lab::from_color(linear);

    (
        saturate_u8(lab.l * 255.0 / 100.0),
        saturate_u8(lab.a + 128.0),
        saturate_u8(lab.b + 128.0),
    )
}
