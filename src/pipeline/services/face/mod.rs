//! Face localisation. Detectors only ever see pixels inside a located face.
#[cfg(feature = "rustface")]
pub mod seeta_locator;

use std::path::PathBuf;

use image::RgbImage;
use serde::Deserialize;

#[cfg(feature = "rustface")]
pub use self::seeta_locator::SeetaFaceLocator;

/// Finds face regions in a frame.
///
/// Implementations must return regions already clipped to the frame; any
/// number of threads may call `locate` at once.
pub trait FaceLocator: Send + Sync {
    fn locate(&self, frame: &RgbImage) -> Vec<FaceRegion>;
}

/// Axis-aligned face rectangle in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Intersection of a raw detector rectangle with the frame. Rectangles
    /// lying entirely outside collapse to zero size.
    pub fn clipped(x: i64, y: i64, width: i64, height: i64, frame: (u32, u32)) -> Self {
        let (frame_w, frame_h) = (frame.0 as i64, frame.1 as i64);
        let x0 = x.clamp(0, frame_w);
        let y0 = y.clamp(0, frame_h);
        let x1 = x.saturating_add(width.max(0)).clamp(x0, frame_w);
        let y1 = y.saturating_add(height.max(0)).clamp(y0, frame_h);
        Self::new(x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32)
    }

    /// Same region re-clipped to a frame of the given size.
    pub fn clip_to(&self, frame: (u32, u32)) -> Self {
        Self::clipped(
            self.x as i64,
            self.y as i64,
            self.width as i64,
            self.height as i64,
            frame,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Settings of the sliding-window face cascade.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FaceLocatorConfig {
    pub model_path: PathBuf,
    /// Smallest and largest face side considered, in pixels.
    pub min_face_size: u32,
    pub max_face_size: u32,
    /// Ratio between successive pyramid scales; must exceed 1.0.
    pub scale_factor: f32,
    /// Overlapping hits a candidate needs before it is reported.
    pub min_neighbors: u32,
    pub slide_window_step: u32,
}

impl Default for FaceLocatorConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model/seeta_fd_frontal_v1.0.bin"),
            min_face_size: 30,
            max_face_size: 300,
            scale_factor: 1.1,
            min_neighbors: 5,
            slide_window_step: 4,
        }
    }
}

impl FaceLocatorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.scale_factor.is_nan() || self.scale_factor <= 1.0 {
            return Err("face_locator: scale factor must be greater than 1.0".to_string());
        }
        if self.min_face_size == 0 || self.min_face_size > self.max_face_size {
            return Err("face_locator: face size range must satisfy 0 < min <= max".to_string());
        }
        if self.slide_window_step == 0 {
            return Err("face_locator: slide window step must be positive".to_string());
        }
        Ok(())
    }

    pub fn admits(&self, region: &FaceRegion) -> bool {
        let side = region.width.max(region.height);
        !region.is_empty() && side >= self.min_face_size && side <= self.max_face_size
    }
}
