use serde::Deserialize;

use crate::pipeline::domain::IssueType;
use crate::pipeline::services::image::line_segments::SegmentDetectionOptions;
use crate::pipeline::services::image::mask::{HsvRange, StructuringElement};

/// Configuration for skin analysis with tunable parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SkinAnalysisConfig {
    pub enabled_detectors: Vec<IssueType>,
    pub execution: ExecutionMode,
    pub tunings: DetectorTunings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Detectors run one after another on the calling thread.
    Sequential,
    /// Detectors of one region run on the rayon pool.
    Parallel,
}

/// Area band and confidence limits shared by the contour-based detectors.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AcceptanceBand {
    /// Contours must have `min_area < area < max_area` (px²).
    pub min_area: f64,
    pub max_area: f64,
    /// Confidences at or below this are dropped.
    pub accept_threshold: f32,
    /// Confidences are capped here.
    pub max_confidence: f32,
}

impl AcceptanceBand {
    pub fn new(min_area: f64, max_area: f64, accept_threshold: f32, max_confidence: f32) -> Self {
        Self {
            min_area,
            max_area,
            accept_threshold,
            max_confidence,
        }
    }

    fn validate(&self, name: &str) -> Result<(), String> {
        if !(self.min_area >= 0.0 && self.min_area < self.max_area) {
            return Err(format!("{name}: area band must satisfy 0 <= min < max"));
        }
        validate_limits(name, self.accept_threshold, self.max_confidence)
    }
}

fn validate_limits(name: &str, accept_threshold: f32, max_confidence: f32) -> Result<(), String> {
    if !(0.0..=1.0).contains(&accept_threshold) || !(0.0..=1.0).contains(&max_confidence) {
        return Err(format!(
            "{name}: accept threshold and max confidence must be between 0.0 and 1.0"
        ));
    }
    if max_confidence <= accept_threshold {
        return Err(format!(
            "{name}: max confidence must exceed the accept threshold"
        ));
    }
    Ok(())
}

fn validate_kernel(name: &str, kernel: &StructuringElement) -> Result<(), String> {
    if kernel.is_valid() {
        Ok(())
    } else {
        Err(format!("{name}: kernel size must be odd, got {}", kernel.size))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AcneTuning {
    pub band: AcceptanceBand,
    /// Red hue ranges, OR-combined.
    pub hsv_ranges: Vec<HsvRange>,
    pub kernel: StructuringElement,
    pub size_scale: f64,
    pub circularity_boost: f64,
    pub fallback_circularity: f64,
    pub size_weight: f64,
    pub circularity_weight: f64,
    pub bias: f64,
}

impl Default for AcneTuning {
    fn default() -> Self {
        Self {
            band: AcceptanceBand::new(8.0, 600.0, 0.3, 0.95),
            hsv_ranges: vec![
                HsvRange::new([0, 40, 40], [10, 255, 255]),
                HsvRange::new([170, 40, 40], [180, 255, 255]),
            ],
            kernel: StructuringElement::ellipse(3),
            size_scale: 300.0,
            circularity_boost: 2.0,
            fallback_circularity: 0.5,
            size_weight: 0.4,
            circularity_weight: 0.4,
            bias: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DarkSpotTuning {
    pub band: AcceptanceBand,
    pub adaptive_block_size: u32,
    pub adaptive_delta: i16,
    pub kernel: StructuringElement,
    pub darkness_scale: f64,
    pub circularity_boost: f64,
    pub fallback_shape: f64,
    pub darkness_weight: f64,
    pub shape_weight: f64,
    pub bias: f64,
}

impl Default for DarkSpotTuning {
    fn default() -> Self {
        Self {
            band: AcceptanceBand::new(12.0, 1000.0, 0.35, 0.92),
            adaptive_block_size: 11,
            adaptive_delta: 5,
            kernel: StructuringElement::ellipse(3),
            darkness_scale: 128.0,
            circularity_boost: 1.5,
            fallback_shape: 0.3,
            darkness_weight: 0.6,
            shape_weight: 0.3,
            bias: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RednessTuning {
    pub band: AcceptanceBand,
    pub hsv_ranges: Vec<HsvRange>,
    /// `255 * r / (g + b + 1)` must exceed this.
    pub dominance_threshold: u8,
    pub kernel: StructuringElement,
    /// Lab `a` value of a neutral pixel.
    pub a_neutral: f64,
    pub a_span: f64,
    pub area_scale: f64,
    pub intensity_weight: f64,
    pub area_weight: f64,
    pub bias: f64,
}

impl Default for RednessTuning {
    fn default() -> Self {
        Self {
            band: AcceptanceBand::new(50.0, 2500.0, 0.4, 0.88),
            hsv_ranges: vec![
                HsvRange::new([0, 30, 30], [10, 255, 255]),
                HsvRange::new([170, 30, 30], [180, 255, 255]),
            ],
            dominance_threshold: 150,
            kernel: StructuringElement::ellipse(5),
            a_neutral: 128.0,
            a_span: 64.0,
            area_scale: 1000.0,
            intensity_weight: 0.7,
            area_weight: 0.2,
            bias: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OilySkinTuning {
    pub band: AcceptanceBand,
    pub lightness_weight: f32,
    pub value_weight: f32,
    pub blur_sigma: f32,
    pub kernel: StructuringElement,
    pub brightness_floor: f64,
    pub brightness_span: f64,
    pub area_scale: f64,
    pub brightness_weight: f64,
    pub area_weight: f64,
    pub bias: f64,
}

impl Default for OilySkinTuning {
    fn default() -> Self {
        Self {
            band: AcceptanceBand::new(80.0, 4000.0, 0.35, 0.85),
            lightness_weight: 0.6,
            value_weight: 0.4,
            blur_sigma: 1.1,
            kernel: StructuringElement::ellipse(7),
            brightness_floor: 150.0,
            brightness_span: 105.0,
            area_scale: 2000.0,
            brightness_weight: 0.6,
            area_weight: 0.3,
            bias: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DrynessTuning {
    pub band: AcceptanceBand,
    pub laplacian_weight: f32,
    pub gradient_weight: f32,
    pub kernel: StructuringElement,
    pub area_scale: f64,
    pub roughness_weight: f64,
    pub area_weight: f64,
    pub bias: f64,
}

impl Default for DrynessTuning {
    fn default() -> Self {
        Self {
            band: AcceptanceBand::new(150.0, 6000.0, 0.3, 0.78),
            laplacian_weight: 0.5,
            gradient_weight: 0.5,
            kernel: StructuringElement::rect(5),
            area_scale: 3000.0,
            roughness_weight: 0.6,
            area_weight: 0.2,
            bias: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WrinkleTuning {
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    pub segments: SegmentDetectionOptions,
    /// Segments must be strictly longer than this (px).
    pub min_length: f64,
    /// Padding added around each segment's extent.
    pub margin: u32,
    pub length_scale: f64,
    pub length_weight: f64,
    pub bias: f64,
    pub accept_threshold: f32,
    pub max_confidence: f32,
}

impl Default for WrinkleTuning {
    fn default() -> Self {
        Self {
            blur_sigma: 0.8,
            canny_low: 50.0,
            canny_high: 150.0,
            segments: SegmentDetectionOptions::default(),
            min_length: 15.0,
            margin: 5,
            length_scale: 50.0,
            length_weight: 0.7,
            bias: 0.2,
            accept_threshold: 0.4,
            max_confidence: 0.75,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectorTunings {
    pub acne: AcneTuning,
    pub dark_spots: DarkSpotTuning,
    pub redness: RednessTuning,
    pub oily_skin: OilySkinTuning,
    pub dryness: DrynessTuning,
    pub wrinkles: WrinkleTuning,
}

impl DetectorTunings {
    pub fn validate(&self) -> Result<(), String> {
        self.acne.band.validate("acne")?;
        validate_kernel("acne", &self.acne.kernel)?;
        self.dark_spots.band.validate("dark_spots")?;
        validate_kernel("dark_spots", &self.dark_spots.kernel)?;
        if self.dark_spots.adaptive_block_size % 2 == 0 {
            return Err("dark_spots: adaptive block size must be odd".to_string());
        }
        self.redness.band.validate("redness")?;
        validate_kernel("redness", &self.redness.kernel)?;
        if self.redness.a_span <= 0.0 {
            return Err("redness: a span must be positive".to_string());
        }
        self.oily_skin.band.validate("oily_skin")?;
        validate_kernel("oily_skin", &self.oily_skin.kernel)?;
        if self.oily_skin.blur_sigma <= 0.0 || self.oily_skin.brightness_span <= 0.0 {
            return Err("oily_skin: blur sigma and brightness span must be positive".to_string());
        }
        self.dryness.band.validate("dryness")?;
        validate_kernel("dryness", &self.dryness.kernel)?;
        validate_limits(
            "wrinkles",
            self.wrinkles.accept_threshold,
            self.wrinkles.max_confidence,
        )?;
        if self.wrinkles.blur_sigma <= 0.0 || self.wrinkles.length_scale <= 0.0 {
            return Err("wrinkles: blur sigma and length scale must be positive".to_string());
        }
        if self.wrinkles.canny_low > self.wrinkles.canny_high {
            return Err("wrinkles: canny low threshold exceeds high threshold".to_string());
        }
        Ok(())
    }
}

impl Default for SkinAnalysisConfig {
    fn default() -> Self {
        Self {
            enabled_detectors: IssueType::ALL.to_vec(),
            execution: ExecutionMode::Sequential,
            tunings: DetectorTunings::default(),
        }
    }
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::Sequential
    }
}

impl SkinAnalysisConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.enabled_detectors.is_empty() {
            return Err("At least one detector must be enabled".to_string());
        }

        self.tunings.validate()
    }

    /// Enable a specific detector type
    pub fn enable_detector(mut self, detector_type: IssueType) -> Self {
        if !self.enabled_detectors.contains(&detector_type) {
            self.enabled_detectors.push(detector_type);
        }
        self
    }

    /// Disable a specific detector type
    pub fn disable_detector(mut self, detector_type: IssueType) -> Self {
        self.enabled_detectors.retain(|d| *d != detector_type);
        self
    }

    pub fn with_execution(mut self, execution: ExecutionMode) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_tunings(mut self, tunings: DetectorTunings) -> Self {
        self.tunings = tunings;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SkinAnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_empty_detector_set() {
        let mut config = SkinAnalysisConfig::default();
        for kind in IssueType::ALL {
            config = config.disable_detector(kind);
        }
        assert!(config.validate().is_err());
        assert!(config.enable_detector(IssueType::Dryness).validate().is_ok());
    }

    #[test]
    fn rejects_inverted_area_band() {
        let mut tunings = DetectorTunings::default();
        tunings.redness.band = AcceptanceBand::new(2500.0, 50.0, 0.4, 0.88);
        let config = SkinAnalysisConfig::default().with_tunings(tunings);
        assert!(config.validate().unwrap_err().contains("redness"));
    }

    #[test]
    fn rejects_cap_below_threshold() {
        let mut tunings = DetectorTunings::default();
        tunings.wrinkles.max_confidence = 0.3;
        assert!(tunings.validate().is_err());
    }

    #[test]
    fn rejects_even_kernels() {
        let mut tunings = DetectorTunings::default();
        tunings.oily_skin.kernel = StructuringElement::ellipse(6);
        assert!(tunings.validate().unwrap_err().contains("oily_skin"));
    }
}
