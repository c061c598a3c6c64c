//! Skin Analysis Orchestrator - locates faces and runs the detection pipeline on each
use std::sync::Arc;
use std::time::Instant;

use image::RgbImage;
use tracing::{debug, info};

use super::config::SkinAnalysisConfig;
use super::core::RegionContext;
use super::pipeline::{DetectionPipeline, PipelineStats};
use crate::error::AnalyzerError;
use crate::pipeline::domain::{Finding, SkinAnalysis};
use crate::pipeline::services::face::{FaceLocator, FaceRegion};

/// Owns the face locator and the detector pipeline. Immutable after
/// construction, so one instance serves concurrent analyses.
pub struct SkinAnalysisOrchestrator {
    locator: Arc<dyn FaceLocator>,
    detection_pipeline: DetectionPipeline,
    config: SkinAnalysisConfig,
}

impl SkinAnalysisOrchestrator {
    pub fn new(
        config: SkinAnalysisConfig,
        locator: Arc<dyn FaceLocator>,
    ) -> Result<Self, AnalyzerError> {
        config.validate().map_err(AnalyzerError::InvalidConfig)?;

        let detection_pipeline = DetectionPipeline::new(&config);
        debug!(stats = ?detection_pipeline.get_stats(), "Skin analysis pipeline ready");

        Ok(Self {
            locator,
            detection_pipeline,
            config,
        })
    }

    /// Builds the orchestrator with the SeetaFace locator described by
    /// `configuration`.
    #[cfg(feature = "rustface")]
    pub fn from_configuration(
        configuration: &crate::config::AnalyzerConfiguration,
    ) -> Result<Self, AnalyzerError> {
        use crate::pipeline::services::face::SeetaFaceLocator;

        configuration.validate()?;
        let locator = SeetaFaceLocator::load(&configuration.face_locator)?;
        Self::new(configuration.analysis.clone(), Arc::new(locator))
    }

    /// Analyze a frame: every located face is cropped and examined by the
    /// enabled detectors. No face yields an empty, low-severity result.
    pub fn analyze(&self, frame: &RgbImage) -> SkinAnalysis {
        let analysis_start = Instant::now();
        let dimensions = frame.dimensions();

        let regions: Vec<FaceRegion> = self
            .locator
            .locate(frame)
            .into_iter()
            .map(|region| region.clip_to(dimensions))
            .filter(|region| !region.is_empty())
            .collect();

        if regions.is_empty() {
            info!("No face located, nothing to analyze");
            return SkinAnalysis::empty();
        }

        let mut findings = Vec::new();
        for (face_index, region) in regions.iter().enumerate() {
            let crop =
                image::imageops::crop_imm(frame, region.x, region.y, region.width, region.height)
                    .to_image();
            let context = RegionContext::new(&crop, (region.x, region.y));
            let outcome = self.detection_pipeline.process(&context);

            debug!(
                face = face_index,
                region = ?region,
                findings = outcome.findings.len(),
                failed_detectors = outcome.failures.len(),
                "Face region analyzed"
            );
            findings.extend(
                outcome
                    .findings
                    .into_iter()
                    .map(|finding| tag_face(finding, face_index)),
            );
        }

        let analysis = SkinAnalysis::new(findings);
        info!(
            faces = regions.len(),
            findings = analysis.findings().len(),
            severity = ?analysis.severity(),
            elapsed_ms = analysis_start.elapsed().as_millis() as u64,
            "Skin analysis complete"
        );
        analysis
    }

    pub fn get_config(&self) -> &SkinAnalysisConfig {
        &self.config
    }

    pub fn get_stats(&self) -> PipelineStats {
        self.detection_pipeline.get_stats()
    }
}

// Ids only encode region-local positions; later faces get a suffix so ids
// stay unique within one analysis.
fn tag_face(mut finding: Finding, face_index: usize) -> Finding {
    if face_index > 0 {
        finding.id = format!("{}_f{}", finding.id, face_index);
    }
    finding
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::domain::{IssueType, Severity};
    use image::Rgb;
    use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
    use imageproc::rect::Rect;

    struct FixedLocator(Vec<FaceRegion>);

    impl FaceLocator for FixedLocator {
        fn locate(&self, _frame: &RgbImage) -> Vec<FaceRegion> {
            self.0.clone()
        }
    }

    struct WholeFrame;

    impl FaceLocator for WholeFrame {
        fn locate(&self, frame: &RgbImage) -> Vec<FaceRegion> {
            let (width, height) = frame.dimensions();
            vec![FaceRegion::new(0, 0, width, height)]
        }
    }

    fn orchestrator(locator: impl FaceLocator + 'static) -> SkinAnalysisOrchestrator {
        SkinAnalysisOrchestrator::new(SkinAnalysisConfig::default(), Arc::new(locator)).unwrap()
    }

    fn shiny_frame() -> RgbImage {
        let mut frame = RgbImage::from_pixel(200, 200, Rgb([128, 128, 128]));
        draw_filled_rect_mut(&mut frame, Rect::at(90, 90).of_size(20, 20), Rgb([255, 255, 255]));
        frame
    }

    #[test]
    fn bright_patch_is_reported_as_oily() {
        let analysis = orchestrator(WholeFrame).analyze(&shiny_frame());

        let oily: Vec<_> = analysis
            .findings()
            .iter()
            .filter(|f| f.issue_type == IssueType::OilySkin)
            .collect();
        assert_eq!(oily.len(), 1);
        let bbox = oily[0].bbox;
        assert!(bbox.x.abs_diff(90) <= 2, "bbox {bbox:?}");
        assert!(bbox.y.abs_diff(90) <= 2, "bbox {bbox:?}");
        assert!(bbox.width.abs_diff(20) <= 3, "bbox {bbox:?}");
        assert!(bbox.height.abs_diff(20) <= 3, "bbox {bbox:?}");
    }

    #[test]
    fn red_papule_is_reported_as_acne() {
        let mut frame = RgbImage::from_pixel(120, 120, Rgb([205, 185, 160]));
        draw_filled_circle_mut(&mut frame, (60, 60), 8, Rgb([210, 35, 0]));

        let analysis = orchestrator(WholeFrame).analyze(&frame);
        let acne = analysis
            .findings()
            .iter()
            .find(|f| f.issue_type == IssueType::Acne)
            .expect("acne finding");
        assert!(acne.confidence > 0.3);
        assert!(acne.bbox.x >= 50 && acne.bbox.right() <= 70);
    }

    #[test]
    fn no_face_means_empty_low_result() {
        let analysis = orchestrator(FixedLocator(Vec::new())).analyze(&shiny_frame());
        assert!(analysis.findings().is_empty());
        assert_eq!(analysis.severity(), Severity::Low);
    }

    #[test]
    fn many_blemishes_are_high_severity() {
        let mut frame = RgbImage::from_pixel(160, 160, Rgb([205, 185, 160]));
        for (x, y) in [(20, 20), (100, 20), (20, 100), (100, 100)] {
            draw_filled_rect_mut(&mut frame, Rect::at(x, y).of_size(15, 15), Rgb([200, 40, 40]));
        }

        let analysis = orchestrator(WholeFrame).analyze(&frame);
        let redness: Vec<&Finding> = analysis
            .findings()
            .iter()
            .filter(|f| f.issue_type == IssueType::Redness)
            .collect();
        assert!(redness.len() >= 4, "{redness:?}");
        for (x, y) in [(20, 20), (100, 20), (20, 100), (100, 100)] {
            let hits = redness
                .iter()
                .filter(|f| f.bbox.x.abs_diff(x) <= 2 && f.bbox.y.abs_diff(y) <= 2)
                .count();
            assert_eq!(hits, 1, "patch at ({x}, {y}): {redness:?}");
        }
        assert_eq!(analysis.severity(), Severity::High);
    }

    #[test]
    fn repeated_analysis_is_identical() {
        let mut frame = shiny_frame();
        draw_filled_circle_mut(&mut frame, (40, 40), 8, Rgb([210, 35, 0]));
        let analyzer = orchestrator(WholeFrame);
        assert_eq!(analyzer.analyze(&frame), analyzer.analyze(&frame));
    }

    #[test]
    fn boxes_lie_inside_the_frame() {
        let mut frame = shiny_frame();
        draw_filled_rect_mut(&mut frame, Rect::at(150, 150).of_size(50, 50), Rgb([255, 255, 255]));
        let analyzer = orchestrator(FixedLocator(vec![FaceRegion::new(120, 120, 200, 200)]));
        let analysis = analyzer.analyze(&frame);
        assert!(!analysis.findings().is_empty());
        for finding in analysis.findings() {
            assert!(finding.bbox.fits_within(200, 200), "{finding:?}");
            assert!(finding.bbox.x >= 120 && finding.bbox.y >= 120, "{finding:?}");
        }
    }

    #[test]
    fn later_faces_get_unique_ids() {
        let mut frame = RgbImage::from_pixel(200, 100, Rgb([205, 185, 160]));
        draw_filled_circle_mut(&mut frame, (50, 50), 8, Rgb([210, 35, 0]));
        draw_filled_circle_mut(&mut frame, (150, 50), 8, Rgb([210, 35, 0]));
        let analyzer = orchestrator(FixedLocator(vec![
            FaceRegion::new(0, 0, 100, 100),
            FaceRegion::new(100, 0, 100, 100),
        ]));

        let analysis = analyzer.analyze(&frame);
        let acne: Vec<&Finding> = analysis
            .findings()
            .iter()
            .filter(|f| f.issue_type == IssueType::Acne)
            .collect();
        assert_eq!(acne.len(), 2);
        assert!(!acne[0].id.ends_with("_f1"));
        assert!(acne[1].id.ends_with("_f1"));
        assert_eq!(acne[0].id, acne[1].id.trim_end_matches("_f1"));
    }

    #[test]
    fn degenerate_regions_are_skipped() {
        let analyzer = orchestrator(FixedLocator(vec![
            FaceRegion::new(10, 10, 0, 40),
            FaceRegion::new(500, 500, 30, 30),
        ]));
        let analysis = analyzer.analyze(&shiny_frame());
        assert!(analysis.findings().is_empty());
        assert_eq!(analysis.severity(), Severity::Low);
    }

    #[test]
    fn keeps_the_configuration_it_was_built_with() {
        let config = SkinAnalysisConfig::default().disable_detector(IssueType::Wrinkles);
        let analyzer = SkinAnalysisOrchestrator::new(config, Arc::new(WholeFrame)).unwrap();
        assert!(!analyzer.get_config().enabled_detectors.contains(&IssueType::Wrinkles));
        assert_eq!(analyzer.get_stats().total_detectors, 5);
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let config = SkinAnalysisConfig {
            enabled_detectors: Vec::new(),
            ..SkinAnalysisConfig::default()
        };
        let result = SkinAnalysisOrchestrator::new(config, Arc::new(WholeFrame));
        assert!(matches!(result, Err(AnalyzerError::InvalidConfig(_))));
    }
}
