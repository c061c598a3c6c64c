//! Detection pipeline running the enabled detectors over one face region
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, warn};

use super::acne_detector::AcneDetector;
use super::config::{DetectorTunings, ExecutionMode, SkinAnalysisConfig};
use super::core::{IssueDetector, RegionContext};
use super::dark_spot_detector::DarkSpotDetector;
use super::dryness_detector::DrynessDetector;
use super::oily_skin_detector::OilySkinDetector;
use super::redness_detector::RednessDetector;
use super::wrinkle_detector::WrinkleDetector;
use crate::error::DetectorError;
use crate::pipeline::domain::{Finding, IssueType};

/// Closed set of detector strategies.
pub enum SkinDetector {
    Acne(AcneDetector),
    DarkSpots(DarkSpotDetector),
    Redness(RednessDetector),
    OilySkin(OilySkinDetector),
    Dryness(DrynessDetector),
    Wrinkles(WrinkleDetector),
}

impl SkinDetector {
    pub fn from_tunings(issue_type: IssueType, tunings: &DetectorTunings) -> Self {
        match issue_type {
            IssueType::Acne => SkinDetector::Acne(AcneDetector::new(tunings.acne.clone())),
            IssueType::DarkSpots => {
                SkinDetector::DarkSpots(DarkSpotDetector::new(tunings.dark_spots.clone()))
            }
            IssueType::Redness => {
                SkinDetector::Redness(RednessDetector::new(tunings.redness.clone()))
            }
            IssueType::OilySkin => {
                SkinDetector::OilySkin(OilySkinDetector::new(tunings.oily_skin.clone()))
            }
            IssueType::Dryness => {
                SkinDetector::Dryness(DrynessDetector::new(tunings.dryness.clone()))
            }
            IssueType::Wrinkles => {
                SkinDetector::Wrinkles(WrinkleDetector::new(tunings.wrinkles.clone()))
            }
        }
    }

    fn strategy(&self) -> &dyn IssueDetector {
        match self {
            SkinDetector::Acne(d) => d,
            SkinDetector::DarkSpots(d) => d,
            SkinDetector::Redness(d) => d,
            SkinDetector::OilySkin(d) => d,
            SkinDetector::Dryness(d) => d,
            SkinDetector::Wrinkles(d) => d,
        }
    }
}

impl IssueDetector for SkinDetector {
    fn issue_type(&self) -> IssueType {
        self.strategy().issue_type()
    }

    fn detect(&self, context: &RegionContext) -> Result<Vec<Finding>, DetectorError> {
        self.strategy().detect(context)
    }
}

/// Findings of one region plus the detectors that failed on it.
#[derive(Debug, Default)]
pub struct RegionOutcome {
    pub findings: Vec<Finding>,
    pub failures: Vec<DetectorError>,
}

/// Pipeline that runs detectors in the fixed issue order
pub struct DetectionPipeline {
    detectors: Vec<SkinDetector>,
    execution: ExecutionMode,
}

impl DetectionPipeline {
    pub fn new(config: &SkinAnalysisConfig) -> Self {
        // Enabled kinds are visited in canonical order, whatever order the
        // configuration lists them in.
        let detectors = IssueType::ALL
            .into_iter()
            .filter(|kind| config.enabled_detectors.contains(kind))
            .map(|kind| SkinDetector::from_tunings(kind, &config.tunings))
            .collect();

        Self {
            detectors,
            execution: config.execution,
        }
    }

    /// Runs every detector over the region. A failing detector contributes
    /// nothing; the others are unaffected.
    pub fn process(&self, context: &RegionContext) -> RegionOutcome {
        if context.is_empty() {
            return RegionOutcome::default();
        }

        let results: Vec<Result<Vec<Finding>, DetectorError>> = match self.execution {
            ExecutionMode::Sequential => self
                .detectors
                .iter()
                .map(|detector| run_isolated(detector, context))
                .collect(),
            // Indexed collect keeps the detector order.
            ExecutionMode::Parallel => self
                .detectors
                .par_iter()
                .map(|detector| run_isolated(detector, context))
                .collect(),
        };

        let mut outcome = RegionOutcome::default();
        for result in results {
            match result {
                Ok(findings) => outcome.findings.extend(findings),
                Err(error) => {
                    warn!(detector = %error.detector(), %error, "Detector failed, skipping");
                    outcome.failures.push(error);
                }
            }
        }
        outcome
    }

    /// Get statistics about the pipeline
    pub fn get_stats(&self) -> PipelineStats {
        PipelineStats {
            total_detectors: self.detectors.len(),
            detector_names: self
                .detectors
                .iter()
                .map(|d| d.name().to_string())
                .collect(),
            execution: self.execution,
        }
    }
}

fn run_isolated(
    detector: &dyn IssueDetector,
    context: &RegionContext,
) -> Result<Vec<Finding>, DetectorError> {
    let started = Instant::now();
    let result = catch_unwind(AssertUnwindSafe(|| detector.detect(context))).unwrap_or_else(
        |payload| {
            Err(DetectorError::Panicked {
                detector: detector.issue_type(),
                message: panic_message(payload.as_ref()),
            })
        },
    );

    debug!(
        detector = detector.name(),
        findings = result.as_ref().map(Vec::len).unwrap_or(0),
        elapsed_us = started.elapsed().as_micros() as u64,
        "Detector finished"
    );
    result
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub total_detectors: usize,
    pub detector_names: Vec<String>,
    pub execution: ExecutionMode,
}

impl Default for DetectionPipeline {
    fn default() -> Self {
        Self::new(&SkinAnalysisConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::domain::BoundingBox;
    use image::{Rgb, RgbImage};
    use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
    use imageproc::rect::Rect;

    struct Exploding;

    impl IssueDetector for Exploding {
        fn issue_type(&self) -> IssueType {
            IssueType::Redness
        }

        fn detect(&self, _context: &RegionContext) -> Result<Vec<Finding>, DetectorError> {
            panic!("kaboom")
        }
    }

    struct Failing;

    impl IssueDetector for Failing {
        fn issue_type(&self) -> IssueType {
            IssueType::Dryness
        }

        fn detect(&self, _context: &RegionContext) -> Result<Vec<Finding>, DetectorError> {
            Err(DetectorError::Numeric {
                detector: IssueType::Dryness,
                what: "texture mean",
            })
        }
    }

    fn mixed_region() -> RgbImage {
        let mut region = RgbImage::from_pixel(120, 120, Rgb([128, 128, 128]));
        draw_filled_circle_mut(&mut region, (25, 25), 7, Rgb([210, 35, 0]));
        draw_filled_rect_mut(&mut region, Rect::at(70, 70).of_size(20, 20), Rgb([255, 255, 255]));
        region
    }

    #[test]
    fn default_pipeline_runs_all_kinds_in_order() {
        let stats = DetectionPipeline::default().get_stats();
        assert_eq!(stats.total_detectors, 6);
        assert_eq!(
            stats.detector_names,
            vec!["acne", "dark_spots", "redness", "oily_skin", "dryness", "wrinkles"]
        );
    }

    #[test]
    fn canonical_order_ignores_configured_order() {
        let config = SkinAnalysisConfig {
            enabled_detectors: vec![IssueType::Wrinkles, IssueType::Acne],
            ..SkinAnalysisConfig::default()
        };
        let stats = DetectionPipeline::new(&config).get_stats();
        assert_eq!(stats.detector_names, vec!["acne", "wrinkles"]);
    }

    #[test]
    fn findings_are_grouped_by_detector_order() {
        let region = mixed_region();
        let context = RegionContext::new(&region, (0, 0));
        let outcome = DetectionPipeline::default().process(&context);

        assert!(outcome.failures.is_empty());
        let order: Vec<usize> = outcome
            .findings
            .iter()
            .map(|f| IssueType::ALL.iter().position(|k| *k == f.issue_type).unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] <= w[1]), "order {order:?}");
        assert!(outcome.findings.iter().any(|f| f.issue_type == IssueType::Acne));
        assert!(outcome.findings.iter().any(|f| f.issue_type == IssueType::OilySkin));
    }

    #[test]
    fn parallel_matches_sequential() {
        let region = mixed_region();
        let context = RegionContext::new(&region, (3, 4));
        let sequential = DetectionPipeline::default().process(&context);
        let parallel = DetectionPipeline::new(
            &SkinAnalysisConfig::default().with_execution(ExecutionMode::Parallel),
        )
        .process(&context);
        assert_eq!(sequential.findings, parallel.findings);
    }

    #[test]
    fn disabled_detectors_contribute_nothing() {
        let region = mixed_region();
        let context = RegionContext::new(&region, (0, 0));
        let config = SkinAnalysisConfig::default().disable_detector(IssueType::Acne);
        let outcome = DetectionPipeline::new(&config).process(&context);
        assert!(outcome.findings.iter().all(|f| f.issue_type != IssueType::Acne));
    }

    #[test]
    fn panics_and_errors_are_contained() {
        let region = RgbImage::from_pixel(10, 10, Rgb([1, 1, 1]));
        let context = RegionContext::new(&region, (0, 0));

        let panicked = run_isolated(&Exploding, &context).unwrap_err();
        assert_eq!(
            panicked,
            DetectorError::Panicked {
                detector: IssueType::Redness,
                message: "kaboom".to_string(),
            }
        );
        assert_eq!(run_isolated(&Failing, &context).unwrap_err().detector(), IssueType::Dryness);
    }

    #[test]
    fn empty_region_yields_empty_outcome() {
        let region = RgbImage::new(0, 0);
        let context = RegionContext::new(&region, (0, 0));
        let outcome = DetectionPipeline::default().process(&context);
        assert!(outcome.findings.is_empty());
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn findings_stay_inside_the_region() {
        let region = mixed_region();
        let context = RegionContext::new(&region, (10, 10));
        for finding in DetectionPipeline::default().process(&context).findings {
            let local = BoundingBox::new(
                finding.bbox.x - 10,
                finding.bbox.y - 10,
                finding.bbox.width,
                finding.bbox.height,
            );
            assert!(local.fits_within(120, 120), "{finding:?}");
        }
    }
}
