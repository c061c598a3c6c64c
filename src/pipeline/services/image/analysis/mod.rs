pub mod acne_detector;
pub mod config;
pub mod core;
pub mod dark_spot_detector;
pub mod dryness_detector;
pub mod oily_skin_detector;
pub mod orchestrator;
pub mod pipeline;
pub mod redness_detector;
pub mod wrinkle_detector;

pub use self::acne_detector::AcneDetector;
pub use self::config::{DetectorTunings, ExecutionMode, SkinAnalysisConfig};
pub use self::core::{ContourDetector, IssueDetector, RegionContext};
pub use self::dark_spot_detector::DarkSpotDetector;
pub use self::dryness_detector::DrynessDetector;
pub use self::oily_skin_detector::OilySkinDetector;
pub use self::orchestrator::SkinAnalysisOrchestrator;
pub use self::pipeline::{DetectionPipeline, PipelineStats, RegionOutcome, SkinDetector};
pub use self::redness_detector::RednessDetector;
pub use self::wrinkle_detector::WrinkleDetector;
