pub mod common;
pub mod config;
pub mod error;
pub mod pipeline;

pub use crate::common::Frame;
pub use crate::config::AnalyzerConfiguration;
pub use crate::error::{AnalyzerError, DetectorError};
pub use crate::pipeline::domain::{
    AnalysisReport, BoundingBox, Finding, IssueType, Severity, SkinAnalysis,
};
pub use crate::pipeline::orchestration::{AnalyzerServiceBuilder, SkinAnalysisService};
pub use crate::pipeline::services::face::{FaceLocator, FaceLocatorConfig, FaceRegion};
pub use crate::pipeline::services::image::analysis::{
    ExecutionMode, SkinAnalysisConfig, SkinAnalysisOrchestrator,
};
pub use crate::pipeline::services::image::annotate;
