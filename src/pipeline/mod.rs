pub mod domain;
pub mod orchestration;
pub mod services;

pub use self::domain::{AnalysisReport, BoundingBox, Finding, IssueType, Severity, SkinAnalysis};
pub use self::orchestration::{AnalyzerServiceBuilder, SkinAnalysisService};
