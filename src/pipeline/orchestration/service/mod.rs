pub mod analyzer_service;

pub use self::analyzer_service::{AnalyzerServiceBuilder, SkinAnalysisService};
