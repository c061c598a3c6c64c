pub mod service;

pub use self::service::{AnalyzerServiceBuilder, SkinAnalysisService};
