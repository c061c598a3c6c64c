pub mod finding;
pub mod skin_analysis;

pub use self::finding::{BoundingBox, Finding, IssueType};
pub use self::skin_analysis::{AnalysisReport, Severity, SkinAnalysis};
