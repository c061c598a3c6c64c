pub mod analysis;
pub mod color_space;
pub mod contours;
pub mod line_segments;
pub mod mask;
pub mod overlay;

pub use self::analysis::{SkinAnalysisConfig, SkinAnalysisOrchestrator};
pub use self::overlay::annotate;
