pub mod face;
pub mod image;

pub use self::face::{FaceLocator, FaceLocatorConfig, FaceRegion};
pub use self::image::{SkinAnalysisConfig, SkinAnalysisOrchestrator};
