use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::Level;

use crate::error::AnalyzerError;
use crate::pipeline::services::face::FaceLocatorConfig;
use crate::pipeline::services::image::SkinAnalysisConfig;

pub const ENV_PREFIX: &str = "SKIN_ANALYZER";

// Keys whose environment value is a comma-separated list.
const ENV_LIST_KEYS: [&str; 1] = ["analysis.enabled_detectors"];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfiguration {
    pub log_level: String,
    pub face_locator: FaceLocatorConfig,
    pub analysis: SkinAnalysisConfig,
}

impl Default for AnalyzerConfiguration {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            face_locator: FaceLocatorConfig::default(),
            analysis: SkinAnalysisConfig::default(),
        }
    }
}

impl AnalyzerConfiguration {
    /// Defaults, overlaid by the optional file, overlaid by
    /// `SKIN_ANALYZER_*` variables (`__` separates nested keys).
    pub fn load(path: Option<&Path>) -> Result<Self, AnalyzerError> {
        Self::load_with_environment(path, environment())
    }

    fn load_with_environment(
        path: Option<&Path>,
        environment: Environment,
    ) -> Result<Self, AnalyzerError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(environment);

        let configuration: AnalyzerConfiguration = builder.build()?.try_deserialize()?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn validate(&self) -> Result<(), AnalyzerError> {
        self.log_level()?;
        self.face_locator
            .validate()
            .and_then(|_| self.analysis.validate())
            .map_err(AnalyzerError::InvalidConfig)
    }

    pub fn log_level(&self) -> Result<Level, AnalyzerError> {
        self.log_level.parse::<Level>().map_err(|_| {
            AnalyzerError::InvalidConfig(format!("unknown log level {:?}", self.log_level))
        })
    }
}

fn environment() -> Environment {
    ENV_LIST_KEYS.into_iter().fold(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(","),
        Environment::with_list_parse_key,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::domain::IssueType;
    use crate::pipeline::services::image::analysis::ExecutionMode;
    use std::io::Write;

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_validate() {
        let configuration = AnalyzerConfiguration::default();
        assert!(configuration.validate().is_ok());
        assert_eq!(configuration.log_level().unwrap(), Level::INFO);
        assert_eq!(configuration.analysis.enabled_detectors, IssueType::ALL.to_vec());
    }

    #[test]
    fn file_overrides_defaults() {
        let file = config_file(
            r#"
log_level = "debug"

[face_locator]
model_path = "/opt/models/face.bin"
min_face_size = 40

[analysis]
enabled_detectors = ["acne", "wrinkles"]
execution = "parallel"

[analysis.tunings.acne.band]
min_area = 10.0
max_area = 500.0
accept_threshold = 0.4
max_confidence = 0.9
"#,
        );

        let configuration = AnalyzerConfiguration::load(Some(file.path())).unwrap();
        assert_eq!(configuration.log_level().unwrap(), Level::DEBUG);
        assert_eq!(configuration.face_locator.min_face_size, 40);
        assert_eq!(configuration.face_locator.max_face_size, 300);
        assert_eq!(
            configuration.analysis.enabled_detectors,
            vec![IssueType::Acne, IssueType::Wrinkles]
        );
        assert_eq!(configuration.analysis.execution, ExecutionMode::Parallel);
        let acne = &configuration.analysis.tunings.acne;
        assert_eq!(acne.band.max_area, 500.0);
        assert_eq!(acne.size_scale, 300.0);
        assert_eq!(configuration.analysis.tunings.redness.band.min_area, 50.0);
    }

    #[test]
    fn invalid_values_are_rejected_on_load() {
        let file = config_file(
            r#"
[face_locator]
scale_factor = 0.9
"#,
        );
        assert!(matches!(
            AnalyzerConfiguration::load(Some(file.path())),
            Err(AnalyzerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn unknown_detector_names_fail_to_deserialize() {
        let file = config_file(
            r#"
[analysis]
enabled_detectors = ["freckles"]
"#,
        );
        assert!(matches!(
            AnalyzerConfiguration::load(Some(file.path())),
            Err(AnalyzerError::Config(_))
        ));
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = AnalyzerConfiguration::load(Some(Path::new("/nonexistent/analyzer.toml")));
        assert!(matches!(result, Err(AnalyzerError::Config(_))));
    }

    fn variables(pairs: &[(&str, &str)]) -> Environment {
        let source: config::Map<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        environment().source(Some(source))
    }

    #[test]
    fn environment_overrides_file() {
        let file = config_file(
            r#"
[analysis]
enabled_detectors = ["acne"]
execution = "sequential"
"#,
        );
        let env = variables(&[
            ("SKIN_ANALYZER_ANALYSIS__ENABLED_DETECTORS", "redness,oily_skin"),
            ("SKIN_ANALYZER_ANALYSIS__EXECUTION", "parallel"),
            ("SKIN_ANALYZER_FACE_LOCATOR__MIN_FACE_SIZE", "48"),
            ("SKIN_ANALYZER_LOG_LEVEL", "warn"),
        ]);

        let configuration =
            AnalyzerConfiguration::load_with_environment(Some(file.path()), env).unwrap();
        assert_eq!(
            configuration.analysis.enabled_detectors,
            vec![IssueType::Redness, IssueType::OilySkin]
        );
        assert_eq!(configuration.analysis.execution, ExecutionMode::Parallel);
        assert_eq!(configuration.face_locator.min_face_size, 48);
        assert_eq!(configuration.log_level().unwrap(), Level::WARN);
    }

    #[test]
    fn bad_log_level_is_rejected() {
        let configuration = AnalyzerConfiguration {
            log_level: "chatty".to_string(),
            ..AnalyzerConfiguration::default()
        };
        assert!(configuration.validate().is_err());
    }
}
