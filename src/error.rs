use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::domain::finding::IssueType;

// Main Analyzer Error Type

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Failed to load face model from {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Configuration Error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Image I/O error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Analysis worker unavailable: {0}")]
    ServiceUnavailable(String),
}

// Per-detector failures never abort an analysis; the pipeline logs them and moves on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorError {
    #[error("{detector} produced a non-finite {what}")]
    Numeric {
        detector: IssueType,
        what: &'static str,
    },
    #[error("{detector} panicked: {message}")]
    Panicked { detector: IssueType, message: String },
}

impl DetectorError {
    pub fn detector(&self) -> IssueType {
        match self {
            DetectorError::Numeric { detector, .. } => *detector,
            DetectorError::Panicked { detector, .. } => *detector,
        }
    }
}
