use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use skin_analyzer::{
    annotate, AnalyzerConfiguration, AnalyzerError, AnalyzerServiceBuilder, Frame,
    SkinAnalysisOrchestrator,
};
use tower::ServiceExt;
use tracing::{error, info, Level};

/// Detects skin issues on the faces in an image and prints the report as JSON.
#[derive(Parser)]
#[command(name = "skin-analyzer")]
#[command(version, about, long_about = None)]
struct Args {
    /// Image to analyze
    #[arg(value_name = "IMAGE")]
    image: PathBuf,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write a copy of the image with every finding outlined
    #[arg(short, long, value_name = "OUT")]
    annotate: Option<PathBuf>,
}

fn init_logging(level: Level) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), AnalyzerError> {
    let args = Args::parse();

    let configuration = AnalyzerConfiguration::load(args.config.as_deref())?;
    init_logging(configuration.log_level()?);

    let analyzer = match SkinAnalysisOrchestrator::from_configuration(&configuration) {
        Ok(analyzer) => Arc::new(analyzer),
        Err(e) => {
            error!(error = %e, "Analyzer could not start");
            return Err(e);
        }
    };
    info!(
        detectors = ?analyzer.get_config().enabled_detectors,
        execution = ?analyzer.get_config().execution,
        "Analyzer ready"
    );

    let image = image::open(&args.image)?.to_rgb8();
    info!(
        path = %args.image.display(),
        width = image.width(),
        height = image.height(),
        "Analyzing image"
    );

    let frame = Frame::from_image(image);
    let report = AnalyzerServiceBuilder::new(analyzer)
        .build()
        .oneshot(frame.clone())
        .await
        .map_err(|e| AnalyzerError::ServiceUnavailable(e.to_string()))?;

    if let Some(path) = &args.annotate {
        annotate(frame.image(), &report.issues).save(path)?;
        info!(path = %path.display(), "Wrote annotated image");
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
