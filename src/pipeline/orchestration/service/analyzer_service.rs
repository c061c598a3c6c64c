use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::task::Context;
use futures::task::Poll;
use futures::Future;
use tower::limit::ConcurrencyLimitLayer;
use tower::timeout::TimeoutLayer;
use tower::util::BoxService;
use tower::{BoxError, Service, ServiceBuilder};
use tracing::{debug, error};

use crate::common::Frame;
use crate::error::AnalyzerError;
use crate::pipeline::domain::AnalysisReport;
use crate::pipeline::services::image::SkinAnalysisOrchestrator;

/// Runs the synchronous analysis on the blocking pool and wraps the result in
/// a report envelope.
#[derive(Clone)]
pub struct SkinAnalysisService {
    analyzer: Arc<SkinAnalysisOrchestrator>,
}

impl SkinAnalysisService {
    pub fn new(analyzer: Arc<SkinAnalysisOrchestrator>) -> Self {
        Self { analyzer }
    }
}

impl Service<Frame> for SkinAnalysisService {
    type Response = AnalysisReport;
    type Error = AnalyzerError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, frame: Frame) -> Self::Future {
        let analyzer = self.analyzer.clone();

        Box::pin(async move {
            let frame_id = frame.frame_id();
            let received_at = frame.received_at();
            let analysis = tokio::task::spawn_blocking(move || analyzer.analyze(frame.image()))
                .await
                .map_err(|e| {
                    error!(%frame_id, error = %e, "Analysis worker failed");
                    AnalyzerError::ServiceUnavailable(e.to_string())
                })?;
            debug!(
                %frame_id,
                findings = analysis.findings().len(),
                since_received_ms = (Utc::now() - received_at).num_milliseconds(),
                "Frame analyzed"
            );
            Ok(AnalysisReport::from_analysis(analysis))
        })
    }
}

pub struct AnalyzerServiceBuilder {
    pub analyzer: Arc<SkinAnalysisOrchestrator>,
    pub analysis_timeout: Option<Duration>,
    pub max_in_flight: Option<usize>,
}

impl AnalyzerServiceBuilder {
    pub fn new(analyzer: Arc<SkinAnalysisOrchestrator>) -> Self {
        Self {
            analyzer,
            analysis_timeout: None,
            max_in_flight: None,
        }
    }

    pub fn analysis_timeout(mut self, analysis_timeout: Duration) -> Self {
        self.analysis_timeout = Some(analysis_timeout);
        self
    }

    /// Caps concurrent analyses; callers wait in `poll_ready` beyond it.
    pub fn max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = Some(max_in_flight);
        self
    }

    pub fn build(self) -> BoxService<Frame, AnalysisReport, BoxError> {
        let service = ServiceBuilder::new()
            .option_layer(self.max_in_flight.map(ConcurrencyLimitLayer::new))
            .option_layer(self.analysis_timeout.map(TimeoutLayer::new))
            .map_err(|e: AnalyzerError| -> BoxError { Box::new(e) })
            .service(SkinAnalysisService::new(self.analyzer));

        BoxService::new(service)
    }
}
