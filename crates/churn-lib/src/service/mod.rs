//! Service facade
//!
//! Owns the load-once lifecycle and the per-request contract: every call
//! returns a `PredictionResult`, failures included, and nothing a single
//! request does can make the service unusable for the next one.

mod state;


pub use state::{Evaluation, Provenance, ServiceState};

use crate::artifacts::{ArtifactPaths, ArtifactSource};
use crate::error::PredictError;
use crate::health::{components, HealthRegistry};
use crate::models::{BatchPrediction, CustomerRecord, PredictionResult, UNKNOWN_CUSTOMER};
use crate::observability::{ServiceMetrics, StructuredLogger};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{debug, error};

/// Name reported in structured logs
pub const SERVICE_NAME: &str = "churn-service";

/// Churn prediction service
///
/// Construct one per process and share it behind an `Arc`. Predictions are
/// refused with `PredictError::NotReady` until `initialize` has completed.
pub struct ChurnService {
    paths: Option<ArtifactPaths>,
    state: OnceCell<Arc<ServiceState>>,
    init_runs: AtomicUsize,
    health: HealthRegistry,
    metrics: ServiceMetrics,
    logger: StructuredLogger,
}

impl ChurnService {
    /// Service that will load its artifacts from `paths` on `initialize`
    pub fn new(paths: ArtifactPaths) -> Self {
        Self::build(Some(paths), OnceCell::new())
    }

    /// Service that is ready immediately with the given state
    pub async fn with_state(state: ServiceState) -> Self {
        let state = Arc::new(state);
        let service = Self::build(None, OnceCell::new_with(Some(Arc::clone(&state))));
        service.publish(&state).await;
        service
    }

    fn build(paths: Option<ArtifactPaths>, state: OnceCell<Arc<ServiceState>>) -> Self {
        Self {
            paths,
            state,
            init_runs: AtomicUsize::new(0),
            health: HealthRegistry::new(),
            metrics: ServiceMetrics::new(),
            logger: StructuredLogger::new(SERVICE_NAME),
        }
    }

    /// Load the artifact bundle once. Concurrent callers wait on the same
    /// load; later callers get the existing state.
    pub async fn initialize(&self) -> Arc<ServiceState> {
        let paths = self.paths.clone();
        self.initialize_with(move || match paths {
            Some(paths) => ServiceState::load(&paths),
            None => ServiceState::fallback("no artifact paths configured"),
        })
        .await
    }

    /// Runs `loader` on the blocking pool. A loader that panics leaves the
    /// service serving the fallback state with the classifier unhealthy.
    async fn initialize_with<F>(&self, loader: F) -> Arc<ServiceState>
    where
        F: FnOnce() -> ServiceState + Send + 'static,
    {
        let state = self
            .state
            .get_or_init(|| async move {
                self.init_runs.fetch_add(1, Ordering::SeqCst);

                // Parsing and optimizing the model is CPU-bound
                let (state, failure) = match tokio::task::spawn_blocking(loader).await {
                    Ok(state) => (state, None),
                    Err(e) => {
                        error!(error = %e, "Artifact loading task failed");
                        let reason = format!("artifact loading task failed: {}", e);
                        (ServiceState::fallback(reason.clone()), Some(reason))
                    }
                };

                let state = Arc::new(state);
                self.publish(&state).await;
                if let Some(reason) = failure {
                    self.health
                        .set_unhealthy(components::CLASSIFIER, reason)
                        .await;
                }
                state
            })
            .await;
        Arc::clone(state)
    }

    /// Report a freshly installed state to health, metrics and logs
    async fn publish(&self, state: &ServiceState) {
        let provenance = state.provenance();
        self.health
            .record_artifact(components::SCHEMA, &provenance.schema)
            .await;
        self.health
            .record_artifact(components::SCALER, &provenance.scaler)
            .await;
        self.health
            .record_artifact(components::CLASSIFIER, &provenance.classifier)
            .await;
        self.health.set_ready(true).await;

        for (artifact, source) in provenance.entries() {
            if let ArtifactSource::Fallback { reason } = source {
                self.logger.log_artifact_fallback(artifact, reason);
            }
        }

        let kind = state.classifier_kind();
        self.metrics.set_model_info(kind.as_str(), state.model_checksum());
        self.metrics.set_schema_columns(state.schema().len());
        self.metrics.set_model_loaded(true);
        self.logger.log_startup(
            env!("CARGO_PKG_VERSION"),
            kind.as_str(),
            state.model_checksum(),
            state.schema().len(),
            state.scaler().is_fitted(),
        );
    }

    /// The `model_loaded` flag
    pub fn is_ready(&self) -> bool {
        self.state.initialized()
    }

    pub fn state(&self) -> Option<Arc<ServiceState>> {
        self.state.get().cloned()
    }

    /// How many times the artifact load sequence has run
    pub fn initialization_count(&self) -> usize {
        self.init_runs.load(Ordering::SeqCst)
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    /// Predict for a validated record
    pub fn predict(&self, record: &CustomerRecord) -> PredictionResult {
        let Some(state) = self.state.get() else {
            return self.fail(&record.name, PredictError::NotReady);
        };

        let start = Instant::now();
        match state.evaluate(record) {
            Ok(evaluation) => {
                for degradation in &evaluation.degradations {
                    self.metrics.inc_degradations(degradation.kind());
                    self.logger.log_encoding_degraded(
                        &record.name,
                        degradation.kind(),
                        &degradation.to_string(),
                    );
                }

                let prediction = evaluation.prediction;
                self.metrics
                    .observe_prediction_latency(start.elapsed().as_secs_f64());
                self.metrics
                    .inc_predictions(&prediction.churn_prediction.as_str().to_lowercase());
                self.logger.log_prediction(
                    &prediction.customer_name,
                    prediction.churn_prediction.as_str(),
                    prediction.churn_probability,
                    prediction.risk_level.as_str(),
                    state.classifier_kind().as_str(),
                );
                PredictionResult::Success(prediction)
            }
            Err(e) => self.fail(&record.name, e.into()),
        }
    }

    /// Validate a raw JSON mapping, then predict. Unknown keys are ignored.
    pub fn predict_value(&self, value: &Value) -> PredictionResult {
        let name = customer_name(value);
        if !self.is_ready() {
            return self.fail(name, PredictError::NotReady);
        }

        match CustomerRecord::from_value(value) {
            Ok(record) => self.predict(&record),
            Err(e) => self.fail(name, e.into()),
        }
    }

    /// Predict every record independently; one failure never aborts the rest
    pub fn batch_predict(&self, values: &[Value]) -> BatchPrediction {
        let start = Instant::now();
        let predictions: Vec<PredictionResult> =
            values.iter().map(|value| self.predict_value(value)).collect();

        let batch = BatchPrediction {
            total: values.len(),
            predictions,
        };
        self.metrics.observe_batch_size(batch.total);
        self.logger.log_batch(
            batch.total,
            batch.succeeded(),
            batch.failed(),
            start.elapsed().as_millis(),
        );
        batch
    }

    fn fail(&self, customer_name: &str, error: PredictError) -> PredictionResult {
        self.metrics.inc_prediction_errors(error.kind());
        match &error {
            PredictError::NotReady => {
                debug!(customer = %customer_name, "Prediction requested before initialization")
            }
            _ => self
                .logger
                .log_prediction_failed(customer_name, error.kind(), &error.to_string()),
        }
        PredictionResult::failure(customer_name, error)
    }
}

/// Trimmed `name` from a raw mapping, or the unknown-customer sentinel
fn customer_name(value: &Value) -> &str {
    value
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_CUSTOMER)
}
