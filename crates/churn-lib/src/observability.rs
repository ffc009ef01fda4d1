//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, outcomes, degradations, model info)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter_vec, register_int_gauge,
    GaugeVec, Histogram, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

const BATCH_SIZE_BUCKETS: &[f64] = &[1.0, 5.0, 10.0, 50.0, 100.0, 250.0, 500.0, 1000.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    prediction_errors_total: IntCounterVec,
    encoding_degradations_total: IntCounterVec,
    batch_size: Histogram,
    model_info: GaugeVec,
    schema_columns: IntGauge,
    model_loaded: IntGauge,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "churn_service_prediction_latency_seconds",
                "Time spent encoding, running inference and applying decision rules",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "churn_service_predictions_total",
                "Successful predictions by churn status",
                &["status"]
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter_vec!(
                "churn_service_prediction_errors_total",
                "Failed predictions by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors_total"),

            encoding_degradations_total: register_int_counter_vec!(
                "churn_service_encoding_degradations_total",
                "Records encoded with reduced fidelity, by degradation kind",
                &["kind"]
            )
            .expect("Failed to register encoding_degradations_total"),

            batch_size: register_histogram!(
                "churn_service_batch_size",
                "Number of records per batch request",
                BATCH_SIZE_BUCKETS.to_vec()
            )
            .expect("Failed to register batch_size"),

            model_info: register_gauge_vec!(
                "churn_service_model_info",
                "Information about the classifier serving predictions",
                &["classifier", "checksum"]
            )
            .expect("Failed to register model_info"),

            schema_columns: register_int_gauge!(
                "churn_service_schema_columns",
                "Number of columns in the resolved feature schema"
            )
            .expect("Failed to register schema_columns"),

            model_loaded: register_int_gauge!(
                "churn_service_model_loaded",
                "1 once the service has finished initialization"
            )
            .expect("Failed to register model_loaded"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self, status: &str) {
        self.inner()
            .predictions_total
            .with_label_values(&[status])
            .inc();
    }

    pub fn inc_prediction_errors(&self, kind: &str) {
        self.inner()
            .prediction_errors_total
            .with_label_values(&[kind])
            .inc();
    }

    pub fn inc_degradations(&self, kind: &str) {
        self.inner()
            .encoding_degradations_total
            .with_label_values(&[kind])
            .inc();
    }

    pub fn observe_batch_size(&self, size: usize) {
        self.inner().batch_size.observe(size as f64);
    }

    /// Replace the model info series; an unfingerprinted classifier reports "none"
    pub fn set_model_info(&self, classifier: &str, checksum: Option<&str>) {
        self.inner().model_info.reset();
        self.inner()
            .model_info
            .with_label_values(&[classifier, checksum.unwrap_or("none")])
            .set(1.0);
    }

    pub fn set_schema_columns(&self, count: usize) {
        self.inner().schema_columns.set(count as i64);
    }

    pub fn set_model_loaded(&self, loaded: bool) {
        self.inner().model_loaded.set(i64::from(loaded));
    }
}

/// Structured logger for service events
///
/// Provides consistent JSON-formatted logging for predictions, artifact
/// fallbacks and lifecycle events.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    service_name: String,
}

impl StructuredLogger {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Log service initialization
    pub fn log_startup(
        &self,
        version: &str,
        classifier: &str,
        model_checksum: Option<&str>,
        schema_columns: usize,
        scaler_fitted: bool,
    ) {
        info!(
            event = "service_started",
            service = %self.service_name,
            version = %version,
            classifier = %classifier,
            model_checksum = ?model_checksum,
            schema_columns = schema_columns,
            scaler_fitted = scaler_fitted,
            "Churn prediction service initialized"
        );
    }

    /// Log an artifact replaced by its fallback
    pub fn log_artifact_fallback(&self, artifact: &str, reason: &str) {
        warn!(
            event = "artifact_fallback",
            service = %self.service_name,
            artifact = %artifact,
            reason = %reason,
            "Artifact unavailable, running on fallback"
        );
    }

    pub fn log_prediction(
        &self,
        customer_name: &str,
        status: &str,
        probability_percent: f64,
        risk_level: &str,
        classifier: &str,
    ) {
        info!(
            event = "prediction_generated",
            service = %self.service_name,
            customer = %customer_name,
            status = %status,
            probability_percent = probability_percent,
            risk_level = %risk_level,
            classifier = %classifier,
            "Generated churn prediction"
        );
    }

    pub fn log_prediction_failed(&self, customer_name: &str, kind: &str, error: &str) {
        warn!(
            event = "prediction_failed",
            service = %self.service_name,
            customer = %customer_name,
            kind = %kind,
            error = %error,
            "Prediction failed"
        );
    }

    pub fn log_encoding_degraded(&self, customer_name: &str, kind: &str, detail: &str) {
        warn!(
            event = "encoding_degraded",
            service = %self.service_name,
            customer = %customer_name,
            kind = %kind,
            detail = %detail,
            "Record encoded with reduced fidelity"
        );
    }

    pub fn log_batch(&self, total: usize, succeeded: usize, failed: usize, elapsed_ms: u128) {
        info!(
            event = "batch_completed",
            service = %self.service_name,
            total = total,
            succeeded = succeeded,
            failed = failed,
            elapsed_ms = elapsed_ms as u64,
            "Batch prediction completed"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service_name,
            reason = %reason,
            "Churn prediction service shutting down"
        );
    }
}
