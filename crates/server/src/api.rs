//! HTTP API for churn predictions, health checks and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use churn_lib::{
    health::ComponentStatus, BatchPrediction, ChurnService, PredictError, PredictionResult,
    Province, Provider,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

pub const API_NAME: &str = "Nepal Telco Churn Prediction API";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ChurnService>,
    pub max_batch_size: usize,
}

impl AppState {
    pub fn new(service: Arc<ChurnService>, max_batch_size: usize) -> Self {
        Self {
            service,
            max_batch_size,
        }
    }
}

/// Error body `{detail, type}` with its status code
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
    kind: &'static str,
}

impl ApiError {
    fn new(status: StatusCode, kind: &'static str, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
            kind,
        }
    }

    fn not_ready() -> Self {
        Self::from(&PredictError::NotReady)
    }
}

impl From<&PredictError> for ApiError {
    fn from(error: &PredictError) -> Self {
        let status = match error {
            PredictError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            PredictError::Validation(_) => StatusCode::BAD_REQUEST,
            PredictError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, error.kind(), error.to_string())
    }
}

/// Malformed bodies and wrong content types keep the `{detail, type}` shape
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), "validation_error", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "detail": self.detail, "type": self.kind })),
        )
            .into_response()
    }
}

#[derive(Debug, Serialize)]
struct RootResponse {
    status: &'static str,
    model_loaded: bool,
}

/// Liveness-style summary; always 200
async fn root(State(state): State<Arc<AppState>>) -> Json<RootResponse> {
    Json(RootResponse {
        status: "healthy",
        model_loaded: state.service.is_ready(),
    })
}

/// Detailed health: 503 until initialized, then healthy or degraded
async fn health(State(state): State<Arc<AppState>>) -> Response {
    if !state.service.is_ready() {
        return ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "not_ready",
            "Model service not initialized",
        )
        .into_response();
    }
    Json(state.service.health().health().await).into_response()
}

/// Health check response - returns 200 unless a component is unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.service.health().health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.service.health().readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let Json(payload) = payload?;
    let result = state.service.predict_value(&payload);
    match result.error() {
        Some(error) => Err(ApiError::from(error)),
        None => Ok(Json(result)),
    }
}

async fn batch_predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BatchPrediction>, ApiError> {
    if !state.service.is_ready() {
        return Err(ApiError::not_ready());
    }
    let Json(payload) = payload?;

    let Value::Array(records) = payload else {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "Request body must be a JSON array of customer records",
        ));
    };
    if records.len() > state.max_batch_size {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "validation_error",
            format!(
                "Batch of {} records exceeds the limit of {}",
                records.len(),
                state.max_batch_size
            ),
        ));
    }

    Ok(Json(state.service.batch_predict(&records)))
}

async fn info(State(state): State<Arc<AppState>>) -> Json<Value> {
    let service_state = state.service.state();
    let provinces: Vec<String> = Province::KNOWN.iter().map(Province::to_string).collect();
    let providers: Vec<String> = Provider::KNOWN.iter().map(Provider::to_string).collect();

    Json(json!({
        "api_name": API_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "model_loaded": state.service.is_ready(),
        "classifier": service_state.as_ref().map(|s| s.classifier_kind()),
        "model_checksum": service_state.as_ref().and_then(|s| s.model_checksum().map(str::to_string)),
        "schema_columns": service_state.as_ref().map(|s| s.schema().len()),
        "artifacts": service_state.as_ref().map(|s| s.provenance().clone()),
        "inference": service_state.as_ref().map(|s| s.gateway().stats()),
        "features": {
            "single_prediction": true,
            "batch_prediction": true,
            "health_check": true,
            "max_batch_size": state.max_batch_size,
        },
        "provinces": provinces,
        "providers": providers,
    }))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/predict", post(predict))
        .route("/batch-predict", post(batch_predict))
        .route("/info", get(info))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server on an already bound listener
pub async fn serve(listener: tokio::net::TcpListener, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = ?listener.local_addr().ok(), "Starting API server");
    axum::serve(listener, app).await?;

    Ok(())
}
