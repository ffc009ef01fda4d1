//! Integration tests for the churn API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use churn_lib::{ArtifactPaths, ChurnService};
use churn_server::api::{create_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const MAX_BATCH: usize = 3;

fn customer(name: &str) -> Value {
    json!({
        "name": name,
        "gender": "Male",
        "age": 41,
        "num_dependents": 2,
        "estimated_salary": 52000.0,
        "calls_made": 35,
        "sms_sent": 20,
        "data_used": 900.0,
        "tenure_months": 18,
        "province": "Gandaki",
        "provider": "Nepal Telecom"
    })
}

/// App over an empty model directory, optionally initialized
async fn setup_test_app(initialize: bool) -> (Router, Arc<ChurnService>, TempDir) {
    let dir = TempDir::new().unwrap();
    let service = Arc::new(ChurnService::new(ArtifactPaths::from_dir(dir.path())));
    if initialize {
        service.initialize().await;
    }
    let state = Arc::new(AppState::new(Arc::clone(&service), MAX_BATCH));
    (create_router(state), service, dir)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read(response).await
}

async fn post(app: Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read(response).await
}

async fn post_raw(app: Router, uri: &str, content_type: &str, body: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", content_type)
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read(response).await
}

async fn read(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_root_reports_loading_state() {
    let (app, _service, _dir) = setup_test_app(false).await;
    let (status, body) = get(app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_loaded"], false);

    let (app, _service, _dir) = setup_test_app(true).await;
    let (_, body) = get(app, "/").await;
    assert_eq!(body["model_loaded"], true);
}

#[tokio::test]
async fn test_health_returns_503_before_initialization() {
    let (app, _service, _dir) = setup_test_app(false).await;
    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["type"], "not_ready");
}

#[tokio::test]
async fn test_health_is_degraded_on_fallback_artifacts() {
    let (app, _service, _dir) = setup_test_app(true).await;
    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["components"]["classifier"]["status"], "degraded");
}

#[tokio::test]
async fn test_healthz_returns_ok_when_degraded() {
    let (app, _service, _dir) = setup_test_app(true).await;
    let (status, body) = get(app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn test_readyz_follows_initialization() {
    let (app, service, _dir) = setup_test_app(false).await;
    let (status, body) = get(app.clone(), "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);

    service.initialize().await;
    let (status, body) = get(app, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
}

#[tokio::test]
async fn test_predict_returns_prediction() {
    let (app, _service, _dir) = setup_test_app(true).await;
    let (status, body) = post(app, "/predict", &customer("Hari")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["customer_name"], "Hari");
    assert!(["CHURN", "RETAIN"].contains(&body["churn_prediction"].as_str().unwrap()));
    assert!(["LOW", "MEDIUM", "HIGH"].contains(&body["risk_level"].as_str().unwrap()));
    let probability = body["churn_probability"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&probability));
    assert!(body["recommendations"].is_array());
}

#[tokio::test]
async fn test_predict_before_initialization_is_503() {
    let (app, _service, _dir) = setup_test_app(false).await;
    let (status, body) = post(app, "/predict", &customer("Hari")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["type"], "not_ready");
    assert_eq!(body["detail"], "Model not loaded. Please check server logs.");
}

#[tokio::test]
async fn test_predict_invalid_record_is_400() {
    let (app, _service, _dir) = setup_test_app(true).await;
    let mut record = customer("Hari");
    record["age"] = json!(12);

    let (status, body) = post(app, "/predict", &record).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["type"], "validation_error");
    assert!(body["detail"].as_str().unwrap().contains("age"));
}

#[tokio::test]
async fn test_predict_truncated_body_is_structured_400() {
    let (app, _service, _dir) = setup_test_app(true).await;
    let (status, body) = post_raw(app, "/predict", "application/json", r#"{"name": "#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["type"], "validation_error");
    assert!(body["detail"].as_str().unwrap().contains("JSON"));
}

#[tokio::test]
async fn test_predict_wrong_content_type_is_structured() {
    let (app, _service, _dir) = setup_test_app(true).await;
    let (status, body) = post_raw(
        app,
        "/predict",
        "text/plain",
        &customer("Hari").to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["type"], "validation_error");
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_batch_predict_truncated_body_is_structured_400() {
    let (app, _service, _dir) = setup_test_app(true).await;
    let (status, body) = post_raw(app, "/batch-predict", "application/json", "[{").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["type"], "validation_error");
}

#[tokio::test]
async fn test_batch_predict_mixed_items() {
    let (app, _service, _dir) = setup_test_app(true).await;
    let mut broken = customer("Maya");
    broken.as_object_mut().unwrap().remove("province");

    let (status, body) = post(app, "/batch-predict", &json!([customer("Hari"), broken])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);

    let predictions = body["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 2);
    assert_eq!(predictions[0]["success"], true);
    assert_eq!(predictions[1]["success"], false);
    assert_eq!(predictions[1]["customer_name"], "Maya");
    assert_eq!(predictions[1]["error_kind"], "validation_error");
}

#[tokio::test]
async fn test_batch_predict_over_limit_is_400() {
    let (app, _service, _dir) = setup_test_app(true).await;
    let records: Vec<Value> = (0..=MAX_BATCH).map(|i| customer(&format!("c{}", i))).collect();

    let (status, body) = post(app, "/batch-predict", &json!(records)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["type"], "validation_error");
}

#[tokio::test]
async fn test_batch_predict_requires_array() {
    let (app, _service, _dir) = setup_test_app(true).await;
    let (status, _) = post(app, "/batch-predict", &customer("Hari")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_batch_predict_before_initialization_is_503() {
    let (app, _service, _dir) = setup_test_app(false).await;
    let (status, body) = post(app, "/batch-predict", &json!([customer("Hari")])).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["type"], "not_ready");
}

#[tokio::test]
async fn test_info_describes_model() {
    let (app, _service, _dir) = setup_test_app(true).await;
    let (status, body) = get(app, "/info").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["classifier"], "fallback");
    assert_eq!(body["model_checksum"], Value::Null);
    assert_eq!(body["schema_columns"], 17);
    assert_eq!(body["features"]["max_batch_size"], MAX_BATCH);
    assert_eq!(body["provinces"].as_array().unwrap().len(), 7);
    assert_eq!(body["providers"], json!(["Ncell", "Nepal Telecom"]));
    assert_eq!(body["inference"]["total_inferences"], 0);
}

#[tokio::test]
async fn test_info_counts_inferences() {
    let (app, _service, _dir) = setup_test_app(true).await;
    let _ = post(app.clone(), "/predict", &customer("Hari")).await;
    let _ = post(app.clone(), "/predict", &customer("Maya")).await;

    let (_, body) = get(app, "/info").await;
    assert_eq!(body["inference"]["total_inferences"], 2);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, _service, _dir) = setup_test_app(true).await;
    let _ = post(app.clone(), "/predict", &customer("Hari")).await;

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("churn_service_predictions_total"));
    assert!(text.contains("churn_service_model_loaded"));
}
