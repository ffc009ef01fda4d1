//! API client for communicating with the churn prediction server

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// API client for the churn prediction server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        // A trailing slash keeps any path prefix when joining routes
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.detail)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }
}

// API response types

/// One prediction outcome, successful or not
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub success: bool,
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub churn_prediction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub churn_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    pub total: usize,
    pub predictions: Vec<PredictionResponse>,
}

/// Body of `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootStatus {
    pub status: String,
    pub model_loaded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
    #[serde(default)]
    pub components: HashMap<String, ComponentInfo>,
}

/// Body of `GET /info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiInfo {
    pub api_name: String,
    pub version: String,
    pub model_loaded: bool,
    #[serde(default)]
    pub classifier: Option<String>,
    #[serde(default)]
    pub model_checksum: Option<String>,
    #[serde(default)]
    pub schema_columns: Option<usize>,
    #[serde(default)]
    pub provinces: Vec<String>,
    #[serde(default)]
    pub providers: Vec<String>,
    #[serde(default)]
    pub inference: Option<InferenceInfo>,
}

/// Inference counters since server start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceInfo {
    pub total_inferences: u64,
    pub slow_inferences: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_post_parses_prediction() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/predict")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "success": true,
                    "customer_name": "Ram",
                    "churn_prediction": "CHURN",
                    "churn_probability": 72.5,
                    "risk_level": "HIGH",
                    "recommendations": ["Consider affordable plans to reduce churn"]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let response: PredictionResponse =
            client.post("predict", &json!({"name": "Ram"})).await.unwrap();

        mock.assert_async().await;
        assert!(response.success);
        assert_eq!(response.churn_prediction.as_deref(), Some("CHURN"));
        assert_eq!(response.churn_probability, Some(72.5));
        assert_eq!(response.recommendations.len(), 1);
    }

    #[tokio::test]
    async fn test_error_detail_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predict")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail": "field `age` is out of range", "type": "validation_error"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .post::<PredictionResponse, _>("predict", &json!({}))
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("400"));
        assert!(message.contains("field `age` is out of range"));
    }

    #[tokio::test]
    async fn test_base_path_is_preserved() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/churn/info")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "api_name": "Nepal Telco Churn Prediction API",
                    "version": "1.0.0",
                    "model_loaded": false
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(&format!("{}/churn", server.url())).unwrap();
        let info: ApiInfo = client.get("info").await.unwrap();

        mock.assert_async().await;
        assert!(!info.model_loaded);
        assert!(info.classifier.is_none());
        assert!(info.inference.is_none());
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(ApiClient::new("not a url").is_err());
    }

    #[test]
    fn test_failed_prediction_deserializes() {
        let response: PredictionResponse = serde_json::from_value(json!({
            "success": false,
            "customer_name": "Unknown",
            "error": "Invalid customer record: malformed customer record: missing field `age`",
            "error_kind": "validation_error"
        }))
        .unwrap();
        assert!(!response.success);
        assert!(response.recommendations.is_empty());
        assert_eq!(response.error_kind.as_deref(), Some("validation_error"));
    }
}
