//! Core library for telecom customer churn prediction
//!
//! This crate provides the core functionality for:
//! - Validating customer records
//! - Encoding records against the model's feature schema
//! - Classifier inference with a deterministic fallback
//! - Churn decisions, risk tiers and recommendations
//! - Health checks and observability

pub mod artifacts;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod service;

pub use artifacts::{ArtifactPaths, ArtifactSource};
pub use error::{InferenceError, PredictError, ScalerError, ValidationError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::ClassifierKind;
pub use service::{ChurnService, ServiceState};
