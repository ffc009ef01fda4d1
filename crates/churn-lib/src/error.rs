//! Error types for the prediction pipeline
//!
//! Artifact problems never show up here: they are recovered at load time by
//! falling back to a default schema, an unfitted scaler or an untrained
//! classifier. These types cover what a single request can fail with.

use thiserror::Error;

/// A customer record that cannot enter the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Missing field, wrong JSON type or a non-object payload
    #[error("malformed customer record: {0}")]
    Malformed(String),

    #[error("field `{field}` must not be empty")]
    Empty { field: &'static str },

    #[error("field `{field}` is out of range: got {value}, expected {expected}")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: String,
    },

    #[error("field `gender` must be one of Male, Female, M or F, got {0:?}")]
    InvalidGender(String),
}

/// Failure raised by a fitted scaler's transform
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScalerError {
    #[error("scaler has not been fitted")]
    NotFitted,

    #[error("scaler expects {expected} columns, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },

    #[error("scaler column order {actual:?} does not match {expected:?}")]
    ColumnOrder {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("scaled value for `{column}` is not finite")]
    NonFinite { column: &'static str },
}

/// Failure while invoking the classifier
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error("feature vector has {actual} values, model expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("classifier runtime error: {0}")]
    Runtime(String),

    #[error("classifier returned {0}, expected a probability in [0, 1]")]
    InvalidOutput(f32),
}

/// Request-level prediction failure, reported in the result instead of raised
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    #[error("Model not loaded. Please check server logs.")]
    NotReady,

    #[error("Invalid customer record: {0}")]
    Validation(#[from] ValidationError),

    #[error("Prediction failed: {0}")]
    Inference(#[from] InferenceError),
}

impl PredictError {
    /// Stable machine-readable category, used for HTTP mapping and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::NotReady => "not_ready",
            PredictError::Validation(_) => "validation_error",
            PredictError::Inference(_) => "inference_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_distinct() {
        let kinds = [
            PredictError::NotReady.kind(),
            PredictError::from(ValidationError::Empty { field: "name" }).kind(),
            PredictError::from(InferenceError::Runtime("boom".into())).kind(),
        ];
        assert_eq!(kinds, ["not_ready", "validation_error", "inference_error"]);
    }

    #[test]
    fn test_messages_carry_cause() {
        let err = PredictError::from(InferenceError::ShapeMismatch {
            expected: 17,
            actual: 12,
        });
        let message = err.to_string();
        assert!(message.starts_with("Prediction failed"));
        assert!(message.contains("17"));
        assert!(message.contains("12"));
    }
}
