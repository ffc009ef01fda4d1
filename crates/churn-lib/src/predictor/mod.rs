//! Prediction pipeline: schema, scaler, encoder, classifier and decision rules

mod decision;
mod features;
mod inference;
mod scaler;
mod schema;

pub use decision::{
    decide, to_percentage, Decision, CHURN_THRESHOLD, HIGH_RISK_THRESHOLD, MEDIUM_RISK_THRESHOLD,
};
pub use features::{Category, Degradation, EncodedFeatures, FeatureEncoder};
pub use inference::{
    FallbackClassifier, InferenceGateway, InferenceStats, OnnxClassifier, FALLBACK_SEED,
};
pub use scaler::{
    resolve_scaler, FeatureScaler, ScalerResolution, StandardScaler, NUM_SCALED, SCALED_COLUMNS,
};
pub use schema::{
    columns, province_column, provider_column, resolve_schema, FeatureSchema, SchemaError,
    SchemaResolution, PROVIDER_PREFIX, PROVINCE_PREFIX, RAW_COLUMNS,
};

use crate::models::FeatureVector;
use anyhow::Result;
use serde::Serialize;

/// Which kind of classifier is serving predictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    /// Loaded from a trained ONNX artifact
    Trained,
    /// Untrained, deterministically seeded network
    Fallback,
}

impl ClassifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassifierKind::Trained => "trained",
            ClassifierKind::Fallback => "fallback",
        }
    }
}

/// Trait for classifier implementations
pub trait Classifier: Send + Sync {
    /// Probability of churn for one feature vector
    fn predict_proba(&self, features: &FeatureVector) -> Result<f32>;

    /// Number of features the classifier expects
    fn input_width(&self) -> usize;

    fn kind(&self) -> ClassifierKind;
}
