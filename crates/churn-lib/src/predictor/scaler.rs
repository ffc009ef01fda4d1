//! Standard scaling of the numeric feature columns
//!
//! The scaler is fitted offline and exported as JSON (`mean`, `scale` and an
//! optional `columns` list). When it cannot be loaded the service runs with
//! an unfitted scaler whose transform always fails, and the encoder keeps
//! raw values.

use super::schema::columns;
use crate::artifacts::{read_artifact, ArtifactSource};
use crate::error::ScalerError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Columns passed through the scaler, in the order it was fitted on
pub const SCALED_COLUMNS: [&str; 7] = [
    columns::AGE,
    columns::ESTIMATED_SALARY,
    columns::CALLS_MADE,
    columns::SMS_SENT,
    columns::DATA_USED,
    columns::TENURE_MONTHS,
    columns::NUM_DEPENDENTS,
];

/// Number of scaled columns
pub const NUM_SCALED: usize = SCALED_COLUMNS.len();

/// Per-column standardization `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    columns: Option<Vec<String>>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ScalerError> {
        Self {
            columns: None,
            mean,
            scale,
        }
        .validated()
    }

    /// Check widths and column order; zero scales become 1 like sklearn does
    fn validated(mut self) -> Result<Self, ScalerError> {
        for values in [&self.mean, &self.scale] {
            if values.len() != NUM_SCALED {
                return Err(ScalerError::WidthMismatch {
                    expected: NUM_SCALED,
                    actual: values.len(),
                });
            }
        }

        if let Some(columns) = &self.columns {
            if columns.iter().map(String::as_str).ne(SCALED_COLUMNS) {
                return Err(ScalerError::ColumnOrder {
                    expected: SCALED_COLUMNS.map(String::from).to_vec(),
                    actual: columns.clone(),
                });
            }
        }

        for s in &mut self.scale {
            if *s == 0.0 {
                *s = 1.0;
            }
        }
        Ok(self)
    }

    pub fn transform(&self, values: &[f64; NUM_SCALED]) -> Result<[f64; NUM_SCALED], ScalerError> {
        let mut out = [0.0; NUM_SCALED];
        for (i, column) in SCALED_COLUMNS.iter().enumerate() {
            let scaled = (values[i] - self.mean[i]) / self.scale[i];
            if !(scaled as f32).is_finite() {
                return Err(ScalerError::NonFinite { column });
            }
            out[i] = scaled;
        }
        Ok(out)
    }
}

/// Fitted scaler or the fresh one used when loading failed
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureScaler {
    Fitted(StandardScaler),
    Unfitted,
}

impl FeatureScaler {
    pub fn is_fitted(&self) -> bool {
        matches!(self, FeatureScaler::Fitted(_))
    }

    pub fn transform(&self, values: &[f64; NUM_SCALED]) -> Result<[f64; NUM_SCALED], ScalerError> {
        match self {
            FeatureScaler::Fitted(scaler) => scaler.transform(values),
            FeatureScaler::Unfitted => Err(ScalerError::NotFitted),
        }
    }
}

/// A resolved scaler and where it came from
#[derive(Debug, Clone)]
pub struct ScalerResolution {
    pub scaler: FeatureScaler,
    pub source: ArtifactSource,
}

/// Load the fitted scaler at `path`, or fall back to an unfitted one
pub fn resolve_scaler(path: &Path) -> ScalerResolution {
    match load_scaler(path) {
        Ok(resolution) => {
            info!(path = %path.display(), "Scaler loaded");
            resolution
        }
        Err(e) => {
            let reason = format!("{:#}", e);
            warn!(path = %path.display(), error = %reason, "Scaler unavailable, numeric features stay unscaled");
            ScalerResolution {
                scaler: FeatureScaler::Unfitted,
                source: ArtifactSource::fallback(reason),
            }
        }
    }
}

fn load_scaler(path: &Path) -> Result<ScalerResolution> {
    let artifact = read_artifact(path)?;
    let scaler: StandardScaler =
        serde_json::from_slice(&artifact.bytes).context("Failed to parse scaler")?;
    let scaler = scaler.validated().context("Invalid scaler parameters")?;
    Ok(ScalerResolution {
        scaler: FeatureScaler::Fitted(scaler),
        source: artifact.source,
    })
}
