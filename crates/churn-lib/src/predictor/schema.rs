//! Feature schema resolution
//!
//! The classifier is trained against a fixed, ordered list of columns. The
//! schema is read from the artifact bundle when present and falls back to
//! the default layout otherwise. Resolution never fails.

use crate::artifacts::{read_artifact, ArtifactSource};
use crate::models::{Province, Provider};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Column name prefix for one-hot province slots
pub const PROVINCE_PREFIX: &str = "province_";

/// Column name prefix for one-hot provider slots
pub const PROVIDER_PREFIX: &str = "provider_nepal_";

/// Raw column names
pub mod columns {
    pub const GENDER: &str = "gender";
    pub const AGE: &str = "age";
    pub const NUM_DEPENDENTS: &str = "num_dependents";
    pub const ESTIMATED_SALARY: &str = "estimated_salary";
    pub const CALLS_MADE: &str = "calls_made";
    pub const SMS_SENT: &str = "sms_sent";
    pub const DATA_USED: &str = "data_used";
    pub const TENURE_MONTHS: &str = "tenure_months";
}

/// Raw columns at the head of the default layout, in order
pub const RAW_COLUMNS: [&str; 8] = [
    columns::GENDER,
    columns::AGE,
    columns::NUM_DEPENDENTS,
    columns::ESTIMATED_SALARY,
    columns::CALLS_MADE,
    columns::SMS_SENT,
    columns::DATA_USED,
    columns::TENURE_MONTHS,
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("feature schema has no columns")]
    Empty,

    #[error("feature schema lists column `{0}` more than once")]
    DuplicateColumn(String),
}

/// Ordered, immutable column names shared by every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    columns: Arc<[String]>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Result<Self, SchemaError> {
        if columns.is_empty() {
            return Err(SchemaError::Empty);
        }
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(SchemaError::DuplicateColumn(column.clone()));
            }
        }
        Ok(Self {
            columns: columns.into(),
        })
    }

    /// 8 raw columns, then one slot per province, then one per provider
    pub fn default_layout() -> Self {
        let columns = RAW_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(Province::KNOWN.iter().map(province_column))
            .chain(Provider::KNOWN.iter().map(provider_column))
            .collect();
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}

/// Schema column for a province value
pub fn province_column(province: &Province) -> String {
    format!("{}{}", PROVINCE_PREFIX, province.name())
}

/// Schema column for a provider value; spaces become underscores
pub fn provider_column(provider: &Provider) -> String {
    format!("{}{}", PROVIDER_PREFIX, provider.name().replace(' ', "_"))
}

/// A resolved schema and where it came from
#[derive(Debug, Clone)]
pub struct SchemaResolution {
    pub schema: FeatureSchema,
    pub source: ArtifactSource,
}

/// Load the persisted schema at `path`, or fall back to the default layout
pub fn resolve_schema(path: &Path) -> SchemaResolution {
    match load_schema(path) {
        Ok(resolution) => {
            info!(
                path = %path.display(),
                columns = resolution.schema.len(),
                "Feature schema loaded"
            );
            resolution
        }
        Err(e) => {
            let reason = format!("{:#}", e);
            warn!(path = %path.display(), error = %reason, "Using default feature schema");
            SchemaResolution {
                schema: FeatureSchema::default_layout(),
                source: ArtifactSource::fallback(reason),
            }
        }
    }
}

fn load_schema(path: &Path) -> Result<SchemaResolution> {
    let artifact = read_artifact(path)?;
    let columns: Vec<String> =
        serde_json::from_slice(&artifact.bytes).context("Failed to parse feature schema")?;
    let schema = FeatureSchema::new(columns)?;
    Ok(SchemaResolution {
        schema,
        source: artifact.source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_layout() {
        let schema = FeatureSchema::default_layout();
        assert_eq!(schema.len(), 17);
        assert_eq!(&schema.columns()[..8], &RAW_COLUMNS.map(String::from));
        assert_eq!(schema.columns()[8], "province_Bagmati");
        assert_eq!(schema.columns()[14], "province_Sudurpashchim");
        assert_eq!(schema.columns()[15], "provider_nepal_Ncell");
        assert_eq!(schema.columns()[16], "provider_nepal_Nepal_Telecom");
    }

    #[test]
    fn test_rejects_empty_and_duplicates() {
        assert_eq!(FeatureSchema::new(vec![]), Err(SchemaError::Empty));
        assert_eq!(
            FeatureSchema::new(vec!["age".into(), "age".into()]),
            Err(SchemaError::DuplicateColumn("age".into()))
        );
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let resolution = resolve_schema(&dir.path().join("train_columns.json"));
        assert_eq!(resolution.schema, FeatureSchema::default_layout());
        assert!(resolution.source.is_fallback());
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("train_columns.json");
        std::fs::write(&path, "{not json").unwrap();

        let resolution = resolve_schema(&path);
        assert_eq!(resolution.schema.len(), 17);
        assert!(resolution.source.is_fallback());
    }

    #[test]
    fn test_empty_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("train_columns.json");
        std::fs::write(&path, "[]").unwrap();

        let resolution = resolve_schema(&path);
        assert_eq!(resolution.schema, FeatureSchema::default_layout());
        match resolution.source {
            ArtifactSource::Fallback { reason } => assert!(reason.contains("no columns")),
            other => panic!("expected fallback, got {:?}", other),
        }
    }

    #[test]
    fn test_persisted_schema_keeps_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("train_columns.json");
        std::fs::write(&path, r#"["tenure_months", "age", "province_Koshi"]"#).unwrap();

        let resolution = resolve_schema(&path);
        assert!(!resolution.source.is_fallback());
        assert_eq!(
            resolution.schema.columns(),
            &["tenure_months", "age", "province_Koshi"]
        );
        assert_eq!(resolution.schema.position("age"), Some(1));
        assert!(resolution.source.checksum().is_some());
    }
}
