//! Model artifact bundle: file locations, loading and provenance
//!
//! The bundle is three independent files. Each one is optional; a missing
//! or corrupt file triggers the fallback for that artifact only.

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Default classifier file name inside the model directory
pub const MODEL_FILE: &str = "churn_model.onnx";

/// Default scaler file name inside the model directory
pub const SCALER_FILE: &str = "scaler.json";

/// Default schema file name inside the model directory
pub const SCHEMA_FILE: &str = "train_columns.json";

/// Locations of the three artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: PathBuf,
    pub schema: PathBuf,
}

impl ArtifactPaths {
    /// Use the default file names inside `dir`
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            model: dir.join(MODEL_FILE),
            scaler: dir.join(SCALER_FILE),
            schema: dir.join(SCHEMA_FILE),
        }
    }

    pub fn with_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.model = path.into();
        self
    }

    pub fn with_scaler(mut self, path: impl Into<PathBuf>) -> Self {
        self.scaler = path.into();
        self
    }

    pub fn with_schema(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema = path.into();
        self
    }
}

/// Where a piece of service state came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ArtifactSource {
    /// Read from disk; `sha256` fingerprints the file contents
    Loaded { path: PathBuf, sha256: String },
    /// Substituted after a load failure
    Fallback { reason: String },
    /// Supplied directly by the caller
    Provided,
}

impl ArtifactSource {
    pub fn fallback(reason: impl Into<String>) -> Self {
        ArtifactSource::Fallback {
            reason: reason.into(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ArtifactSource::Fallback { .. })
    }

    pub fn checksum(&self) -> Option<&str> {
        match self {
            ArtifactSource::Loaded { sha256, .. } => Some(sha256),
            _ => None,
        }
    }
}

/// Raw artifact contents together with their provenance
#[derive(Debug)]
pub struct ArtifactBytes {
    pub bytes: Vec<u8>,
    pub source: ArtifactSource,
}

/// Read an artifact file and fingerprint it
pub fn read_artifact(path: &Path) -> Result<ArtifactBytes> {
    if !path.exists() {
        anyhow::bail!("artifact not found at {}", path.display());
    }

    let bytes = fs::read(path).with_context(|| format!("Failed to read artifact {:?}", path))?;
    let sha256 = compute_checksum(&bytes);

    Ok(ArtifactBytes {
        bytes,
        source: ArtifactSource::Loaded {
            path: path.to_path_buf(),
            sha256,
        },
    })
}

/// SHA-256 of `data` as lowercase hex
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
