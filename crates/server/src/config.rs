//! Server configuration

use anyhow::{Context, Result};
use churn_lib::ArtifactPaths;
use serde::Deserialize;
use std::path::PathBuf;

/// Optional config file, looked up next to the working directory
const CONFIG_FILE: &str = "churn-server";

/// Environment variable prefix, e.g. `CHURN_PORT`
const ENV_PREFIX: &str = "CHURN";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the artifact bundle
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Per-artifact overrides of the files inside `model_dir`
    #[serde(default)]
    pub model_path: Option<PathBuf>,
    #[serde(default)]
    pub scaler_path: Option<PathBuf>,
    #[serde(default)]
    pub schema_path: Option<PathBuf>,

    /// Largest accepted batch request
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("model")
}

fn default_max_batch_size() -> usize {
    1000
}

fn default_log_format() -> LogFormat {
    LogFormat::Json
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            model_dir: default_model_dir(),
            model_path: None,
            scaler_path: None,
            schema_path: None,
            max_batch_size: default_max_batch_size(),
            log_format: default_log_format(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `churn-server.toml` (optional) and `CHURN_*`
    /// environment variables, the latter taking precedence
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("Failed to read configuration")?;
        Self::from_config(config)
    }

    pub fn from_config(config: config::Config) -> Result<Self> {
        let parsed: Self = config
            .try_deserialize()
            .context("Invalid server configuration")?;
        if parsed.max_batch_size == 0 {
            anyhow::bail!("max_batch_size must be at least 1");
        }
        Ok(parsed)
    }

    /// Artifact locations with per-file overrides applied
    pub fn artifact_paths(&self) -> ArtifactPaths {
        let mut paths = ArtifactPaths::from_dir(&self.model_dir);
        if let Some(model) = &self.model_path {
            paths = paths.with_model(model);
        }
        if let Some(scaler) = &self.scaler_path {
            paths = paths.with_scaler(scaler);
        }
        if let Some(schema) = &self.schema_path {
            paths = paths.with_schema(schema);
        }
        paths
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(overrides: &[(&str, &str)]) -> Result<ServerConfig> {
        let mut builder = config::Config::builder();
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }
        ServerConfig::from_config(builder.build()?)
    }

    #[test]
    fn test_defaults() {
        let config = build(&[]).unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
        assert_eq!(config.max_batch_size, 1000);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.artifact_paths(),
            ArtifactPaths::from_dir("model")
        );
    }

    #[test]
    fn test_overrides() {
        let config = build(&[
            ("port", "9100"),
            ("model_dir", "/srv/churn"),
            ("scaler_path", "/etc/churn/scaler.json"),
            ("log_format", "pretty"),
        ])
        .unwrap();

        assert_eq!(config.port, 9100);
        assert_eq!(config.log_format, LogFormat::Pretty);
        let paths = config.artifact_paths();
        assert_eq!(paths.model, PathBuf::from("/srv/churn/churn_model.onnx"));
        assert_eq!(paths.scaler, PathBuf::from("/etc/churn/scaler.json"));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(build(&[("max_batch_size", "0")]).is_err());
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(build(&[("port", "not-a-port")]).is_err());
    }
}
