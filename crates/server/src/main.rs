//! Churn prediction server
//!
//! Binds the HTTP listener first, then loads the model artifacts in the
//! background so that readiness is observable while loading.

use anyhow::{Context, Result};
use churn_lib::ChurnService;
use churn_server::api;
use churn_server::config::{LogFormat, ServerConfig};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::load()?;
    init_tracing(config.log_format);

    info!(
        model_dir = %config.model_dir.display(),
        max_batch_size = config.max_batch_size,
        "Starting churn-server"
    );

    let service = Arc::new(ChurnService::new(config.artifact_paths()));
    let app_state = Arc::new(api::AppState::new(
        Arc::clone(&service),
        config.max_batch_size,
    ));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let api_handle = tokio::spawn(api::serve(listener, app_state));

    let loader = Arc::clone(&service);
    tokio::spawn(async move {
        loader.initialize().await;
    });

    tokio::select! {
        result = api_handle => {
            match result {
                Ok(Ok(())) => info!("API server stopped"),
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
            }
            service.logger().log_shutdown("API server exited");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            service.logger().log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
