//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Explicit flag first, then the config file's `default_format`
    pub fn resolve(explicit: Option<Self>, configured: Option<&str>) -> Self {
        explicit
            .or_else(|| configured.and_then(|s| Self::from_str(s, true).ok()))
            .unwrap_or_default()
    }
}

/// Pretty-print any response as JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a percentage probability
pub fn format_probability(percent: f64) -> String {
    format!("{:.2}%", percent)
}

/// Color churn status and health status values
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "churn" => status.red().bold().to_string(),
        "retain" => status.green().to_string(),
        "healthy" => status.green().to_string(),
        "degraded" => status.yellow().to_string(),
        "unhealthy" | "failed" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color risk tier
pub fn color_risk(risk: &str) -> String {
    match risk.to_uppercase().as_str() {
        "HIGH" => risk.red().bold().to_string(),
        "MEDIUM" => risk.yellow().to_string(),
        "LOW" => risk.green().to_string(),
        _ => risk.to_string(),
    }
}
