//! Server health and model information commands

use anyhow::Result;
use colored::Colorize;
use tabled::{settings::Style, Tabled};

use crate::client::{ApiClient, ApiInfo, HealthStatus, RootStatus};
use crate::output::{color_status, print_info, print_json, print_success, print_warning, OutputFormat};

/// Row for component health table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Show server health
///
/// `/health` answers 503 while the model is loading, so the root status is
/// checked first.
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let root: RootStatus = client.get("").await?;

    if !root.model_loaded {
        match format {
            OutputFormat::Json => print_json(&root)?,
            OutputFormat::Table => print_warning("Server is up but the model is still loading"),
        }
        return Ok(());
    }

    let health: HealthStatus = client.get("health").await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            println!("{}", "Service Health".bold());
            println!("{}", "=".repeat(50));
            println!("Status:        {}", color_status(&health.status));
            println!("Model loaded:  {}", health.model_loaded);
            println!();

            let mut rows: Vec<ComponentRow> = health
                .components
                .iter()
                .map(|(name, c)| ComponentRow {
                    name: name.clone(),
                    status: color_status(&c.status),
                    message: c.message.clone().unwrap_or_default(),
                })
                .collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name));

            let table = tabled::Table::new(rows).with(Style::rounded()).to_string();
            println!("{}", table);

            if health.status == "healthy" {
                print_success("All components healthy");
            }
        }
    }

    Ok(())
}

/// Show API and model information
pub async fn show_info(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let info: ApiInfo = client.get("info").await?;

    match format {
        OutputFormat::Json => print_json(&info)?,
        OutputFormat::Table => {
            println!("{}", info.api_name.bold());
            println!("{}", "=".repeat(50));
            println!("Version:       {}", info.version);
            println!("Model loaded:  {}", info.model_loaded);
            println!(
                "Classifier:    {}",
                info.classifier.as_deref().unwrap_or("-").cyan()
            );
            println!(
                "Checksum:      {}",
                info.model_checksum.as_deref().unwrap_or("-")
            );
            if let Some(columns) = info.schema_columns {
                println!("Features:      {}", columns);
            }
            println!("Provinces:     {}", info.provinces.join(", "));
            println!("Providers:     {}", info.providers.join(", "));
            if let Some(inference) = &info.inference {
                println!(
                    "Inferences:    {} ({} slow)",
                    inference.total_inferences, inference.slow_inferences
                );
            }

            if info.classifier.as_deref() == Some("fallback") {
                println!();
                print_info("Serving with the built-in fallback model; predictions are not trained");
            }
        }
    }

    Ok(())
}
