//! Telco Churn Prediction CLI
//!
//! A command-line tool for scoring customers against the churn
//! prediction API and checking the state of the server.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{batch, predict, status};
use std::path::PathBuf;

/// Telco Churn Prediction CLI
#[derive(Parser)]
#[command(name = "churnctl")]
#[command(author, version, about = "CLI for the Telco Churn Prediction API", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via CHURN_API_URL env var)
    #[arg(long, env = "CHURN_API_URL")]
    pub api_url: Option<String>,

    /// Output format [default: table]
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict churn for a single customer
    Predict(predict::PredictArgs),

    /// Predict churn for every record in a JSON array or CSV file
    Batch {
        /// Path to a `.json` array or a `.csv` file with a header row
        file: PathBuf,

        /// Also write the results to this CSV file
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show server and model health
    Health,

    /// Show API and model information
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    let api_url = config.resolve_api_url(cli.api_url.as_deref());
    let format = output::OutputFormat::resolve(cli.format, config.default_format.as_deref());

    // Initialize client
    let client = client::ApiClient::new(&api_url)?;

    // Execute command
    match &cli.command {
        Commands::Predict(args) => {
            predict::predict(&client, args, format).await?;
        }
        Commands::Batch { file, output } => {
            batch::batch_predict(&client, file, output.as_deref(), format).await?;
        }
        Commands::Health => {
            status::show_health(&client, format).await?;
        }
        Commands::Info => {
            status::show_info(&client, format).await?;
        }
    }

    Ok(())
}
