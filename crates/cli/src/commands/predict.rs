//! Single-customer prediction command

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Tabled};

use crate::client::{ApiClient, PredictionResponse};
use crate::output::{
    color_risk, color_status, format_probability, print_error, print_json, OutputFormat,
};

/// Customer fields, given as flags or as a JSON file
#[derive(Args, Debug, Clone)]
pub struct PredictArgs {
    /// Read the customer record from a JSON file instead of flags
    #[arg(long, conflicts_with_all = ["name", "gender", "age", "estimated_salary", "tenure_months", "province", "provider"])]
    pub file: Option<PathBuf>,

    /// Customer name
    #[arg(long, required_unless_present = "file")]
    pub name: Option<String>,

    /// Gender (Male/Female or M/F)
    #[arg(long, required_unless_present = "file")]
    pub gender: Option<String>,

    /// Age in years (18-100)
    #[arg(long, required_unless_present = "file")]
    pub age: Option<i64>,

    /// Number of dependents
    #[arg(long, default_value_t = 0)]
    pub num_dependents: i64,

    /// Estimated annual salary
    #[arg(long, required_unless_present = "file")]
    pub estimated_salary: Option<f64>,

    /// Calls made per month
    #[arg(long, default_value_t = 0)]
    pub calls_made: i64,

    /// SMS sent per month
    #[arg(long, default_value_t = 0)]
    pub sms_sent: i64,

    /// Monthly data usage in MB
    #[arg(long, default_value_t = 0.0)]
    pub data_used: f64,

    /// Months with the provider
    #[arg(long, required_unless_present = "file")]
    pub tenure_months: Option<i64>,

    /// Province of residence
    #[arg(long, required_unless_present = "file")]
    pub province: Option<String>,

    /// Telecom provider (Ncell or Nepal Telecom)
    #[arg(long, required_unless_present = "file")]
    pub provider: Option<String>,
}

#[derive(Debug, Serialize)]
struct CustomerPayload {
    name: Option<String>,
    gender: Option<String>,
    age: Option<i64>,
    num_dependents: i64,
    estimated_salary: Option<f64>,
    calls_made: i64,
    sms_sent: i64,
    data_used: f64,
    tenure_months: Option<i64>,
    province: Option<String>,
    provider: Option<String>,
}

impl PredictArgs {
    /// Request body for `/predict`; the server performs validation
    pub fn payload(&self) -> Result<Value> {
        if let Some(path) = &self.file {
            return read_json(path);
        }

        let payload = CustomerPayload {
            name: self.name.clone(),
            gender: self.gender.clone(),
            age: self.age,
            num_dependents: self.num_dependents,
            estimated_salary: self.estimated_salary,
            calls_made: self.calls_made,
            sms_sent: self.sms_sent,
            data_used: self.data_used,
            tenure_months: self.tenure_months,
            province: self.province.clone(),
            provider: self.provider.clone(),
        };
        Ok(serde_json::to_value(payload)?)
    }
}

pub(crate) fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

/// Row for the prediction detail table
#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Predict churn for one customer
pub async fn predict(client: &ApiClient, args: &PredictArgs, format: OutputFormat) -> Result<()> {
    let payload = args.payload()?;
    let result: PredictionResponse = client.post("predict", &payload).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => print_prediction(&result),
    }

    Ok(())
}

fn print_prediction(result: &PredictionResponse) {
    if !result.success {
        print_error(&format!(
            "Prediction failed for {} ({}): {}",
            result.customer_name,
            result.error_kind.as_deref().unwrap_or("error"),
            result.error.as_deref().unwrap_or("unknown error")
        ));
        return;
    }

    println!("{}", "Churn Prediction".bold());
    println!("{}", "=".repeat(50));

    let rows = vec![
        FieldRow {
            field: "Customer".to_string(),
            value: result.customer_name.clone(),
        },
        FieldRow {
            field: "Prediction".to_string(),
            value: result
                .churn_prediction
                .as_deref()
                .map(color_status)
                .unwrap_or_default(),
        },
        FieldRow {
            field: "Probability".to_string(),
            value: result
                .churn_probability
                .map(format_probability)
                .unwrap_or_default(),
        },
        FieldRow {
            field: "Risk".to_string(),
            value: result.risk_level.as_deref().map(color_risk).unwrap_or_default(),
        },
    ];

    let table = tabled::Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);

    if !result.recommendations.is_empty() {
        println!();
        println!("{}", "Recommendations".bold());
        for recommendation in &result.recommendations {
            println!("  • {}", recommendation);
        }
    }
}
