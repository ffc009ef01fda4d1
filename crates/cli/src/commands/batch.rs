//! Batch prediction command

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tabled::{settings::Style, Tabled};

use crate::client::{ApiClient, BatchResponse, PredictionResponse};
use crate::commands::predict::read_json;
use crate::output::{
    color_risk, color_status, format_probability, print_json, print_success, print_warning,
    OutputFormat,
};

/// CSV columns that stay strings even when they look numeric
const TEXT_COLUMNS: [&str; 4] = ["name", "gender", "province", "provider"];

/// Row for batch results table
#[derive(Tabled)]
struct BatchRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Customer")]
    customer: String,
    #[tabled(rename = "Prediction")]
    prediction: String,
    #[tabled(rename = "Probability")]
    probability: String,
    #[tabled(rename = "Risk")]
    risk: String,
    #[tabled(rename = "Error")]
    error: String,
}

impl BatchRow {
    fn new(index: usize, result: &PredictionResponse) -> Self {
        Self {
            index: index + 1,
            customer: result.customer_name.clone(),
            prediction: result
                .churn_prediction
                .as_deref()
                .map(color_status)
                .unwrap_or_else(|| "-".to_string()),
            probability: result
                .churn_probability
                .map(format_probability)
                .unwrap_or_else(|| "-".to_string()),
            risk: result
                .risk_level
                .as_deref()
                .map(color_risk)
                .unwrap_or_else(|| "-".to_string()),
            error: result.error.clone().unwrap_or_default(),
        }
    }
}

/// Count of successful predictions per risk tier, plus failures
#[derive(Debug, Default, PartialEq)]
pub struct BatchSummary {
    pub by_risk: BTreeMap<String, usize>,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[PredictionResponse]) -> Self {
        let mut summary = Self::default();
        for result in results {
            match (&result.risk_level, result.success) {
                (Some(risk), true) => *summary.by_risk.entry(risk.clone()).or_default() += 1,
                _ => summary.failed += 1,
            }
        }
        summary
    }
}

/// Customer records from a `.csv` file or a JSON array file
pub fn load_records(file: &Path) -> Result<Vec<Value>> {
    let is_csv = file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        return read_csv(file);
    }

    match read_json(file)? {
        Value::Array(records) => Ok(records),
        _ => anyhow::bail!(
            "{} must contain a JSON array of customer records",
            file.display()
        ),
    }
}

/// One JSON object per row, keyed by the header. Empty cells are left out
/// so the server applies its defaults or reports the missing field.
fn read_csv(file: &Path) -> Result<Vec<Value>> {
    let mut reader = csv::Reader::from_path(file)
        .with_context(|| format!("Failed to open {}", file.display()))?;
    let headers = reader.headers().context("Failed to read CSV header")?.clone();

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("Malformed CSV row {}", line + 1))?;
        let mut record = Map::new();
        for (column, cell) in headers.iter().zip(row.iter()) {
            if let Some(value) = csv_cell(column, cell) {
                record.insert(column.trim().to_string(), value);
            }
        }
        records.push(Value::Object(record));
    }
    Ok(records)
}

fn csv_cell(column: &str, raw: &str) -> Option<Value> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if TEXT_COLUMNS.contains(&column.trim()) {
        return Some(Value::String(raw.to_string()));
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Some(Value::from(int));
    }
    match raw.parse::<f64>() {
        Ok(real) => Some(Value::from(real)),
        Err(_) => Some(Value::String(raw.to_string())),
    }
}

/// Flat row for CSV export
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    customer_name: &'a str,
    success: bool,
    churn_prediction: Option<&'a str>,
    churn_probability: Option<f64>,
    risk_level: Option<&'a str>,
    recommendations: String,
    error: Option<&'a str>,
}

impl<'a> From<&'a PredictionResponse> for ExportRow<'a> {
    fn from(result: &'a PredictionResponse) -> Self {
        Self {
            customer_name: &result.customer_name,
            success: result.success,
            churn_prediction: result.churn_prediction.as_deref(),
            churn_probability: result.churn_probability,
            risk_level: result.risk_level.as_deref(),
            recommendations: result.recommendations.join("; "),
            error: result.error.as_deref(),
        }
    }
}

/// Write batch results to a CSV file
pub fn write_csv(path: &Path, results: &[PredictionResponse]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for result in results {
        writer.serialize(ExportRow::from(result))?;
    }
    writer.flush()?;
    Ok(())
}

/// Predict churn for every record in a JSON array or CSV file
pub async fn batch_predict(
    client: &ApiClient,
    file: &Path,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let records = load_records(file)?;

    let result: BatchResponse = client.post("batch-predict", &records).await?;

    if let Some(path) = output {
        write_csv(path, &result.predictions)?;
        if format == OutputFormat::Table {
            print_success(&format!("Results written to {}", path.display()));
        }
    }

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!("{}", "Batch Predictions".bold());
            println!("{}", "=".repeat(50));

            if result.predictions.is_empty() {
                print_warning("No records in batch");
                return Ok(());
            }

            let rows: Vec<BatchRow> = result
                .predictions
                .iter()
                .enumerate()
                .map(|(i, r)| BatchRow::new(i, r))
                .collect();
            let table = tabled::Table::new(rows).with(Style::rounded()).to_string();
            println!("{}", table);

            let summary = BatchSummary::from_results(&result.predictions);
            println!();
            println!("Total:    {}", result.total);
            for (risk, count) in &summary.by_risk {
                println!("{:<9} {}", format!("{}:", color_risk(risk)), count);
            }
            if summary.failed > 0 {
                println!("Failed:   {}", summary.failed.to_string().red());
            }
        }
    }

    Ok(())
}
