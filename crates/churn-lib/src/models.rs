//! Core data models for the churn prediction service

use crate::error::{PredictError, ValidationError};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Customer name reported when a failed record carries none
pub const UNKNOWN_CUSTOMER: &str = "Unknown";

/// Upper bound for real-valued fields so they survive the cast to `f32`
const MAX_REAL: f64 = f32::MAX as f64;

/// Customer gender as accepted at the API boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Case-insensitive parse accepting full names and single-letter forms
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "M" | "MALE" => Some(Gender::Male),
            "F" | "FEMALE" => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn is_male(&self) -> bool {
        matches!(self, Gender::Male)
    }
}

/// Province of residence
///
/// Values outside the seven known provinces are carried as `Unrecognized`
/// and encoded as the no-province baseline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Province {
    Bagmati,
    Gandaki,
    Karnali,
    Koshi,
    Lumbini,
    Madhesh,
    Sudurpashchim,
    Unrecognized(String),
}

impl Province {
    pub const KNOWN: [Province; 7] = [
        Province::Bagmati,
        Province::Gandaki,
        Province::Karnali,
        Province::Koshi,
        Province::Lumbini,
        Province::Madhesh,
        Province::Sudurpashchim,
    ];

    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        Self::KNOWN
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(trimmed))
            .unwrap_or_else(|| Province::Unrecognized(trimmed.to_string()))
    }

    pub fn name(&self) -> &str {
        match self {
            Province::Bagmati => "Bagmati",
            Province::Gandaki => "Gandaki",
            Province::Karnali => "Karnali",
            Province::Koshi => "Koshi",
            Province::Lumbini => "Lumbini",
            Province::Madhesh => "Madhesh",
            Province::Sudurpashchim => "Sudurpashchim",
            Province::Unrecognized(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Province::Unrecognized(_))
    }
}

impl fmt::Display for Province {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Province {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Telecom provider
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Provider {
    Ncell,
    NepalTelecom,
    Unrecognized(String),
}

impl Provider {
    pub const KNOWN: [Provider; 2] = [Provider::Ncell, Provider::NepalTelecom];

    /// Accepts "Ncell", "Nepal Telecom", "Nepal_Telecom", "NTC" and
    /// "Nepal Telecom (NTC)" in any case
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().replace('_', " ").to_ascii_lowercase();
        match normalized.as_str() {
            "ncell" => Provider::Ncell,
            "nepal telecom" | "ntc" | "nepal telecom (ntc)" => Provider::NepalTelecom,
            _ => Provider::Unrecognized(raw.trim().to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Provider::Ncell => "Ncell",
            Provider::NepalTelecom => "Nepal Telecom",
            Provider::Unrecognized(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Provider::Unrecognized(_))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Provider {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Customer record as received from a front end, before validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerInput {
    pub name: String,
    pub gender: String,
    pub age: i64,
    #[serde(default)]
    pub num_dependents: i64,
    pub estimated_salary: f64,
    #[serde(default)]
    pub calls_made: i64,
    #[serde(default)]
    pub sms_sent: i64,
    #[serde(default)]
    pub data_used: f64,
    pub tenure_months: i64,
    pub province: String,
    pub provider: String,
}

/// Validated customer record, the only form the encoder accepts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerRecord {
    pub name: String,
    pub gender: Gender,
    pub age: u8,
    pub num_dependents: u8,
    pub estimated_salary: f64,
    pub calls_made: u32,
    pub sms_sent: u32,
    /// Monthly data usage in MB
    pub data_used: f64,
    pub tenure_months: u8,
    pub province: Province,
    pub provider: Provider,
}

impl CustomerRecord {
    /// Validate a loosely-typed JSON mapping. Unknown keys are ignored.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ValidationError> {
        let input = CustomerInput::deserialize(value)
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;
        Self::try_from(input)
    }
}

impl TryFrom<CustomerInput> for CustomerRecord {
    type Error = ValidationError;

    fn try_from(input: CustomerInput) -> Result<Self, Self::Error> {
        let name = non_empty("name", &input.name)?;
        let gender = Gender::parse(&input.gender)
            .ok_or_else(|| ValidationError::InvalidGender(input.gender.clone()))?;
        let province = Province::parse(non_empty("province", &input.province)?.as_str());
        let provider = Provider::parse(non_empty("provider", &input.provider)?.as_str());

        Ok(Self {
            name,
            gender,
            age: bounded("age", input.age, 18, 100)?,
            num_dependents: bounded("num_dependents", input.num_dependents, 0, 10)?,
            estimated_salary: non_negative_real("estimated_salary", input.estimated_salary)?,
            calls_made: bounded("calls_made", input.calls_made, 0, i64::from(u32::MAX))?,
            sms_sent: bounded("sms_sent", input.sms_sent, 0, i64::from(u32::MAX))?,
            data_used: non_negative_real("data_used", input.data_used)?,
            tenure_months: bounded("tenure_months", input.tenure_months, 0, 72)?,
            province,
            provider,
        })
    }
}

fn non_empty(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(trimmed.to_string())
}

fn bounded<T: TryFrom<i64>>(
    field: &'static str,
    value: i64,
    min: i64,
    max: i64,
) -> Result<T, ValidationError> {
    let out_of_range = || ValidationError::OutOfRange {
        field,
        value: value.to_string(),
        expected: format!("{}..={}", min, max),
    };
    if value < min || value > max {
        return Err(out_of_range());
    }
    T::try_from(value).map_err(|_| out_of_range())
}

fn non_negative_real(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && (0.0..=MAX_REAL).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::OutOfRange {
            field,
            value: value.to_string(),
            expected: "a finite value >= 0".to_string(),
        })
    }
}

/// Model-ready numeric representation of a customer, one slot per schema column
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn zeros(len: usize) -> Self {
        Self(vec![0.0; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }

    pub(crate) fn set(&mut self, index: usize, value: f32) {
        self.0[index] = value;
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// Binary churn decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChurnStatus {
    Churn,
    Retain,
}

impl ChurnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChurnStatus::Churn => "CHURN",
            ChurnStatus::Retain => "RETAIN",
        }
    }
}

/// Risk tier, independent of the churn status threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

/// Successful prediction for one customer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChurnPrediction {
    pub customer_name: String,
    pub churn_prediction: ChurnStatus,
    /// Percentage in [0, 100], two decimals
    pub churn_probability: f64,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
}

/// Failed prediction for one customer
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionFailure {
    pub customer_name: String,
    pub error: PredictError,
}

/// Uniform per-request outcome handed to every front end
///
/// Serializes as `{success: true, customer_name, churn_prediction, ...}` or
/// `{success: false, customer_name, error, error_kind}`.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionResult {
    Success(ChurnPrediction),
    Failure(PredictionFailure),
}

impl PredictionResult {
    pub fn failure(customer_name: impl Into<String>, error: PredictError) -> Self {
        PredictionResult::Failure(PredictionFailure {
            customer_name: customer_name.into(),
            error,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PredictionResult::Success(_))
    }

    pub fn customer_name(&self) -> &str {
        match self {
            PredictionResult::Success(p) => &p.customer_name,
            PredictionResult::Failure(f) => &f.customer_name,
        }
    }

    pub fn prediction(&self) -> Option<&ChurnPrediction> {
        match self {
            PredictionResult::Success(p) => Some(p),
            PredictionResult::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&PredictError> {
        match self {
            PredictionResult::Success(_) => None,
            PredictionResult::Failure(f) => Some(&f.error),
        }
    }
}

impl Serialize for PredictionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            PredictionResult::Success(p) => {
                map.serialize_entry("success", &true)?;
                map.serialize_entry("customer_name", &p.customer_name)?;
                map.serialize_entry("churn_prediction", &p.churn_prediction)?;
                map.serialize_entry("churn_probability", &p.churn_probability)?;
                map.serialize_entry("risk_level", &p.risk_level)?;
                map.serialize_entry("recommendations", &p.recommendations)?;
            }
            PredictionResult::Failure(f) => {
                map.serialize_entry("success", &false)?;
                map.serialize_entry("customer_name", &f.customer_name)?;
                map.serialize_entry("error", &f.error.to_string())?;
                map.serialize_entry("error_kind", f.error.kind())?;
            }
        }
        map.end()
    }
}

/// Batch outcome; `total` always equals the number of submitted records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchPrediction {
    pub total: usize,
    pub predictions: Vec<PredictionResult>,
}

impl BatchPrediction {
    pub fn succeeded(&self) -> usize {
        self.predictions.iter().filter(|p| p.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total - self.succeeded()
    }
}
