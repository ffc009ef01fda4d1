//! Probability to business decision
//!
//! Converts a churn probability into a status, a risk tier and an ordered
//! list of retention recommendations.

use crate::models::{ChurnStatus, CustomerRecord, RiskLevel};

/// Probabilities strictly above this are classified as churn
pub const CHURN_THRESHOLD: f64 = 0.5;

/// Lower bound (inclusive) of the MEDIUM risk tier
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.3;

/// Lower bound (inclusive) of the HIGH risk tier
pub const HIGH_RISK_THRESHOLD: f64 = 0.6;

/// Customers with less tenure than this are still onboarding
pub const NEW_CUSTOMER_TENURE_MONTHS: u8 = 12;

/// Fewer monthly calls than this counts as low engagement
pub const LOW_ENGAGEMENT_CALLS: u32 = 20;

/// Salaries below this get affordable plan suggestions
pub const LOW_INCOME_SALARY: f64 = 30_000.0;

/// Monthly data usage (MB) below this gets a data bundle offer
pub const LOW_DATA_USAGE_MB: f64 = 500.0;

pub const MSG_RETENTION_CAMPAIGN: &str =
    "Priority: High-risk customer - Consider immediate retention strategy";
pub const MSG_PERSONALIZED_OFFER: &str = "Offer: Provide personalized discount or loyalty rewards";
pub const MSG_DEDICATED_SUPPORT: &str =
    "Action: Assign dedicated customer support representative";
pub const MSG_ONBOARDING: &str =
    "Customer is relatively new - Focus on onboarding & relationship building";
pub const MSG_LOW_ENGAGEMENT: &str = "Low engagement detected - Encourage service usage";
pub const MSG_AFFORDABILITY: &str = "Consider affordable plans to reduce churn";
pub const MSG_DATA_BUNDLE: &str = "Data usage is low - Offer attractive data bundles";

/// Outcome of the decision rules for one customer
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub status: ChurnStatus,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
}

impl RiskLevel {
    pub fn from_probability(probability: f64) -> Self {
        if probability >= HIGH_RISK_THRESHOLD {
            RiskLevel::High
        } else if probability >= MEDIUM_RISK_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl ChurnStatus {
    pub fn from_probability(probability: f64) -> Self {
        if probability > CHURN_THRESHOLD {
            ChurnStatus::Churn
        } else {
            ChurnStatus::Retain
        }
    }
}

/// Apply the decision rules; `probability` is expected in [0, 1]
pub fn decide(probability: f64, record: &CustomerRecord) -> Decision {
    let status = ChurnStatus::from_probability(probability);
    let risk_level = RiskLevel::from_probability(probability);

    let mut recommendations = Vec::new();
    if status == ChurnStatus::Churn {
        recommendations.extend(
            [
                MSG_RETENTION_CAMPAIGN,
                MSG_PERSONALIZED_OFFER,
                MSG_DEDICATED_SUPPORT,
            ]
            .map(String::from),
        );
    }
    if record.tenure_months < NEW_CUSTOMER_TENURE_MONTHS {
        recommendations.push(MSG_ONBOARDING.to_string());
    }
    if record.calls_made < LOW_ENGAGEMENT_CALLS {
        recommendations.push(MSG_LOW_ENGAGEMENT.to_string());
    }
    if record.estimated_salary < LOW_INCOME_SALARY {
        recommendations.push(MSG_AFFORDABILITY.to_string());
    }
    if risk_level != RiskLevel::Low && record.data_used < LOW_DATA_USAGE_MB {
        recommendations.push(MSG_DATA_BUNDLE.to_string());
    }

    Decision {
        status,
        risk_level,
        recommendations,
    }
}

/// Probability as a percentage rounded to two decimals
pub fn to_percentage(probability: f64) -> f64 {
    (probability * 100.0 * 100.0).round() / 100.0
}
