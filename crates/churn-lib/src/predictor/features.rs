//! Feature encoding for ML inference
//!
//! Maps a validated customer record onto the resolved schema: gender as a
//! binary flag, seven numeric columns passed through the scaler, and one-hot
//! slots for province and provider. Lookups are resolved to slot indices
//! once per schema, so a value the schema has no column for is an explicit
//! branch rather than a failed string lookup.

use super::scaler::{FeatureScaler, NUM_SCALED, SCALED_COLUMNS};
use super::schema::{columns, province_column, provider_column, FeatureSchema};
use crate::models::{CustomerRecord, FeatureVector, Province, Provider};
use std::collections::HashMap;
use std::fmt;

/// Categorical attribute encoded as one-hot slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Province,
    Provider,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Province => f.write_str("province"),
            Category::Provider => f.write_str("provider"),
        }
    }
}

/// A way in which encoding fell short without failing the request
#[derive(Debug, Clone, PartialEq)]
pub enum Degradation {
    /// No schema column for this value; the record keeps the baseline encoding
    UnmappedCategory { category: Category, value: String },
    /// Scaler unavailable or transform failed; raw values were kept
    ScalingSkipped { reason: String },
    /// A raw column is missing from the schema; its value was dropped
    ColumnAbsent { column: &'static str },
}

impl Degradation {
    pub fn kind(&self) -> &'static str {
        match self {
            Degradation::UnmappedCategory { .. } => "unmapped_category",
            Degradation::ScalingSkipped { .. } => "scaling_skipped",
            Degradation::ColumnAbsent { .. } => "column_absent",
        }
    }
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degradation::UnmappedCategory { category, value } => {
                write!(f, "{} {:?} has no schema column", category, value)
            }
            Degradation::ScalingSkipped { reason } => write!(f, "scaling skipped: {}", reason),
            Degradation::ColumnAbsent { column } => {
                write!(f, "column `{}` missing from schema", column)
            }
        }
    }
}

/// Encoder output: the vector plus everything that degraded along the way
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatures {
    pub vector: FeatureVector,
    pub degradations: Vec<Degradation>,
}

impl EncodedFeatures {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

/// `(category, value) -> slot` lookup built once per schema
#[derive(Debug, Clone, Default)]
struct OneHotIndex {
    provinces: HashMap<Province, usize>,
    providers: HashMap<Provider, usize>,
}

impl OneHotIndex {
    fn build(schema: &FeatureSchema) -> Self {
        let provinces = Province::KNOWN
            .into_iter()
            .filter_map(|p| schema.position(&province_column(&p)).map(|i| (p, i)))
            .collect();
        let providers = Provider::KNOWN
            .into_iter()
            .filter_map(|p| schema.position(&provider_column(&p)).map(|i| (p, i)))
            .collect();
        Self {
            provinces,
            providers,
        }
    }
}

/// Encodes customer records against one schema
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    schema: FeatureSchema,
    gender_slot: Option<usize>,
    /// Slots for `SCALED_COLUMNS`, same order
    numeric_slots: [Option<usize>; NUM_SCALED],
    one_hot: OneHotIndex,
}

impl FeatureEncoder {
    pub fn new(schema: FeatureSchema) -> Self {
        let gender_slot = schema.position(columns::GENDER);
        let numeric_slots = SCALED_COLUMNS.map(|c| schema.position(c));
        let one_hot = OneHotIndex::build(&schema);
        Self {
            schema,
            gender_slot,
            numeric_slots,
            one_hot,
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Build a fresh vector for `record`. Never fails: anything that cannot
    /// be encoded is reported in `degradations` instead.
    pub fn encode(&self, record: &CustomerRecord, scaler: &FeatureScaler) -> EncodedFeatures {
        let mut vector = FeatureVector::zeros(self.schema.len());
        let mut degradations = Vec::new();

        match self.gender_slot {
            Some(slot) => vector.set(slot, if record.gender.is_male() { 1.0 } else { 0.0 }),
            None => degradations.push(Degradation::ColumnAbsent {
                column: columns::GENDER,
            }),
        }

        let raw = numeric_values(record);
        for ((column, slot), value) in SCALED_COLUMNS.into_iter().zip(self.numeric_slots).zip(raw) {
            match slot {
                Some(slot) => vector.set(slot, value as f32),
                None => degradations.push(Degradation::ColumnAbsent { column }),
            }
        }

        match self.one_hot.provinces.get(&record.province) {
            Some(&slot) => vector.set(slot, 1.0),
            None => degradations.push(Degradation::UnmappedCategory {
                category: Category::Province,
                value: record.province.name().to_string(),
            }),
        }

        match self.one_hot.providers.get(&record.provider) {
            Some(&slot) => vector.set(slot, 1.0),
            None => degradations.push(Degradation::UnmappedCategory {
                category: Category::Provider,
                value: record.provider.name().to_string(),
            }),
        }

        match scaler.transform(&raw) {
            Ok(scaled) => {
                for (slot, value) in self.numeric_slots.iter().zip(scaled) {
                    if let Some(slot) = slot {
                        vector.set(*slot, value as f32);
                    }
                }
            }
            Err(e) => degradations.push(Degradation::ScalingSkipped {
                reason: e.to_string(),
            }),
        }

        EncodedFeatures {
            vector,
            degradations,
        }
    }
}

/// Numeric attributes in `SCALED_COLUMNS` order
fn numeric_values(record: &CustomerRecord) -> [f64; NUM_SCALED] {
    [
        f64::from(record.age),
        record.estimated_salary,
        f64::from(record.calls_made),
        f64::from(record.sms_sent),
        record.data_used,
        f64::from(record.tenure_months),
        f64::from(record.num_dependents),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;
    use crate::predictor::scaler::StandardScaler;

    fn create_test_record() -> CustomerRecord {
        CustomerRecord {
            name: "Hari Bahadur".to_string(),
            gender: Gender::Male,
            age: 42,
            num_dependents: 3,
            estimated_salary: 45_000.0,
            calls_made: 60,
            sms_sent: 12,
            data_used: 2048.0,
            tenure_months: 30,
            province: Province::Gandaki,
            provider: Provider::NepalTelecom,
        }
    }

    fn default_encoder() -> FeatureEncoder {
        FeatureEncoder::new(FeatureSchema::default_layout())
    }

    fn slot(encoder: &FeatureEncoder, column: &str) -> usize {
        encoder.schema().position(column).unwrap()
    }

    #[test]
    fn test_vector_matches_schema_width_and_is_finite() {
        let encoder = default_encoder();
        let encoded = encoder.encode(&create_test_record(), &FeatureScaler::Unfitted);
        assert_eq!(encoded.vector.len(), encoder.schema().len());
        assert!(encoded.vector.is_finite());
    }

    #[test]
    fn test_raw_values_when_unscaled() {
        let encoder = default_encoder();
        let encoded = encoder.encode(&create_test_record(), &FeatureScaler::Unfitted);
        let v = encoded.vector.as_slice();

        assert_eq!(v[slot(&encoder, "gender")], 1.0);
        assert_eq!(v[slot(&encoder, "age")], 42.0);
        assert_eq!(v[slot(&encoder, "num_dependents")], 3.0);
        assert_eq!(v[slot(&encoder, "estimated_salary")], 45_000.0);
        assert_eq!(v[slot(&encoder, "calls_made")], 60.0);
        assert_eq!(v[slot(&encoder, "sms_sent")], 12.0);
        assert_eq!(v[slot(&encoder, "data_used")], 2048.0);
        assert_eq!(v[slot(&encoder, "tenure_months")], 30.0);
        assert_eq!(
            encoded.degradations,
            vec![Degradation::ScalingSkipped {
                reason: "scaler has not been fitted".to_string()
            }]
        );
    }

    #[test]
    fn test_one_hot_placement() {
        let encoder = default_encoder();
        let encoded = encoder.encode(&create_test_record(), &FeatureScaler::Unfitted);
        let v = encoded.vector.as_slice();

        let one_hot: Vec<&str> = encoder.schema().columns()[8..]
            .iter()
            .zip(&v[8..])
            .filter(|&(_, &value)| value == 1.0)
            .map(|(c, _)| c.as_str())
            .collect();
        assert_eq!(
            one_hot,
            vec!["province_Gandaki", "provider_nepal_Nepal_Telecom"]
        );
    }

    #[test]
    fn test_lowercase_category_reaches_its_column() {
        let mut record = create_test_record();
        record.province = Province::parse("bagmati");
        record.provider = Provider::parse("ncell");
        let encoder = default_encoder();
        let encoded = encoder.encode(&record, &FeatureScaler::Unfitted);
        let v = encoded.vector.as_slice();

        assert_eq!(v[slot(&encoder, "province_Bagmati")], 1.0);
        assert_eq!(v[slot(&encoder, "provider_nepal_Ncell")], 1.0);
        assert!(!encoded
            .degradations
            .iter()
            .any(|d| d.kind() == "unmapped_category"));
    }

    #[test]
    fn test_female_encoded_as_zero() {
        let mut record = create_test_record();
        record.gender = Gender::Female;
        let encoder = default_encoder();
        let encoded = encoder.encode(&record, &FeatureScaler::Unfitted);
        assert_eq!(encoded.vector.as_slice()[slot(&encoder, "gender")], 0.0);
    }

    #[test]
    fn test_scaling_only_touches_numeric_columns() {
        let scaler = StandardScaler::new(vec![10.0; NUM_SCALED], vec![2.0; NUM_SCALED]).unwrap();
        let scaler = FeatureScaler::Fitted(scaler);
        let encoder = default_encoder();
        let encoded = encoder.encode(&create_test_record(), &scaler);
        let v = encoded.vector.as_slice();

        assert!(!encoded.is_degraded());
        assert_eq!(v[slot(&encoder, "age")], 16.0);
        assert_eq!(v[slot(&encoder, "tenure_months")], 10.0);
        assert_eq!(v[slot(&encoder, "gender")], 1.0);
        assert_eq!(v[slot(&encoder, "province_Gandaki")], 1.0);
    }

    #[test]
    fn test_failed_scaling_keeps_raw_values() {
        let scaler = StandardScaler::new(vec![0.0; NUM_SCALED], vec![1e-300; NUM_SCALED]).unwrap();
        let encoder = default_encoder();
        let scaled = encoder.encode(&create_test_record(), &FeatureScaler::Fitted(scaler));
        let unscaled = encoder.encode(&create_test_record(), &FeatureScaler::Unfitted);

        assert_eq!(scaled.vector, unscaled.vector);
        assert!(matches!(
            scaled.degradations.as_slice(),
            [Degradation::ScalingSkipped { .. }]
        ));
    }

    #[test]
    fn test_unrecognized_province_encodes_baseline() {
        let encoder = default_encoder();
        let mut record = create_test_record();
        record.province = Province::Unrecognized("Atlantis".to_string());
        let encoded = encoder.encode(&record, &FeatureScaler::Unfitted);

        let mut baseline = encoder
            .encode(&create_test_record(), &FeatureScaler::Unfitted)
            .vector
            .as_slice()
            .to_vec();
        baseline[slot(&encoder, "province_Gandaki")] = 0.0;

        assert_eq!(encoded.vector.as_slice(), baseline.as_slice());
        assert!(encoded.degradations.contains(&Degradation::UnmappedCategory {
            category: Category::Province,
            value: "Atlantis".to_string(),
        }));
    }

    #[test]
    fn test_schema_without_provider_column_degrades() {
        // A schema trained without the Nepal Telecom dummy column
        let columns: Vec<String> = FeatureSchema::default_layout()
            .columns()
            .iter()
            .filter(|c| c.as_str() != "provider_nepal_Nepal_Telecom")
            .cloned()
            .collect();
        let encoder = FeatureEncoder::new(FeatureSchema::new(columns).unwrap());
        let encoded = encoder.encode(&create_test_record(), &FeatureScaler::Unfitted);

        assert_eq!(encoded.vector.len(), 16);
        assert!(encoded.degradations.contains(&Degradation::UnmappedCategory {
            category: Category::Provider,
            value: "Nepal Telecom".to_string(),
        }));
        let ones = encoded.vector.as_slice()[8..].iter().filter(|&&v| v == 1.0).count();
        assert_eq!(ones, 1);
    }

    #[test]
    fn test_absent_raw_column_dropped() {
        let schema = FeatureSchema::new(vec!["age".into(), "province_Gandaki".into()]).unwrap();
        let encoder = FeatureEncoder::new(schema);
        let encoded = encoder.encode(&create_test_record(), &FeatureScaler::Unfitted);

        assert_eq!(encoded.vector.as_slice(), &[42.0, 1.0]);
        assert!(encoded
            .degradations
            .contains(&Degradation::ColumnAbsent { column: "gender" }));
        assert!(encoded.degradations.contains(&Degradation::ColumnAbsent {
            column: "estimated_salary"
        }));
    }

    #[test]
    fn test_encoding_does_not_mutate_record() {
        let record = create_test_record();
        let before = record.clone();
        default_encoder().encode(&record, &FeatureScaler::Unfitted);
        assert_eq!(record, before);
    }
}
