//! Immutable state built once at initialization

use crate::artifacts::{ArtifactPaths, ArtifactSource};
use crate::error::InferenceError;
use crate::models::{ChurnPrediction, CustomerRecord};
use crate::predictor::{
    decide, resolve_scaler, resolve_schema, to_percentage, Classifier, ClassifierKind,
    Degradation, FeatureEncoder, FeatureScaler, FeatureSchema, InferenceGateway,
    ScalerResolution, SchemaResolution,
};
use serde::Serialize;

/// Where each artifact of the bundle came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub classifier: ArtifactSource,
    pub scaler: ArtifactSource,
    pub schema: ArtifactSource,
}

impl Provenance {
    /// `(artifact, source)` pairs in load order
    pub fn entries(&self) -> [(&'static str, &ArtifactSource); 3] {
        [
            ("schema", &self.schema),
            ("scaler", &self.scaler),
            ("classifier", &self.classifier),
        ]
    }

    pub fn is_degraded(&self) -> bool {
        self.entries().iter().any(|(_, source)| source.is_fallback())
    }
}

/// A successful evaluation plus whatever degraded while encoding
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub prediction: ChurnPrediction,
    pub degradations: Vec<Degradation>,
}

/// Classifier, scaler and schema resolved for the lifetime of the process
pub struct ServiceState {
    gateway: InferenceGateway,
    scaler: FeatureScaler,
    encoder: FeatureEncoder,
    provenance: Provenance,
}

impl ServiceState {
    /// Resolve every artifact, falling back per artifact. The schema comes
    /// first because it fixes the classifier's input width.
    pub fn load(paths: &ArtifactPaths) -> Self {
        let SchemaResolution {
            schema,
            source: schema_source,
        } = resolve_schema(&paths.schema);
        let ScalerResolution {
            scaler,
            source: scaler_source,
        } = resolve_scaler(&paths.scaler);
        let (gateway, classifier_source) = InferenceGateway::load(&paths.model, schema.len());

        Self {
            gateway,
            scaler,
            encoder: FeatureEncoder::new(schema),
            provenance: Provenance {
                classifier: classifier_source,
                scaler: scaler_source,
                schema: schema_source,
            },
        }
    }

    /// Everything on defaults, used when loading itself could not run
    pub fn fallback(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let schema = FeatureSchema::default_layout();
        Self {
            gateway: InferenceGateway::fallback(schema.len()),
            scaler: FeatureScaler::Unfitted,
            encoder: FeatureEncoder::new(schema),
            provenance: Provenance {
                classifier: ArtifactSource::fallback(reason.clone()),
                scaler: ArtifactSource::fallback(reason.clone()),
                schema: ArtifactSource::fallback(reason),
            },
        }
    }

    /// Assemble state from components supplied by the caller
    pub fn from_parts(
        classifier: Box<dyn Classifier>,
        scaler: FeatureScaler,
        schema: FeatureSchema,
    ) -> Self {
        Self {
            gateway: InferenceGateway::new(classifier),
            scaler,
            encoder: FeatureEncoder::new(schema),
            provenance: Provenance {
                classifier: ArtifactSource::Provided,
                scaler: ArtifactSource::Provided,
                schema: ArtifactSource::Provided,
            },
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.encoder.schema()
    }

    pub fn scaler(&self) -> &FeatureScaler {
        &self.scaler
    }

    pub fn gateway(&self) -> &InferenceGateway {
        &self.gateway
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn classifier_kind(&self) -> ClassifierKind {
        self.gateway.kind()
    }

    /// SHA-256 of the classifier artifact, when one was loaded from disk
    pub fn model_checksum(&self) -> Option<&str> {
        self.provenance.classifier.checksum()
    }

    /// Encode, infer and decide for one validated record
    pub fn evaluate(&self, record: &CustomerRecord) -> Result<Evaluation, InferenceError> {
        let encoded = self.encoder.encode(record, &self.scaler);
        let probability = f64::from(self.gateway.infer(&encoded.vector)?);
        let decision = decide(probability, record);

        Ok(Evaluation {
            prediction: ChurnPrediction {
                customer_name: record.name.clone(),
                churn_prediction: decision.status,
                churn_probability: to_percentage(probability),
                risk_level: decision.risk_level,
                recommendations: decision.recommendations,
            },
            degradations: encoded.degradations,
        })
    }
}
