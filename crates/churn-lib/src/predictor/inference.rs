//! Classifier inference using tract
//!
//! The trained model is an ONNX graph taking `f32[1, schema_len]` and
//! producing a churn probability. When it cannot be loaded the gateway is
//! built around an untrained network of the same architecture, seeded so
//! that every process produces the same weights.

use super::{Classifier, ClassifierKind};
use crate::artifacts::{read_artifact, ArtifactSource};
use crate::error::InferenceError;
use crate::models::FeatureVector;
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tract_onnx::prelude::tract_ndarray::{Array1, Array2};
use tract_onnx::prelude::*;
use tracing::{debug, info, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

/// Seed for the fallback network's weights
pub const FALLBACK_SEED: u64 = 42;

/// Keras' default BatchNormalization epsilon
const BATCH_NORM_EPSILON: f32 = 1e-3;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Trained classifier loaded from an ONNX artifact
pub struct OnnxClassifier {
    model: TractModel,
    input_width: usize,
}

impl OnnxClassifier {
    /// Parse and optimize an ONNX model for a fixed `[1, input_width]` input
    pub fn from_bytes(model_bytes: &[u8], input_width: usize) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, input_width]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(Self { model, input_width })
    }
}

impl Classifier for OnnxClassifier {
    /// Reads the last value of the last output, which is P(churn) for both
    /// a single sigmoid unit and a two-column probability output.
    fn predict_proba(&self, features: &FeatureVector) -> Result<f32> {
        let input: Tensor =
            Array2::from_shape_vec((1, self.input_width), features.as_slice().to_vec())?.into();
        let result = self.model.run(tvec!(input.into()))?;
        let output = result.last().context("No output from model")?;
        let view = output.to_array_view::<f32>()?;
        view.iter()
            .last()
            .copied()
            .context("Model returned an empty output")
    }

    fn input_width(&self) -> usize {
        self.input_width
    }

    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Trained
    }
}

#[derive(Debug, Clone, Copy)]
enum Activation {
    Relu,
    Sigmoid,
}

#[derive(Debug, Clone)]
enum Layer {
    Dense {
        weights: Array2<f32>,
        bias: Array1<f32>,
        activation: Activation,
    },
    /// Freshly initialized statistics: mean 0, variance 1, gamma 1, beta 0
    BatchNorm { width: usize },
    /// Identity at inference time
    Dropout { rate: f32 },
}

impl Layer {
    /// Glorot-uniform weights, zero bias
    fn dense(rng: &mut StdRng, fan_in: usize, fan_out: usize, activation: Activation) -> Self {
        let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
        let weights = Array2::from_shape_fn((fan_in, fan_out), |_| rng.gen_range(-limit..=limit));
        Layer::Dense {
            weights,
            bias: Array1::zeros(fan_out),
            activation,
        }
    }

    fn forward(&self, x: Array1<f32>) -> Array1<f32> {
        match self {
            Layer::Dense {
                weights,
                bias,
                activation,
            } => {
                let z = x.dot(weights) + bias;
                match activation {
                    Activation::Relu => z.mapv(|v| v.max(0.0)),
                    Activation::Sigmoid => z.mapv(|v| 1.0 / (1.0 + (-v).exp())),
                }
            }
            Layer::BatchNorm { .. } => {
                let denom = (1.0 + BATCH_NORM_EPSILON).sqrt();
                x.mapv(|v| v / denom)
            }
            Layer::Dropout { .. } => x,
        }
    }

    fn describe(&self) -> String {
        match self {
            Layer::Dense {
                weights,
                activation,
                ..
            } => format!("Dense({}, {:?})", weights.ncols(), activation),
            Layer::BatchNorm { width } => format!("BatchNorm({})", width),
            Layer::Dropout { rate } => format!("Dropout({})", rate),
        }
    }
}

/// Untrained network used when no trained model is available
///
/// Its outputs carry no predictive meaning; it exists so the service keeps
/// answering with the right shapes.
#[derive(Debug, Clone)]
pub struct FallbackClassifier {
    layers: Vec<Layer>,
    input_width: usize,
}

impl FallbackClassifier {
    pub fn new(input_width: usize) -> Self {
        Self::with_seed(input_width, FALLBACK_SEED)
    }

    pub fn with_seed(input_width: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let layers = vec![
            Layer::dense(&mut rng, input_width, 32, Activation::Relu),
            Layer::BatchNorm { width: 32 },
            Layer::Dropout { rate: 0.3 },
            Layer::dense(&mut rng, 32, 16, Activation::Relu),
            Layer::Dropout { rate: 0.2 },
            Layer::dense(&mut rng, 16, 8, Activation::Relu),
            Layer::dense(&mut rng, 8, 1, Activation::Sigmoid),
        ];
        Self {
            layers,
            input_width,
        }
    }

    /// Human-readable layer stack, e.g. for startup logs
    pub fn architecture(&self) -> String {
        self.layers
            .iter()
            .map(Layer::describe)
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

impl Classifier for FallbackClassifier {
    fn predict_proba(&self, features: &FeatureVector) -> Result<f32> {
        let input = Array1::from(features.as_slice().to_vec());
        let output = self
            .layers
            .iter()
            .fold(input, |x, layer| layer.forward(x));
        output
            .get(0)
            .copied()
            .context("Fallback network produced no output")
    }

    fn input_width(&self) -> usize {
        self.input_width
    }

    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Fallback
    }
}

/// Inference statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub slow_inferences: u64,
}

/// Single entry point for turning a feature vector into a probability
pub struct InferenceGateway {
    classifier: Box<dyn Classifier>,
    inference_count: AtomicU64,
    slow_inference_count: AtomicU64,
}

impl InferenceGateway {
    pub fn new(classifier: Box<dyn Classifier>) -> Self {
        Self {
            classifier,
            inference_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
        }
    }

    /// Gateway around the seeded fallback network
    pub fn fallback(input_width: usize) -> Self {
        let classifier = FallbackClassifier::new(input_width);
        info!(
            input_width,
            architecture = %classifier.architecture(),
            "Constructed fallback classifier"
        );
        Self::new(Box::new(classifier))
    }

    /// Load the trained model at `path`, or fall back to the untrained one
    pub fn load(path: &Path, input_width: usize) -> (Self, ArtifactSource) {
        match load_classifier(path, input_width) {
            Ok((classifier, source)) => {
                info!(path = %path.display(), input_width, "Classifier loaded");
                (Self::new(Box::new(classifier)), source)
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                warn!(path = %path.display(), error = %reason, "Classifier unavailable, using untrained fallback");
                (Self::fallback(input_width), ArtifactSource::fallback(reason))
            }
        }
    }

    pub fn kind(&self) -> ClassifierKind {
        self.classifier.kind()
    }

    pub fn input_width(&self) -> usize {
        self.classifier.input_width()
    }

    pub fn infer(&self, features: &FeatureVector) -> Result<f32, InferenceError> {
        let expected = self.classifier.input_width();
        if features.len() != expected {
            return Err(InferenceError::ShapeMismatch {
                expected,
                actual: features.len(),
            });
        }

        let start = Instant::now();
        let probability = self
            .classifier
            .predict_proba(features)
            .map_err(|e| InferenceError::Runtime(format!("{:#}", e)))?;

        let elapsed = start.elapsed();
        self.inference_count.fetch_add(1, Ordering::Relaxed);
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            self.slow_inference_count.fetch_add(1, Ordering::Relaxed);
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(InferenceError::InvalidOutput(probability));
        }
        Ok(probability)
    }

    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            slow_inferences: self.slow_inference_count.load(Ordering::Relaxed),
        }
    }
}

fn load_classifier(path: &Path, input_width: usize) -> Result<(OnnxClassifier, ArtifactSource)> {
    let artifact = read_artifact(path)?;
    let classifier = OnnxClassifier::from_bytes(&artifact.bytes, input_width)?;
    Ok((classifier, artifact.source))
}
