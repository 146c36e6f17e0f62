//! Stand-in artifacts for unit tests

use crate::error::ScoringError;
use crate::models::artifacts::{AnomalyDetector, ArtifactContext, Classifier};
use crate::preprocessor::StandardScaler;
use crate::types::features::{FeatureVector, ScaledFeatureVector, AMOUNT_INDEX, FEATURE_COUNT};

/// Always returns the same probability
pub struct FixedClassifier(pub f64);

impl Classifier for FixedClassifier {
    fn name(&self) -> &str {
        "fixed"
    }

    fn fraud_probability(&self, _: &ScaledFeatureVector) -> Result<f64, ScoringError> {
        Ok(self.0)
    }
}

/// Returns the scaled amount as the probability
pub struct AmountEcho;

impl Classifier for AmountEcho {
    fn name(&self) -> &str {
        "amount_echo"
    }

    fn fraud_probability(&self, features: &ScaledFeatureVector) -> Result<f64, ScoringError> {
        Ok(features.values()[AMOUNT_INDEX].clamp(0.0, 1.0))
    }
}

/// Logistic model over scaled features
pub struct LogisticClassifier {
    pub bias: f64,
    pub weights: [f64; FEATURE_COUNT],
}

impl LogisticClassifier {
    /// Low risk at rest; strongly negative V1 or positive V4 push toward fraud
    pub fn baseline() -> Self {
        let mut weights = [0.0; FEATURE_COUNT];
        weights[1] = -0.9;
        weights[4] = 1.5;
        weights[AMOUNT_INDEX] = 0.2;
        Self {
            bias: -6.0,
            weights,
        }
    }
}

impl Classifier for LogisticClassifier {
    fn name(&self) -> &str {
        "logistic"
    }

    fn fraud_probability(&self, features: &ScaledFeatureVector) -> Result<f64, ScoringError> {
        let z = features
            .values()
            .iter()
            .zip(self.weights.iter())
            .fold(self.bias, |acc, (x, w)| acc + x * w);
        Ok(1.0 / (1.0 + (-z).exp()))
    }
}

pub struct BrokenClassifier;

impl Classifier for BrokenClassifier {
    fn name(&self) -> &str {
        "broken"
    }

    fn fraud_probability(&self, _: &ScaledFeatureVector) -> Result<f64, ScoringError> {
        Err(ScoringError::Inference {
            model: "classifier",
            reason: "session crashed".to_string(),
        })
    }
}

/// Always returns the same raw output
pub struct FixedDetector(pub i64);

impl AnomalyDetector for FixedDetector {
    fn name(&self) -> &str {
        "fixed"
    }

    fn raw_prediction(&self, _: &FeatureVector) -> Result<i64, ScoringError> {
        Ok(self.0)
    }
}

/// Outlier when any anonymized signal exceeds `limit` in magnitude
pub struct ThresholdDetector {
    pub limit: f64,
}

impl Default for ThresholdDetector {
    fn default() -> Self {
        Self { limit: 4.0 }
    }
}

impl AnomalyDetector for ThresholdDetector {
    fn name(&self) -> &str {
        "threshold"
    }

    fn raw_prediction(&self, features: &FeatureVector) -> Result<i64, ScoringError> {
        let outlier = features.values()[1..AMOUNT_INDEX]
            .iter()
            .any(|v| v.abs() > self.limit);
        Ok(if outlier { -1 } else { 1 })
    }
}

/// Scaler fitted on typical transaction amounts
pub fn baseline_scaler() -> StandardScaler {
    let mut mean = [0.0; FEATURE_COUNT];
    let mut scale = [1.0; FEATURE_COUNT];
    mean[AMOUNT_INDEX] = 88.35;
    scale[AMOUNT_INDEX] = 250.12;
    StandardScaler::new(&mean, &scale).expect("valid scaler")
}

/// All three slots filled with baseline stand-ins
pub fn baseline_context() -> ArtifactContext {
    let context = ArtifactContext::new();
    context
        .classifier
        .install(Ok(Box::new(LogisticClassifier::baseline())));
    context.scaler.install(Ok(baseline_scaler()));
    context
        .anomaly_detector
        .install(Ok(Box::new(ThresholdDetector::default())));
    context
}
