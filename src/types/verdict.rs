//! Scoring verdicts returned to callers

use serde::Serialize;

/// Positive-class probability above which a transaction is labelled fraud
pub const DEFAULT_FRAUD_THRESHOLD: f64 = 0.5;

/// Raw anomaly detector output that marks an outlier
pub const OUTLIER_SENTINEL: i64 = -1;

/// Message returned when no scoring path has its artifacts
pub const TRAINING_REQUIRED: &str = "Models not found. Run training first.";

/// Message returned by classifier-only scoring when the classifier or scaler is missing
pub const CLASSIFIER_REQUIRED: &str = "Model or scaler not found. Run training first.";

/// Binary fraud label for a probability; ties go to "not fraud".
pub fn fraud_label(probability: f64, threshold: f64) -> u8 {
    u8::from(probability > threshold)
}

/// Result of one scoring call.
///
/// Absent fields mean the corresponding model did not run. They are never
/// filled with defaults: a missing anomaly flag is not "normal".
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Verdict {
    /// Positive-class probability (0.0 - 1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,

    /// 1 = fraud, 0 = not fraud
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<u8>,

    /// Anomaly detector flag, combined mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<bool>,

    /// Replaces every other field when no model could run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Sub-signals that were skipped and what to do about it
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<String>,
}

impl Verdict {
    /// Verdict carrying a classifier result
    pub fn classified(probability: f64, threshold: f64) -> Self {
        Self {
            probability: Some(probability),
            label: Some(fraud_label(probability, threshold)),
            ..Self::default()
        }
    }

    /// Error-only verdict, no numeric fields
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_anomaly(mut self, anomaly: bool) -> Self {
        self.anomaly = Some(anomaly);
        self
    }

    pub fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.notices.push(notice.into());
        self
    }

    /// True when at least one model produced a signal
    pub fn is_available(&self) -> bool {
        self.error.is_none() && (self.probability.is_some() || self.anomaly.is_some())
    }

    pub fn is_fraud(&self) -> bool {
        self.label == Some(1)
    }
}
