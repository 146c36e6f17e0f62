//! Dual-model scoring engine for fraud detection.
//!
//! Two independently trained models feed one [`Verdict`]:
//!
//! - the classifier, queried on *scaled* features, gives the fraud
//!   probability and the thresholded label;
//! - the anomaly detector, queried on *raw* features, flags outliers.
//!
//! The two signals are reported side by side and never merged into a single
//! boolean. A model whose artifact is missing is skipped, and the verdict
//! says so instead of failing the caller.

use crate::config::{DetectionConfig, ScoringMode};
use crate::error::ScoringError;
use crate::models::artifacts::{AnomalyDetector, ArtifactContext, Classifier};
use crate::preprocessor::Preprocessor;
use crate::types::features::FeatureVector;
use crate::types::verdict::{Verdict, CLASSIFIER_REQUIRED, TRAINING_REQUIRED};
use std::sync::Arc;
use tracing::debug;

pub const CLASSIFIER_NOTICE: &str = "Classifier not loaded. Run classifier training first.";
pub const SCALER_NOTICE: &str = "Scaler not loaded. Run classifier training first.";
pub const ANOMALY_NOTICE: &str = "Anomaly detector not loaded. Run anomaly detector training first.";

/// Stateless scorer over shared, read-only artifacts
#[derive(Clone)]
pub struct ScoringEngine {
    artifacts: Arc<ArtifactContext>,
    preprocessor: Preprocessor,
    mode: ScoringMode,
    detection: DetectionConfig,
}

impl ScoringEngine {
    pub fn new(
        artifacts: Arc<ArtifactContext>,
        mode: ScoringMode,
        detection: DetectionConfig,
    ) -> Self {
        Self {
            preprocessor: Preprocessor::new(artifacts.clone()),
            artifacts,
            mode,
            detection,
        }
    }

    /// Engine over the same artifacts with a different scoring path
    pub fn with_mode(&self, mode: ScoringMode) -> Self {
        Self {
            mode,
            ..self.clone()
        }
    }

    pub fn mode(&self) -> ScoringMode {
        self.mode
    }

    pub fn artifacts(&self) -> &ArtifactContext {
        &self.artifacts
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    /// Score one feature vector.
    ///
    /// Missing artifacts never produce an `Err`; only failures inside a
    /// model that *is* loaded do.
    pub fn score(&self, features: &FeatureVector) -> Result<Verdict, ScoringError> {
        let verdict = match self.mode {
            ScoringMode::Classifier => self.score_classifier(features)?,
            ScoringMode::Combined => self.score_combined(features)?,
        };

        debug!(
            mode = ?self.mode,
            probability = ?verdict.probability,
            label = ?verdict.label,
            anomaly = ?verdict.anomaly,
            available = verdict.is_available(),
            "Scoring complete"
        );

        Ok(verdict)
    }

    /// Score several vectors independently
    pub fn score_batch(&self, batch: &[FeatureVector]) -> Vec<Result<Verdict, ScoringError>> {
        batch.iter().map(|f| self.score(f)).collect()
    }

    fn score_classifier(&self, features: &FeatureVector) -> Result<Verdict, ScoringError> {
        let Some(classifier) = self.artifacts.classifier.get() else {
            return Ok(Verdict::unavailable(CLASSIFIER_REQUIRED));
        };

        match self.classify(classifier.as_ref(), features)? {
            Some(verdict) => Ok(verdict),
            None => Ok(Verdict::unavailable(CLASSIFIER_REQUIRED)),
        }
    }

    fn score_combined(&self, features: &FeatureVector) -> Result<Verdict, ScoringError> {
        let classifier = self.artifacts.classifier.get();
        let detector = self.artifacts.anomaly_detector.get();

        if classifier.is_none() && detector.is_none() {
            return Ok(Verdict::unavailable(TRAINING_REQUIRED));
        }

        let anomaly = match detector {
            Some(detector) => Some(self.is_anomalous(detector.as_ref(), features)?),
            None => None,
        };

        let mut verdict = match classifier {
            Some(classifier) => match self.classify(classifier.as_ref(), features)? {
                Some(verdict) => verdict,
                None => Verdict::default().with_notice(SCALER_NOTICE),
            },
            None => Verdict::default().with_notice(CLASSIFIER_NOTICE),
        };

        verdict = match anomaly {
            Some(flag) => verdict.with_anomaly(flag),
            None => verdict.with_notice(ANOMALY_NOTICE),
        };

        if !verdict.is_available() {
            // e.g. classifier present but its scaler missing, and no detector
            let notices = verdict.notices;
            return Ok(Verdict {
                notices,
                ..Verdict::unavailable(TRAINING_REQUIRED)
            });
        }

        Ok(verdict)
    }

    /// Scale then classify. `None` when the scaler is not loaded.
    fn classify(
        &self,
        classifier: &dyn Classifier,
        features: &FeatureVector,
    ) -> Result<Option<Verdict>, ScoringError> {
        let scaled = match self.preprocessor.scale(features) {
            Ok(scaled) => scaled,
            Err(ScoringError::PreprocessingUnavailable) => return Ok(None),
            Err(e) => return Err(e),
        };

        let probability = classifier.fraud_probability(&scaled)?;
        if !probability.is_finite() {
            return Err(ScoringError::Inference {
                model: "classifier",
                reason: format!("{} returned non-finite probability", classifier.name()),
            });
        }
        debug!(model = classifier.name(), probability, "Classifier scored");

        Ok(Some(Verdict::classified(
            probability,
            self.detection.fraud_threshold,
        )))
    }

    fn is_anomalous(
        &self,
        detector: &dyn AnomalyDetector,
        features: &FeatureVector,
    ) -> Result<bool, ScoringError> {
        let raw = detector.raw_prediction(features)?;
        debug!(model = detector.name(), raw, "Anomaly detector scored");
        Ok(raw == self.detection.anomaly_sentinel)
    }
}
