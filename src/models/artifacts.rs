//! Trained artifacts and the context that owns them.
//!
//! Each artifact lives in its own slot. A slot is written at most once, at
//! start-up, and read by every scoring call afterwards. Readers see either an
//! empty slot or a finished load result, never a half-built artifact.

use crate::error::{LoadError, ScoringError};
use crate::preprocessor::StandardScaler;
use crate::types::features::{FeatureVector, ScaledFeatureVector};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub const CLASSIFIER_SLOT: &str = "classifier";
pub const SCALER_SLOT: &str = "scaler";
pub const ANOMALY_SLOT: &str = "anomaly_detector";

/// Supervised model producing a fraud probability from scaled features.
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    /// Probability of the positive (fraud) class, in [0, 1]
    fn fraud_probability(&self, features: &ScaledFeatureVector) -> Result<f64, ScoringError>;
}

/// Unsupervised model judging whether raw features look like an outlier.
pub trait AnomalyDetector: Send + Sync {
    fn name(&self) -> &str;

    /// Raw detector output; `-1` marks an outlier for isolation forests
    fn raw_prediction(&self, features: &FeatureVector) -> Result<i64, ScoringError>;
}

/// Load state of one slot as reported by health checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    NotLoaded,
    Loaded,
    Failed,
}

/// Single-assignment holder for one artifact
pub struct ArtifactSlot<T> {
    name: &'static str,
    cell: OnceLock<Result<T, LoadError>>,
}

impl<T> ArtifactSlot<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            cell: OnceLock::new(),
        }
    }

    /// Store the load result. Returns false if the slot was already filled;
    /// artifacts are never replaced while the process runs.
    pub fn install(&self, result: Result<T, LoadError>) -> bool {
        self.cell.set(result).is_ok()
    }

    pub fn get(&self) -> Option<&T> {
        self.cell.get().and_then(|r| r.as_ref().ok())
    }

    pub fn error(&self) -> Option<&LoadError> {
        self.cell.get().and_then(|r| r.as_ref().err())
    }

    pub fn is_loaded(&self) -> bool {
        self.get().is_some()
    }

    pub fn status(&self) -> SlotStatus {
        match self.cell.get() {
            None => SlotStatus::NotLoaded,
            Some(Ok(_)) => SlotStatus::Loaded,
            // absent file: nothing trained yet, reason kept in `error()`
            Some(Err(LoadError::NotFound { .. })) => SlotStatus::NotLoaded,
            Some(Err(_)) => SlotStatus::Failed,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Coarse status indicator for the monitoring view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemStatus {
    /// Classifier and anomaly detector both loaded
    FullyActive,
    /// Exactly one of them loaded
    Partial,
    NotLoaded,
}

/// Per-slot health snapshot
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactHealth {
    pub classifier: SlotStatus,
    pub scaler: SlotStatus,
    pub anomaly_detector: SlotStatus,
    /// Load failure messages keyed by slot name
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<&'static str, String>,
}

/// Everything scoring depends on, built once and shared read-only.
pub struct ArtifactContext {
    pub classifier: ArtifactSlot<Box<dyn Classifier>>,
    pub scaler: ArtifactSlot<StandardScaler>,
    pub anomaly_detector: ArtifactSlot<Box<dyn AnomalyDetector>>,
}

impl ArtifactContext {
    /// Context with no load attempted yet
    pub fn new() -> Self {
        Self {
            classifier: ArtifactSlot::new(CLASSIFIER_SLOT),
            scaler: ArtifactSlot::new(SCALER_SLOT),
            anomaly_detector: ArtifactSlot::new(ANOMALY_SLOT),
        }
    }

    pub fn health(&self) -> ArtifactHealth {
        let errors = [
            self.classifier.error(),
            self.scaler.error(),
            self.anomaly_detector.error(),
        ]
        .into_iter()
        .flatten()
        .map(|e| (e.slot(), e.to_string()))
        .collect();

        ArtifactHealth {
            classifier: self.classifier.status(),
            scaler: self.scaler.status(),
            anomaly_detector: self.anomaly_detector.status(),
            errors,
        }
    }

    pub fn system_status(&self) -> SystemStatus {
        match (
            self.classifier.is_loaded(),
            self.anomaly_detector.is_loaded(),
        ) {
            (true, true) => SystemStatus::FullyActive,
            (false, false) => SystemStatus::NotLoaded,
            _ => SystemStatus::Partial,
        }
    }
}

impl Default for ArtifactContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct Constant(f64);

    impl Classifier for Constant {
        fn name(&self) -> &str {
            "constant"
        }

        fn fraud_probability(&self, _: &ScaledFeatureVector) -> Result<f64, ScoringError> {
            Ok(self.0)
        }
    }

    struct Inlier;

    impl AnomalyDetector for Inlier {
        fn name(&self) -> &str {
            "inlier"
        }

        fn raw_prediction(&self, _: &FeatureVector) -> Result<i64, ScoringError> {
            Ok(1)
        }
    }

    #[test]
    fn test_slot_status_flips_on_load() {
        let context = ArtifactContext::new();
        let before = context.health();
        assert_eq!(before.classifier, SlotStatus::NotLoaded);
        assert_eq!(before.scaler, SlotStatus::NotLoaded);
        assert_eq!(before.anomaly_detector, SlotStatus::NotLoaded);

        assert!(context.classifier.install(Ok(Box::new(Constant(0.1)))));

        let after = context.health();
        assert_eq!(after.classifier, SlotStatus::Loaded);
        assert_eq!(after.scaler, SlotStatus::NotLoaded);
        assert_eq!(after.anomaly_detector, SlotStatus::NotLoaded);
    }

    #[test]
    fn test_slot_is_written_once() {
        let slot: ArtifactSlot<StandardScaler> = ArtifactSlot::new(SCALER_SLOT);
        assert!(slot.install(Ok(StandardScaler::identity())));
        assert!(!slot.install(Err(LoadError::NotFound {
            slot: SCALER_SLOT,
            path: PathBuf::from("missing.json"),
        })));
        assert!(slot.is_loaded());
    }

    #[test]
    fn test_failed_slot_reports_reason() {
        let context = ArtifactContext::new();
        context.scaler.install(Err(LoadError::Corrupt {
            slot: SCALER_SLOT,
            path: PathBuf::from("models/scaler.json"),
            reason: "expected 30 means, got 2".to_string(),
        }));

        let health = context.health();
        assert_eq!(health.scaler, SlotStatus::Failed);
        assert!(health.errors["scaler"].contains("expected 30 means"));
        assert!(context.scaler.get().is_none());
    }

    #[test]
    fn test_missing_file_is_not_loaded() {
        let context = ArtifactContext::new();
        context.classifier.install(Err(LoadError::NotFound {
            slot: CLASSIFIER_SLOT,
            path: PathBuf::from("models/classifier.onnx"),
        }));

        let health = context.health();
        assert_eq!(health.classifier, SlotStatus::NotLoaded);
        assert!(health.errors["classifier"].contains("models/classifier.onnx"));
    }

    #[test]
    fn test_system_status() {
        let context = ArtifactContext::new();
        assert_eq!(context.system_status(), SystemStatus::NotLoaded);

        context.anomaly_detector.install(Ok(Box::new(Inlier)));
        assert_eq!(context.system_status(), SystemStatus::Partial);

        context.classifier.install(Ok(Box::new(Constant(0.2))));
        assert_eq!(context.system_status(), SystemStatus::FullyActive);
    }
}
