//! Error types for artifact loading and scoring

use std::path::PathBuf;
use thiserror::Error;

/// Why an artifact slot could not be filled at start-up.
///
/// A missing file and a corrupt file are kept apart so the health surface
/// can tell an operator which one to fix.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{slot} artifact not found at {path}")]
    NotFound { slot: &'static str, path: PathBuf },

    #[error("{slot} artifact at {path} is unusable: {reason}")]
    Corrupt {
        slot: &'static str,
        path: PathBuf,
        reason: String,
    },

    #[error("failed to read {slot} artifact at {path}: {source}")]
    Io {
        slot: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    /// Name of the slot the error belongs to
    pub fn slot(&self) -> &'static str {
        match self {
            LoadError::NotFound { slot, .. }
            | LoadError::Corrupt { slot, .. }
            | LoadError::Io { slot, .. } => slot,
        }
    }
}

/// Failures raised while building or scoring a feature vector.
///
/// Artifact absence is not represented here: the engine turns it into an
/// unavailable [`Verdict`](crate::types::Verdict) instead of failing.
#[derive(Debug, Error, PartialEq)]
pub enum ScoringError {
    #[error("feature vector must have exactly {expected} entries, got {actual}")]
    MalformedFeatureVector { expected: usize, actual: usize },

    #[error("feature at position {index} is not a finite number")]
    NonFiniteFeature { index: usize },

    #[error("unknown feature {0}")]
    UnknownFeature(String),

    #[error("scaling transform is not loaded")]
    PreprocessingUnavailable,

    #[error("{model} inference failed: {reason}")]
    Inference { model: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_keeps_slot() {
        let err = LoadError::NotFound {
            slot: "scaler",
            path: PathBuf::from("models/scaler.json"),
        };
        assert_eq!(err.slot(), "scaler");
        assert!(err.to_string().contains("models/scaler.json"));
    }

    #[test]
    fn test_malformed_message() {
        let err = ScoringError::MalformedFeatureVector {
            expected: 30,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "feature vector must have exactly 30 entries, got 3"
        );
    }
}
