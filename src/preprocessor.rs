//! Feature preprocessing for classifier inference.
//!
//! The classifier was trained on standardized features, so raw vectors go
//! through the same fitted transform before scoring: per field, subtract the
//! learned mean and divide by the learned scale.

use crate::error::ScoringError;
use crate::models::artifacts::ArtifactContext;
use crate::types::features::{FeatureVector, ScaledFeatureVector, FEATURE_COUNT, FEATURE_NAMES};
use serde::Deserialize;
use std::sync::Arc;

/// Fitted standardization parameters, one mean and scale per field.
///
/// Serialized as `{"mean": [..30], "scale": [..30]}`, the attributes a
/// standard scaler exposes after fitting.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "ScalerParams")]
pub struct StandardScaler {
    mean: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
}

#[derive(Deserialize)]
struct ScalerParams {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl TryFrom<ScalerParams> for StandardScaler {
    type Error = String;

    fn try_from(params: ScalerParams) -> Result<Self, Self::Error> {
        StandardScaler::new(&params.mean, &params.scale)
    }
}

impl StandardScaler {
    /// Build from fitted parameters.
    ///
    /// A zero scale means the field was constant during fitting; it is
    /// replaced by 1.0 so the field is only centered.
    pub fn new(mean: &[f64], scale: &[f64]) -> Result<Self, String> {
        let mean: [f64; FEATURE_COUNT] = mean.try_into().map_err(|_| {
            format!("expected {} means, got {}", FEATURE_COUNT, mean.len())
        })?;
        let mut scale: [f64; FEATURE_COUNT] = scale.try_into().map_err(|_| {
            format!("expected {} scales, got {}", FEATURE_COUNT, scale.len())
        })?;

        if let Some(i) = mean.iter().position(|v| !v.is_finite()) {
            return Err(format!("mean for {} is not finite", FEATURE_NAMES[i]));
        }
        for (i, s) in scale.iter_mut().enumerate() {
            if !s.is_finite() || *s < 0.0 {
                return Err(format!("scale for {} is invalid: {}", FEATURE_NAMES[i], s));
            }
            if *s == 0.0 {
                *s = 1.0;
            }
        }

        Ok(Self { mean, scale })
    }

    /// Identity transform
    pub fn identity() -> Self {
        Self {
            mean: [0.0; FEATURE_COUNT],
            scale: [1.0; FEATURE_COUNT],
        }
    }

    pub fn transform(&self, features: &FeatureVector) -> ScaledFeatureVector {
        let raw = features.values();
        let mut scaled = [0.0; FEATURE_COUNT];
        for (i, out) in scaled.iter_mut().enumerate() {
            *out = (raw[i] - self.mean[i]) / self.scale[i];
        }
        ScaledFeatureVector::new(scaled)
    }

    pub fn mean(&self) -> &[f64; FEATURE_COUNT] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64; FEATURE_COUNT] {
        &self.scale
    }
}

/// Applies the loaded scaling transform to raw feature vectors.
#[derive(Clone)]
pub struct Preprocessor {
    artifacts: Arc<ArtifactContext>,
}

impl Preprocessor {
    pub fn new(artifacts: Arc<ArtifactContext>) -> Self {
        Self { artifacts }
    }

    /// Scale a raw vector; fails if the scaler slot is not loaded.
    pub fn scale(&self, features: &FeatureVector) -> Result<ScaledFeatureVector, ScoringError> {
        self.artifacts
            .scaler
            .get()
            .map(|scaler| scaler.transform(features))
            .ok_or(ScoringError::PreprocessingUnavailable)
    }

    pub fn is_available(&self) -> bool {
        self.artifacts.scaler.is_loaded()
    }

    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::features::AMOUNT_INDEX;

    fn amount_scaler() -> StandardScaler {
        let mut mean = vec![0.0; FEATURE_COUNT];
        let mut scale = vec![1.0; FEATURE_COUNT];
        mean[AMOUNT_INDEX] = 88.0;
        scale[AMOUNT_INDEX] = 250.0;
        StandardScaler::new(&mean, &scale).unwrap()
    }

    #[test]
    fn test_standardizes_each_field() {
        let scaler = amount_scaler();
        let features = FeatureVector::zeroed()
            .with_amount(338.0)
            .unwrap()
            .with_field(1, -10.0)
            .unwrap();

        let scaled = scaler.transform(&features);

        assert!((scaled.values()[AMOUNT_INDEX] - 1.0).abs() < 1e-12);
        assert_eq!(scaled.values()[1], -10.0);
        assert_eq!(scaled.values()[2], 0.0);
    }

    #[test]
    fn test_zero_scale_only_centers() {
        let mean = vec![2.0; FEATURE_COUNT];
        let scale = vec![0.0; FEATURE_COUNT];
        let scaler = StandardScaler::new(&mean, &scale).unwrap();

        let scaled = scaler.transform(&FeatureVector::zeroed());
        assert!(scaled.values().iter().all(|&v| v == -2.0));
    }

    #[test]
    fn test_rejects_wrong_shape() {
        let err = StandardScaler::new(&[0.0; 3], &[1.0; FEATURE_COUNT]).unwrap_err();
        assert!(err.contains("expected 30 means"));
        assert!(StandardScaler::new(&[0.0; FEATURE_COUNT], &[-1.0; FEATURE_COUNT]).is_err());
    }

    #[test]
    fn test_deserializes_fitted_params() {
        let json = serde_json::json!({
            "mean": vec![1.0; FEATURE_COUNT],
            "scale": vec![2.0; FEATURE_COUNT],
        });
        let scaler: StandardScaler = serde_json::from_value(json).unwrap();
        let scaled = scaler.transform(&FeatureVector::zeroed());
        assert!(scaled.values().iter().all(|&v| v == -0.5));

        let bad = serde_json::json!({ "mean": [1.0], "scale": [1.0] });
        assert!(serde_json::from_value::<StandardScaler>(bad).is_err());
    }

    #[test]
    fn test_unavailable_without_scaler() {
        let preprocessor = Preprocessor::new(Arc::new(ArtifactContext::new()));
        assert!(!preprocessor.is_available());
        assert_eq!(
            preprocessor.scale(&FeatureVector::zeroed()),
            Err(ScoringError::PreprocessingUnavailable)
        );
    }

    #[test]
    fn test_scales_with_loaded_scaler() {
        let artifacts = ArtifactContext::new();
        artifacts.scaler.install(Ok(amount_scaler()));
        let preprocessor = Preprocessor::new(Arc::new(artifacts));

        let scaled = preprocessor
            .scale(&FeatureVector::zeroed().with_amount(88.0).unwrap())
            .unwrap();
        assert_eq!(scaled.values()[AMOUNT_INDEX], 0.0);
        assert_eq!(preprocessor.feature_names().len(), preprocessor.feature_count());
    }
}
