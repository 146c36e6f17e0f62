//! Feature vectors for credit card fraud scoring
//!
//! One transaction is 30 numeric fields: the elapsed `Time`, 28 anonymized
//! signals `V1..V28`, and the monetary `Amount` in the last position. The
//! order matches the column order the artifacts were trained on.

use crate::error::ScoringError;
use serde::{Deserialize, Serialize};

/// Number of fields in a feature vector
pub const FEATURE_COUNT: usize = 30;

/// Position of the monetary amount field
pub const AMOUNT_INDEX: usize = 29;

/// Field names in training column order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Time", "V1", "V2", "V3", "V4", "V5", "V6", "V7", "V8", "V9", "V10", "V11", "V12", "V13",
    "V14", "V15", "V16", "V17", "V18", "V19", "V20", "V21", "V22", "V23", "V24", "V25", "V26",
    "V27", "V28", "Amount",
];

/// Resolve a field name (case-insensitive) to its position.
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_NAMES
        .iter()
        .position(|candidate| candidate.eq_ignore_ascii_case(name.trim()))
}

/// Raw, unscaled transaction features.
///
/// Always exactly [`FEATURE_COUNT`] finite values. Inputs of any other length
/// are rejected at construction instead of being scored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    /// All fields zero
    pub fn zeroed() -> Self {
        Self([0.0; FEATURE_COUNT])
    }

    /// Build from a full array of values
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Result<Self, ScoringError> {
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(ScoringError::NonFiniteFeature { index });
        }
        Ok(Self(values))
    }

    /// Build from named fields; every field not mentioned stays zero.
    pub fn from_named<I, S>(fields: I) -> Result<Self, ScoringError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut vector = Self::zeroed();
        for (name, value) in fields {
            let name = name.as_ref();
            let index =
                feature_index(name).ok_or_else(|| ScoringError::UnknownFeature(name.to_string()))?;
            vector = vector.with_field(index, value)?;
        }
        Ok(vector)
    }

    /// Return a copy with one field replaced
    pub fn with_field(mut self, index: usize, value: f64) -> Result<Self, ScoringError> {
        if index >= FEATURE_COUNT {
            return Err(ScoringError::UnknownFeature(index.to_string()));
        }
        if !value.is_finite() {
            return Err(ScoringError::NonFiniteFeature { index });
        }
        self.0[index] = value;
        Ok(self)
    }

    /// Return a copy with the amount field replaced
    pub fn with_amount(self, amount: f64) -> Result<Self, ScoringError> {
        self.with_field(AMOUNT_INDEX, amount)
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    pub fn amount(&self) -> f64 {
        self.0[AMOUNT_INDEX]
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    /// Single-precision copy for tensor input
    pub fn to_f32(&self) -> Vec<f32> {
        self.0.iter().map(|&v| v as f32).collect()
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl TryFrom<&[f64]> for FeatureVector {
    type Error = ScoringError;

    fn try_from(values: &[f64]) -> Result<Self, Self::Error> {
        let array: [f64; FEATURE_COUNT] =
            values
                .try_into()
                .map_err(|_| ScoringError::MalformedFeatureVector {
                    expected: FEATURE_COUNT,
                    actual: values.len(),
                })?;
        Self::from_values(array)
    }
}

impl TryFrom<Vec<f64>> for FeatureVector {
    type Error = ScoringError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::try_from(values.as_slice())
    }
}

impl From<FeatureVector> for Vec<f64> {
    fn from(vector: FeatureVector) -> Self {
        vector.0.to_vec()
    }
}

/// Feature vector after the fitted standardization transform.
///
/// Only the preprocessor can build one, so a classifier can never be handed
/// raw features by mistake.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledFeatureVector([f64; FEATURE_COUNT]);

impl ScaledFeatureVector {
    pub(crate) fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    /// Single-precision copy for tensor input
    pub fn to_f32(&self) -> Vec<f32> {
        self.0.iter().map(|&v| v as f32).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_names_layout() {
        assert_eq!(FEATURE_NAMES[0], "Time");
        assert_eq!(FEATURE_NAMES[1], "V1");
        assert_eq!(FEATURE_NAMES[28], "V28");
        assert_eq!(FEATURE_NAMES[AMOUNT_INDEX], "Amount");
        assert_eq!(feature_index("amount"), Some(AMOUNT_INDEX));
        assert_eq!(feature_index("v4"), Some(4));
        assert_eq!(feature_index("V29"), None);
    }

    #[test]
    fn test_rejects_wrong_length() {
        let err = FeatureVector::try_from(vec![0.0; 29]).unwrap_err();
        assert_eq!(
            err,
            ScoringError::MalformedFeatureVector {
                expected: 30,
                actual: 29
            }
        );
        assert!(FeatureVector::try_from(vec![0.0; 31]).is_err());
        assert!(FeatureVector::try_from(Vec::new()).is_err());
    }

    #[test]
    fn test_rejects_non_finite() {
        let mut values = vec![0.0; FEATURE_COUNT];
        values[7] = f64::NAN;
        assert_eq!(
            FeatureVector::try_from(values).unwrap_err(),
            ScoringError::NonFiniteFeature { index: 7 }
        );
    }

    #[test]
    fn test_named_fields_default_to_zero() {
        let vector = FeatureVector::from_named([("Amount", 150.0), ("V1", -10.0)]).unwrap();
        assert_eq!(vector.amount(), 150.0);
        assert_eq!(vector.get(1), Some(-10.0));
        let zeros = vector
            .values()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 1 && *i != AMOUNT_INDEX)
            .all(|(_, &v)| v == 0.0);
        assert!(zeros);
    }

    #[test]
    fn test_unknown_name_rejected() {
        let err = FeatureVector::from_named([("merchant", 1.0)]).unwrap_err();
        assert_eq!(err, ScoringError::UnknownFeature("merchant".to_string()));
    }

    #[test]
    fn test_json_shape() {
        let vector: FeatureVector = serde_json::from_str(&format!(
            "[{}]",
            vec!["1.5"; FEATURE_COUNT].join(",")
        ))
        .unwrap();
        assert_eq!(vector.get(0), Some(1.5));

        let short: Result<FeatureVector, _> = serde_json::from_str("[1.0, 2.0]");
        assert!(short.is_err());
    }
}
