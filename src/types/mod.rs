//! Type definitions for fraud scoring

pub mod features;
pub mod verdict;

pub use features::{FeatureVector, ScaledFeatureVector, AMOUNT_INDEX, FEATURE_COUNT};
pub use verdict::Verdict;
