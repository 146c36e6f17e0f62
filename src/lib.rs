//! Fraud Guard Library
//!
//! Scores credit card transactions with two independently trained models:
//! a supervised classifier producing a fraud probability and an
//! unsupervised detector producing an anomaly flag. The HTTP surface serves
//! predictions and a monitoring view over both.

pub mod config;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod models;
pub mod preprocessor;
pub mod server;
pub mod types;

pub use config::{AppConfig, ScoringMode};
pub use error::{LoadError, ScoringError};
pub use models::{ArtifactContext, ModelLoader, ScoringEngine};
pub use preprocessor::Preprocessor;
pub use types::{FeatureVector, Verdict};
