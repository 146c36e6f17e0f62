//! Trained artifacts and the scoring engine built on them

pub mod artifacts;
pub mod inference;
pub mod loader;
pub mod onnx;

#[cfg(test)]
pub(crate) mod testing;

pub use artifacts::{AnomalyDetector, ArtifactContext, Classifier};
pub use inference::ScoringEngine;
pub use loader::ModelLoader;
