//! Artifact loading: ONNX sessions and the fitted scaler

use crate::config::ModelsConfig;
use crate::error::LoadError;
use crate::models::artifacts::{
    AnomalyDetector, ArtifactContext, Classifier, ANOMALY_SLOT, CLASSIFIER_SLOT, SCALER_SLOT,
};
use crate::models::onnx::{OnnxAnomalyDetector, OnnxClassifier};
use crate::preprocessor::StandardScaler;
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use std::sync::Once;
use tracing::{info, warn};

static ORT_INIT: Once = Once::new();

/// Loaded ONNX model with metadata
pub struct LoadedModel {
    /// Model name
    pub name: String,
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the model
    pub input_name: String,
    /// Output name for probabilities
    pub output_name: String,
}

/// Loader for the classifier, scaler and anomaly detector artifacts
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self { onnx_threads }
    }

    /// Load a single ONNX model from file
    pub fn load_model(
        &self,
        path: &Path,
        slot: &'static str,
    ) -> Result<LoadedModel, LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound {
                slot,
                path: path.to_path_buf(),
            });
        }

        // Runtime is only brought up once a model file actually exists
        ORT_INIT.call_once(|| match ort::init().with_name("fraud-guard").commit() {
            Ok(_) => info!(onnx_threads = self.onnx_threads, "ONNX Runtime initialized"),
            Err(e) => warn!(error = %e, "ONNX Runtime initialization failed"),
        });

        info!(model = %slot, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()
            .map_err(corrupt(slot, path))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(corrupt(slot, path))?
            .with_intra_threads(self.onnx_threads)
            .map_err(corrupt(slot, path))?
            .commit_from_file(path)
            .map_err(corrupt(slot, path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_names: Vec<&str> = session.outputs.iter().map(|o| o.name.as_str()).collect();
        let output_name = probability_output(&output_names)
            .unwrap_or("probabilities")
            .to_string();

        info!(
            model = %slot,
            input = %input_name,
            output = %output_name,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            name: slot.to_string(),
            session,
            input_name,
            output_name,
        })
    }

    pub fn load_classifier(&self, path: &Path) -> Result<Box<dyn Classifier>, LoadError> {
        let model = self.load_model(path, CLASSIFIER_SLOT)?;
        Ok(Box::new(OnnxClassifier::new(model)))
    }

    pub fn load_anomaly_detector(&self, path: &Path) -> Result<Box<dyn AnomalyDetector>, LoadError> {
        let model = self.load_model(path, ANOMALY_SLOT)?;
        Ok(Box::new(OnnxAnomalyDetector::new(model)))
    }

    /// Load every slot into `context`. A failed slot is recorded, never fatal.
    pub fn load_into(&self, context: &ArtifactContext, models: &ModelsConfig) {
        let classifier = self.load_classifier(&models.classifier_path());
        report(context.classifier.name(), &classifier, |c| c.name());
        context.classifier.install(classifier);

        let scaler = load_scaler(&models.scaler_path());
        report(context.scaler.name(), &scaler, |_| "standard_scaler");
        context.scaler.install(scaler);

        let detector = self.load_anomaly_detector(&models.anomaly_path());
        report(context.anomaly_detector.name(), &detector, |d| d.name());
        context.anomaly_detector.install(detector);

        info!(
            status = ?context.system_status(),
            models_dir = %models.models_dir,
            "Artifact loading complete"
        );
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::with_threads(1)
    }
}

/// Read fitted scaler parameters from a JSON file
pub fn load_scaler(path: &Path) -> Result<StandardScaler, LoadError> {
    let contents = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound {
                slot: SCALER_SLOT,
                path: path.to_path_buf(),
            }
        } else {
            LoadError::Io {
                slot: SCALER_SLOT,
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    serde_json::from_str(&contents).map_err(|e| LoadError::Corrupt {
        slot: SCALER_SLOT,
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn corrupt<'a, E: std::fmt::Display>(slot: &'static str, path: &'a Path) -> impl Fn(E) -> LoadError + 'a {
    move |e| LoadError::Corrupt {
        slot,
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

/// Pick the output holding class probabilities.
///
/// sklearn exports list `output_label` before `output_probability` (or
/// `label` before `probabilities`), so a name containing "prob" wins over
/// the generic "output" match, which wins over the last output.
fn probability_output<'a>(names: &[&'a str]) -> Option<&'a str> {
    names
        .iter()
        .find(|name| name.contains("prob"))
        .or_else(|| {
            names
                .iter()
                .find(|name| name.contains("output") && !name.contains("label"))
        })
        .or_else(|| names.last())
        .copied()
}

fn report<T>(slot: &str, result: &Result<T, LoadError>, model_name: impl Fn(&T) -> &str) {
    match result {
        Ok(artifact) => info!(slot = %slot, model = %model_name(artifact), "Artifact loaded"),
        Err(LoadError::NotFound { path, .. }) => {
            warn!(slot = %slot, path = %path.display(), "Artifact file not found")
        }
        Err(e) => warn!(slot = %slot, error = %e, "Failed to load artifact"),
    }
}
