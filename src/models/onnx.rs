//! ONNX Runtime backed classifier and anomaly detector

use crate::error::ScoringError;
use crate::models::artifacts::{AnomalyDetector, Classifier};
use crate::models::loader::LoadedModel;
use crate::types::features::{FeatureVector, ScaledFeatureVector};
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::session::SessionOutputs;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::sync::RwLock;
use tracing::{debug, warn};

/// Run one model on a single feature row, handing the outputs to `extract`.
fn run_model<T>(
    model: &RwLock<LoadedModel>,
    features: Vec<f32>,
    extract: impl FnOnce(&SessionOutputs<'_>, &str, &str) -> Result<T>,
) -> Result<T> {
    // Prepare input tensor - shape [1, num_features]
    let shape = vec![1_i64, features.len() as i64];
    let input_tensor =
        Tensor::from_array((shape, features)).context("Failed to create input tensor")?;

    let mut guard = model
        .write()
        .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
    let model = &mut *guard;

    let outputs = model
        .session
        .run(ort::inputs![&model.input_name => input_tensor])?;

    extract(&outputs, &model.name, &model.output_name)
}

/// Classifier exported to ONNX (e.g. a random forest)
pub struct OnnxClassifier {
    model: RwLock<LoadedModel>,
    name: String,
}

impl OnnxClassifier {
    pub fn new(model: LoadedModel) -> Self {
        let name = model.name.clone();
        Self {
            model: RwLock::new(model),
            name,
        }
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn fraud_probability(&self, features: &ScaledFeatureVector) -> Result<f64, ScoringError> {
        run_model(&self.model, features.to_f32(), |outputs, name, output_name| {
            extract_probability(outputs, output_name, name)
        })
        .and_then(bounded_probability)
        .map_err(|e| ScoringError::Inference {
            model: "classifier",
            reason: e.to_string(),
        })
    }
}

/// Anomaly detector exported to ONNX (e.g. an isolation forest)
pub struct OnnxAnomalyDetector {
    model: RwLock<LoadedModel>,
    name: String,
}

impl OnnxAnomalyDetector {
    pub fn new(model: LoadedModel) -> Self {
        let name = model.name.clone();
        Self {
            model: RwLock::new(model),
            name,
        }
    }
}

impl AnomalyDetector for OnnxAnomalyDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn raw_prediction(&self, features: &FeatureVector) -> Result<i64, ScoringError> {
        run_model(&self.model, features.to_f32(), |outputs, name, _| {
            extract_label(outputs, name)
        })
        .map_err(|e| ScoringError::Inference {
            model: "anomaly_detector",
            reason: e.to_string(),
        })
    }
}

/// Clamp into [0, 1]; NaN and infinities are model failures
fn bounded_probability(p: f64) -> Result<f64> {
    anyhow::ensure!(p.is_finite(), "non-finite probability {}", p);
    Ok(p.clamp(0.0, 1.0))
}

/// Extract fraud probability from model output.
/// Handles both tensor outputs and seq(map) outputs (zipmap exports).
fn extract_probability(
    outputs: &SessionOutputs<'_>,
    output_name: &str,
    model_name: &str,
) -> Result<f64> {
    if let Some(output) = outputs.get(output_name) {
        if let Some(prob) = probability_from_value(output, model_name) {
            return Ok(prob);
        }
    }

    // Fallback: any non-label output that yields a probability
    for (name, output) in outputs.iter() {
        if name.contains("label") {
            continue;
        }
        if let Some(prob) = probability_from_value(&output, model_name) {
            debug!(model = %model_name, output = %name, prob = prob, "Extracted probability (fallback)");
            return Ok(prob);
        }
    }

    anyhow::bail!("no probability output found")
}

fn probability_from_value(output: &DynValue, model_name: &str) -> Option<f64> {
    let dtype = output.dtype();

    if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
        let dims: Vec<i64> = shape.iter().copied().collect();
        let prob = fraud_prob_from_tensor(&dims, data)?;
        debug!(model = %model_name, prob = prob, "Extracted from tensor");
        return Some(prob);
    }

    if DynSequenceValueType::can_downcast(&dtype) {
        match extract_from_sequence_map(output) {
            Ok(prob) => {
                debug!(model = %model_name, prob = prob, "Extracted from seq(map)");
                return Some(prob);
            }
            Err(e) => warn!(model = %model_name, error = %e, "Unreadable seq(map) output"),
        }
    }

    None
}

/// Extract probability from seq(map(int64, float)) format
fn extract_from_sequence_map(output: &DynValue) -> Result<f64> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
    let map_value = maps
        .first()
        .ok_or_else(|| anyhow::anyhow!("Empty sequence"))?;

    let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;

    fraud_prob_from_pairs(&kv_pairs).ok_or_else(|| anyhow::anyhow!("No probability found in map"))
}

/// Class 1 probability from zipmap `(class, probability)` pairs,
/// falling back to the complement of class 0
fn fraud_prob_from_pairs(pairs: &[(i64, f32)]) -> Option<f64> {
    if let Some((_, prob)) = pairs.iter().find(|(class_id, _)| *class_id == 1) {
        return Some(*prob as f64);
    }
    pairs
        .iter()
        .find(|(class_id, _)| *class_id == 0)
        .map(|(_, prob)| 1.0 - *prob as f64)
}

/// Fraud-class probability from a `[batch, classes]` or `[classes]` tensor
fn fraud_prob_from_tensor(dims: &[i64], data: &[f32]) -> Option<f64> {
    let num_classes = match dims {
        [_, classes] | [classes] => *classes,
        _ => return data.last().map(|&v| v as f64),
    };

    match num_classes {
        n if n >= 2 => data.get(1).map(|&v| v as f64),
        1 => data.first().map(|&v| v as f64),
        _ => None,
    }
}

/// Output names with label outputs first, original order kept otherwise
fn label_outputs_first<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let (mut labels, others): (Vec<&str>, Vec<&str>) =
        names.into_iter().partition(|name| name.contains("label"));
    labels.extend(others);
    labels
}

/// Extract the raw predicted label from the detector's label output.
///
/// Isolation forest exports emit `label` (int64, -1/1) and `scores`. Only a
/// label-named output may carry the label as a float.
fn extract_label(outputs: &SessionOutputs<'_>, model_name: &str) -> Result<i64> {
    let names: Vec<&str> = outputs.iter().map(|(name, _)| name).collect();

    for name in label_outputs_first(names) {
        let Some(output) = outputs.get(name) else {
            continue;
        };
        if let Ok((_, data)) = output.try_extract_tensor::<i64>() {
            if let Some(&label) = data.first() {
                debug!(model = %model_name, output = %name, label = label, "Extracted label");
                return Ok(label);
            }
        }
        if name.contains("label") {
            if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
                if let Some(&label) = data.first() {
                    return Ok(label.round() as i64);
                }
            }
        }
    }

    anyhow::bail!("no label output found")
}
