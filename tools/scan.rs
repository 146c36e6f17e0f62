//! Offline Transaction Scanner
//!
//! Loads the artifacts from the configured models directory and prints the
//! combined verdict for the designed test transactions, or for a vector
//! given on the command line.
//!
//! Usage: scan [comma-separated 30 values]

use anyhow::{Context, Result};
use fraud_guard::{
    config::{AppConfig, ScoringMode},
    models::{ArtifactContext, ModelLoader, ScoringEngine},
    types::FeatureVector,
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("scan=info".parse()?)
                .add_directive("fraud_guard=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load()?;

    let artifacts = Arc::new(ArtifactContext::new());
    ModelLoader::with_threads(config.models.onnx_threads).load_into(&artifacts, &config.models);
    info!(status = ?artifacts.system_status(), "Artifacts loaded");

    let engine = ScoringEngine::new(artifacts, ScoringMode::Combined, config.detection);

    let args: Vec<String> = std::env::args().collect();
    let inputs = match args.get(1) {
        Some(raw) => vec![("custom".to_string(), parse_vector(raw)?)],
        None => scenarios()?,
    };

    let vectors: Vec<FeatureVector> = inputs.iter().map(|(_, features)| *features).collect();
    let verdicts = engine.score_batch(&vectors);

    for ((name, features), verdict) in inputs.into_iter().zip(verdicts) {
        let verdict = verdict?;
        let line = json!({
            "scenario": name,
            "amount": features.amount(),
            "verdict": verdict,
        });
        println!("{}", line);
    }

    Ok(())
}

/// The designed checks: a plain purchase and two adversarial inputs
fn scenarios() -> Result<Vec<(String, FeatureVector)>> {
    Ok(vec![
        (
            "A: normal purchase".to_string(),
            FeatureVector::from_named([("Amount", 150.0)])?,
        ),
        (
            "B: V1 = -10".to_string(),
            FeatureVector::from_named([("V1", -10.0)])?,
        ),
        (
            "C: V4 = 5".to_string(),
            FeatureVector::from_named([("V4", 5.0)])?,
        ),
    ])
}

fn parse_vector(raw: &str) -> Result<FeatureVector> {
    let values = raw
        .split(',')
        .map(|field| {
            field
                .trim()
                .parse::<f64>()
                .with_context(|| format!("Invalid feature value {:?}", field))
        })
        .collect::<Result<Vec<f64>>>()?;

    Ok(FeatureVector::try_from(values)?)
}
