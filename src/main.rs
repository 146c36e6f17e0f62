//! Fraud Guard - Main Entry Point
//!
//! Loads the scoring artifacts once, then serves predictions and the
//! monitoring view over HTTP.

use anyhow::Result;
use fraud_guard::{
    config::{AppConfig, LoggingConfig},
    dataset,
    metrics::MetricsReporter,
    models::{ArtifactContext, ModelLoader},
    server::{self, AppState},
};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    init_tracing(&config.logging)?;

    info!("Starting Fraud Guard v{}", env!("CARGO_PKG_VERSION"));
    info!(
        mode = ?config.models.mode,
        fraud_threshold = config.detection.fraud_threshold,
        anomaly_sentinel = config.detection.anomaly_sentinel,
        "Configuration loaded successfully"
    );

    // Artifacts are loaded exactly once; missing files only degrade scoring
    let artifacts = Arc::new(ArtifactContext::new());
    ModelLoader::with_threads(config.models.onnx_threads).load_into(&artifacts, &config.models);

    let summary = dataset::load_summary(Path::new(&config.dataset.path), config.dataset.amount_bins);
    if let Err(e) = &summary {
        warn!(error = %e, "Historical summary unavailable");
    }

    let state = AppState::new(artifacts, &config, summary);
    let metrics = state.metrics.clone();

    if config.server.metrics_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.server.metrics_interval_secs);
        tokio::spawn(reporter.start());
    }

    server::serve(&config, state).await?;

    info!("Fraud Guard shutting down...");
    metrics.log_summary();
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("fraud_guard={}", logging.level).parse()?)
        .add_directive("tower_http=info".parse()?);

    if logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}
