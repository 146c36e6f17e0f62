//! HTTP surface: prediction service and monitoring view
//!
//! ```text
//! GET  /health           artifact load state
//! POST /predict          score {"features": [30 numbers]}
//! GET  /metrics          scoring metrics snapshot
//! GET  /monitor/status   fully_active | partial | not_loaded
//! GET  /monitor/summary  historical table statistics
//! POST /monitor/scan     score {"amount", "v1", "v4"} with both models
//! ```

pub mod error;
pub mod handlers;
pub mod monitor;

use crate::config::{AppConfig, ScoringMode};
use crate::dataset::{DatasetError, DatasetSummary};
use crate::metrics::ScoringMetrics;
use crate::models::{ArtifactContext, ScoringEngine};
use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Engine in the configured prediction mode
    pub engine: ScoringEngine,
    /// Engine used by the scanner, always combined
    pub scanner: ScoringEngine,
    pub metrics: Arc<ScoringMetrics>,
    /// Historical summary computed at start-up, or why it is missing
    pub dataset: Arc<Result<DatasetSummary, String>>,
}

impl AppState {
    pub fn new(
        artifacts: Arc<ArtifactContext>,
        config: &AppConfig,
        dataset: Result<DatasetSummary, DatasetError>,
    ) -> Self {
        let engine = ScoringEngine::new(artifacts, config.models.mode, config.detection);
        Self {
            scanner: engine.with_mode(ScoringMode::Combined),
            engine,
            metrics: Arc::new(ScoringMetrics::new()),
            dataset: Arc::new(dataset.map_err(|e| e.to_string())),
        }
    }
}

/// Create the router with all routes
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/predict", post(handlers::predict))
        .route("/metrics", get(handlers::metrics))
        .route("/monitor/status", get(monitor::status))
        .route("/monitor/summary", get(monitor::summary))
        .route("/monitor/scan", post(monitor::scan))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(config: &AppConfig, state: AppState) -> Result<()> {
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
