//! Prediction service handlers

use super::error::AppResult;
use super::AppState;
use crate::config::ScoringMode;
use crate::models::artifacts::ArtifactHealth;
use crate::metrics::MetricsSnapshot;
use crate::types::{FeatureVector, Verdict};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub features: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct PreprocessorInfo {
    available: bool,
    feature_count: usize,
    /// Field order `/predict` expects
    features: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    /// Classifier and scaler both loaded, i.e. `/predict` can score
    model_loaded: bool,
    mode: ScoringMode,
    artifacts: ArtifactHealth,
    preprocessor: PreprocessorInfo,
    version: &'static str,
    timestamp: i64,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let artifacts = state.engine.artifacts();
    let preprocessor = state.engine.preprocessor();
    Json(HealthResponse {
        status: "ok",
        model_loaded: artifacts.classifier.is_loaded() && artifacts.scaler.is_loaded(),
        mode: state.engine.mode(),
        artifacts: artifacts.health(),
        preprocessor: PreprocessorInfo {
            available: preprocessor.is_available(),
            feature_count: preprocessor.feature_count(),
            features: preprocessor.feature_names(),
        },
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
    })
}

/// Score one feature vector with the configured mode
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> AppResult<Json<Verdict>> {
    let request_id = Uuid::new_v4();
    let start = Instant::now();

    let Json(req) = payload.map_err(|rejection| {
        state.metrics.record_rejection();
        tracing::warn!(request_id = %request_id, error = %rejection, "Rejected request body");
        rejection
    })?;

    let features = match FeatureVector::try_from(req.features) {
        Ok(features) => features,
        Err(e) => {
            state.metrics.record_rejection();
            tracing::warn!(request_id = %request_id, error = %e, "Rejected feature vector");
            return Err(e.into());
        }
    };

    let verdict = state.engine.score(&features).map_err(|e| {
        state.metrics.record_rejection();
        tracing::error!(request_id = %request_id, error = %e, "Scoring failed");
        e
    })?;

    let elapsed = start.elapsed();
    state.metrics.record_verdict(&verdict, elapsed);

    tracing::debug!(
        request_id = %request_id,
        probability = ?verdict.probability,
        label = ?verdict.label,
        anomaly = ?verdict.anomaly,
        elapsed_us = elapsed.as_micros() as u64,
        "Prediction served"
    );

    Ok(Json(verdict))
}

pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
