//! Monitoring view handlers: status indicator, historical summary and the
//! live transaction scanner.

use super::error::{AppError, AppResult};
use super::AppState;
use crate::dataset::DatasetSummary;
use crate::models::artifacts::{ArtifactHealth, SystemStatus};
use crate::types::features::FeatureVector;
use crate::types::Verdict;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Scanner input; omitted fields take the form defaults
#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    #[serde(default = "default_amount")]
    pub amount: f64,
    #[serde(default)]
    pub v1: f64,
    #[serde(default)]
    pub v4: f64,
}

fn default_amount() -> f64 {
    150.0
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    #[serde(flatten)]
    pub verdict: Verdict,
    /// Fraud probability as a percentage, when labelled fraud
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_pct: Option<f64>,
    /// Complement of the fraud probability, when labelled legitimate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_pct: Option<f64>,
}

impl From<Verdict> for ScanResponse {
    fn from(verdict: Verdict) -> Self {
        let (confidence_pct, safety_pct) = match (verdict.label, verdict.probability) {
            (Some(1), Some(p)) => (Some(p * 100.0), None),
            (Some(_), Some(p)) => (None, Some((1.0 - p) * 100.0)),
            _ => (None, None),
        };
        Self {
            verdict,
            confidence_pct,
            safety_pct,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: SystemStatus,
    artifacts: ArtifactHealth,
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let artifacts = state.scanner.artifacts();
    Json(StatusResponse {
        status: artifacts.system_status(),
        artifacts: artifacts.health(),
    })
}

pub async fn summary(State(state): State<AppState>) -> AppResult<Json<DatasetSummary>> {
    match &*state.dataset {
        Ok(summary) => Ok(Json(summary.clone())),
        Err(message) => Err(AppError::Unavailable(message.clone())),
    }
}

/// Score a hand-entered transaction with both models
pub async fn scan(
    State(state): State<AppState>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> AppResult<Json<ScanResponse>> {
    let Json(req) = payload.map_err(|rejection| {
        state.metrics.record_rejection();
        rejection
    })?;

    if req.amount < 0.0 {
        state.metrics.record_rejection();
        return Err(AppError::Validation(format!(
            "amount must be non-negative, got {}",
            req.amount
        )));
    }

    let start = Instant::now();
    let features = FeatureVector::from_named([("Amount", req.amount), ("V1", req.v1), ("V4", req.v4)])?;
    let verdict = state.scanner.score(&features)?;
    state.metrics.record_verdict(&verdict, start.elapsed());

    tracing::info!(
        amount = req.amount,
        v1 = req.v1,
        v4 = req.v4,
        label = ?verdict.label,
        anomaly = ?verdict.anomaly,
        "Transaction scanned"
    );

    Ok(Json(verdict.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::verdict::DEFAULT_FRAUD_THRESHOLD;

    #[test]
    fn test_confidence_for_fraud() {
        let response = ScanResponse::from(Verdict::classified(0.8, DEFAULT_FRAUD_THRESHOLD));
        assert!((response.confidence_pct.unwrap() - 80.0).abs() < 1e-9);
        assert_eq!(response.safety_pct, None);
    }

    #[test]
    fn test_safety_for_legitimate() {
        let response = ScanResponse::from(Verdict::classified(0.25, DEFAULT_FRAUD_THRESHOLD));
        assert_eq!(response.confidence_pct, None);
        assert!((response.safety_pct.unwrap() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_percentages_without_classifier() {
        let response = ScanResponse::from(Verdict::default().with_anomaly(true));
        assert_eq!(response.confidence_pct, None);
        assert_eq!(response.safety_pct, None);
    }

    #[test]
    fn test_scan_defaults() {
        let req: ScanRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.amount, 150.0);
        assert_eq!(req.v1, 0.0);
        assert_eq!(req.v4, 0.0);
    }
}
