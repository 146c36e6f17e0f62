//! HTTP error mapping

use crate::error::ScoringError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    /// Request body is well-formed JSON but not a scorable input
    Validation(String),

    /// Body the JSON extractor could not turn into the request type
    Rejected(StatusCode, String),

    /// A dependency of the endpoint is not available
    Unavailable(String),

    /// A loaded model failed while scoring
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.as_str()),
            AppError::Rejected(status, msg) => (*status, msg.as_str()),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.as_str()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Rejected(rejection.status(), rejection.body_text())
    }
}

impl From<ScoringError> for AppError {
    fn from(err: ScoringError) -> Self {
        match err {
            ScoringError::MalformedFeatureVector { .. }
            | ScoringError::NonFiniteFeature { .. }
            | ScoringError::UnknownFeature(_) => AppError::Validation(err.to_string()),
            ScoringError::PreprocessingUnavailable | ScoringError::Inference { .. } => {
                AppError::Internal(err.to_string())
            }
        }
    }
}
