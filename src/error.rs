use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("validation failure: {0}")]
    ValidationFailure(String),

    #[error("business rule violation: {0}")]
    BusinessRuleViolation(String),

    #[error("invalid distance: {0}")]
    InvalidDistance(f64),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NetworkFailure(_) => "network_failure",
            AppError::ValidationFailure(_) => "validation_failure",
            AppError::BusinessRuleViolation(_) => "business_rule_violation",
            AppError::InvalidDistance(_) => "invalid_distance",
            AppError::NotFound(_) => "not_found",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NetworkFailure(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::ValidationFailure(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::BusinessRuleViolation(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::InvalidDistance(distance) => (
                StatusCode::BAD_REQUEST,
                format!("distance must be a finite, non-negative number of km, got {distance}"),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message,
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}
