//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use orchestrator::OrchestratorError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Error surfaced by the transaction coordinator.
    Orchestrator(OrchestratorError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, serde_json::json!({ "error": msg }))
            }
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
            }
            ApiError::Orchestrator(err) => orchestrator_error_to_response(err),
        };

        (status, axum::Json(body)).into_response()
    }
}

fn orchestrator_error_to_response(err: OrchestratorError) -> (StatusCode, serde_json::Value) {
    let status = match &err {
        OrchestratorError::Validation(_) | OrchestratorError::InsufficientPoints { .. } => {
            StatusCode::BAD_REQUEST
        }
        OrchestratorError::TransactionNotFound(_) | OrchestratorError::CustomerNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        OrchestratorError::Conflict(_) => StatusCode::CONFLICT,
        OrchestratorError::UpstreamUnavailable(_) | OrchestratorError::DebitFailed { .. } => {
            StatusCode::BAD_GATEWAY
        }
        OrchestratorError::Persistence(_) | OrchestratorError::Internal(_) => {
            tracing::error!(error = %err, "internal server error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let mut body = serde_json::json!({ "error": err.to_string() });
    // Callers of a failed redemption need to know whether the local
    // discount was rolled back.
    if let OrchestratorError::DebitFailed { compensated, .. } = &err {
        body["compensated"] = serde_json::Value::Bool(*compensated);
    }

    (status, body)
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        ApiError::Orchestrator(err)
    }
}
