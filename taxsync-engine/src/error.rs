//! API error types for taxsync-engine

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - e.g., bulk operation already running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// taxsync-common error
    #[error("{0}")]
    Common(#[from] taxsync_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
            ApiError::Common(err) => return common_error_response(err),
        };

        error_body(status, error_code, &message)
    }
}

/// Upstream fetch failures surface as 502 so the operator can tell a broken
/// remote from a broken engine; validation failures as 400/404.
fn common_error_response(err: taxsync_common::Error) -> Response {
    use taxsync_common::Error;

    let (status, error_code) = match &err {
        Error::Network(_) => (StatusCode::BAD_GATEWAY, "NETWORK_ERROR"),
        Error::Auth(_) => (StatusCode::BAD_GATEWAY, "AUTH_ERROR"),
        Error::Parse(_) => (StatusCode::BAD_GATEWAY, "PARSE_ERROR"),
        Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
        Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };

    error_body(status, error_code, &err.to_string())
}

fn error_body(status: StatusCode, error_code: &str, message: &str) -> Response {
    let body = Json(json!({
        "error": {
            "code": error_code,
            "message": message,
        }
    }));

    (status, body).into_response()
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
