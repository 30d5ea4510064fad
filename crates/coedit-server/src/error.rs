//! API error types with HTTP status code mapping.
//!
//! [`ApiError`] is the unified error type for all API endpoints. It implements
//! `axum::response::IntoResponse` to produce structured JSON error responses
//! with appropriate HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::concurrency::LockError;

/// Structured error detail in API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "CONFLICT").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API errors with HTTP status code mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Entity not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid request (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal server error (500).
    #[error("internal error: {0}")]
    InternalError(String),

    /// Resource conflict (409).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::InternalError(msg) => {
                tracing::error!("internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
        };

        let detail = ApiErrorDetail {
            code: code.to_string(),
            message,
        };
        let body = serde_json::json!({
            "success": false,
            "error": detail,
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<LockError> for ApiError {
    fn from(err: LockError) -> Self {
        match &err {
            LockError::AlreadyLocked { .. } => ApiError::Conflict(err.to_string()),
            LockError::NotFound(_) => ApiError::NotFound(err.to_string()),
        }
    }
}

impl From<coedit_core::CoreError> for ApiError {
    fn from(err: coedit_core::CoreError) -> Self {
        match &err {
            coedit_core::CoreError::DuplicatePageId { .. }
            | coedit_core::CoreError::EmptySnapshotId => ApiError::BadRequest(err.to_string()),
        }
    }
}
