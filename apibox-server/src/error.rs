//! Error types for the HTTP API

use apibox_core::ApiBoxError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Route denied (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Unknown remote or resource (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Service unavailable (503)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Core engine error
    #[error("Engine error: {0}")]
    Engine(ApiBoxError),
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Human-readable message
    error: String,
    /// Stable machine-readable code
    code: &'static str,
}

impl From<ApiBoxError> for ApiError {
    fn from(err: ApiBoxError) -> Self {
        match err {
            ApiBoxError::RemoteNotFound(remote) => {
                ApiError::NotFound(format!("Remote '{}' not found", remote))
            }
            other => ApiError::Engine(other),
        }
    }
}

impl ApiError {
    /// HTTP status and error code
    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            ApiError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
            }
            ApiError::Engine(_) => (StatusCode::INTERNAL_SERVER_ERROR, "engine_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        let error = match self {
            ApiError::BadRequest(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Internal(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
            ApiError::Engine(e) => format!("Authorization engine error: {}", e),
        };

        (status, Json(ErrorResponse { error, code })).into_response()
    }
}
