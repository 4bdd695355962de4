//! HTTP-facing error type: wraps [`resolver_core::Error`] plus the errors
//! this crate's own adapters (persistence, request decoding) can raise, and
//! maps each to an HTTP status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors the HTTP layer can surface.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Core resolution/composition/validation error.
    #[error("core error: {0}")]
    Core(#[from] resolver_core::error::Error),

    /// Query string or path parameter failed to decode.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Request body failed to deserialize.
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    /// Persistence adapter failure (disk I/O, etc).
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Unexpected error with no more specific variant.
    #[error("internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::Core(resolver_core::error::Error::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            Self::Core(resolver_core::error::Error::ValidationFailed { .. }) => {
                (StatusCode::BAD_REQUEST, "validation_failed")
            }
            Self::Core(resolver_core::error::Error::MalformedInput { .. }) => {
                (StatusCode::BAD_REQUEST, "malformed_input")
            }
            Self::Core(resolver_core::error::Error::Composition(_)) => {
                (StatusCode::BAD_REQUEST, "composition_error")
            }
            Self::Core(resolver_core::error::Error::Internal { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Self::Json(_) => (StatusCode::BAD_REQUEST, "invalid_json"),
            Self::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "persistence_error"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = json!({
            "error": self.to_string(),
            "code": code,
            "success": false,
        });

        (status, Json(body)).into_response()
    }
}

/// Result type returned by HTTP handlers.
pub type ServerResult<T> = std::result::Result<T, ServerError>;
