//! API error types and responses.
//!
//! Every error renders as `{"error": <message>, "code": <code>}`. Messages are
//! the user-facing strings of the launch flow ("unknown platform issuer",
//! "invalid or expired state", ...), so they are kept short and never carry
//! secrets.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use lti_launch_auth::AuthError;
use lti_launch_store::StoreError;

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request parameters or an untrusted platform.
    #[error("{0}")]
    BadRequest(String),

    /// Missing or failed authentication.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but the role does not allow the operation.
    #[error("insufficient permissions")]
    Forbidden,

    /// The requested resource was not found.
    #[error("{0}")]
    NotFound(String),

    /// Internal server error.
    #[error("{0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl ApiError {
    /// Shorthand for a 400 with a static message.
    #[must_use]
    pub fn bad_request(message: &str) -> Self {
        Self::BadRequest(message.to_string())
    }

    /// Shorthand for a 401 with a static message.
    #[must_use]
    pub fn unauthorized(message: &str) -> Self {
        Self::Unauthorized(message.to_string())
    }

    /// Map an id_token validation failure.
    ///
    /// Every validator failure is a 401, whatever its cause.
    #[must_use]
    pub fn token_validation(err: &AuthError) -> Self {
        Self::Unauthorized(format!("token validation failed: {err}"))
    }

    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code(),
            error: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound("not found".to_string()),
            other => {
                tracing::error!(error = %other, "Store error");
                Self::Internal("storage error".to_string())
            }
        }
    }
}
