//! Structured API errors.
//!
//! DESIGN
//! ======
//! Services define their own `thiserror` enums and implement [`ErrorCode`].
//! Routes turn any such error into a status code plus a flat JSON body
//! `{ code, message, retryable }` via [`ApiError`], so clients can branch on
//! a grepable code instead of parsing messages.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

/// Grepable error code and retryable flag for structured error bodies.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// JSON error body returned by every route.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

/// An HTTP status paired with a structured body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    /// Build from any [`ErrorCode`] with an explicit status.
    pub fn new(status: StatusCode, err: &impl ErrorCode) -> Self {
        Self {
            status,
            body: ErrorBody { code: err.error_code(), message: err.to_string(), retryable: err.retryable() },
        }
    }

    /// Build from a bare status and static code, for rejections with no
    /// underlying service error.
    #[must_use]
    pub fn bare(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self { status, body: ErrorBody { code, message: message.into(), retryable: false } }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
