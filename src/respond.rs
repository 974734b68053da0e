//! Uniform success/error envelope shared by every handler.
//!
//! Wire contract: success responses are `{"ok":true,"data":<payload>}` and
//! failures are `{"ok":false,"code":<kind>,"message":<text>}` with a stable
//! `code` suitable for programmatic branching. The only exception is binary
//! audio passthrough from the speech proxy, which is documented on its
//! handler.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Maximum number of characters of third-party diagnostic text echoed back to
/// a client. Upstream bodies can be oversized or carry details we do not want
/// to relay wholesale.
pub const MAX_DETAIL_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Method,
    Validation,
    RateLimit,
    Csrf,
    Config,
    Upstream,
    Exception,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Method => "METHOD",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::RateLimit => "RATE_LIMIT",
            ErrorKind::Csrf => "CSRF",
            ErrorKind::Config => "CONFIG",
            ErrorKind::Upstream => "UPSTREAM",
            ErrorKind::Exception => "EXCEPTION",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }
}

/// Builds the success envelope. Handlers wrap their payload with this and
/// nothing else; status is always 200 unless the caller pairs it explicitly.
pub fn ok(data: serde_json::Value) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true, "data": data }))
}

/// A handler-boundary failure. Rendering always goes through the error
/// envelope so no failure escapes as a raw protocol-level response.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub status: StatusCode,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            kind,
            message: message.into(),
            status,
        }
    }

    pub fn method() -> Self {
        Self::new(ErrorKind::Method, "Method not allowed", StatusCode::METHOD_NOT_ALLOWED)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message, StatusCode::BAD_REQUEST)
    }

    pub fn too_large(limit: usize) -> Self {
        Self::new(
            ErrorKind::Validation,
            format!("Request too large (body exceeded limit {} bytes)", limit),
            StatusCode::PAYLOAD_TOO_LARGE,
        )
    }

    pub fn rate_limited() -> Self {
        Self::new(
            ErrorKind::RateLimit,
            "Too many requests",
            StatusCode::TOO_MANY_REQUESTS,
        )
    }

    pub fn csrf() -> Self {
        Self::new(ErrorKind::Csrf, "CSRF check failed", StatusCode::FORBIDDEN)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Upstream, message, StatusCode::BAD_GATEWAY)
    }

    pub fn exception(message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Exception,
            message,
            StatusCode::INTERNAL_SERVER_ERROR,
        )
    }
}

impl Default for ApiError {
    fn default() -> Self {
        Self::new(ErrorKind::Unknown, "Unknown error", StatusCode::BAD_REQUEST)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "ok": false,
            "code": self.kind,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

/// Truncates diagnostic text to [`MAX_DETAIL_CHARS`] characters without
/// splitting a multi-byte character.
pub fn bounded_detail(text: &str) -> String {
    text.chars().take(MAX_DETAIL_CHARS).collect()
}
