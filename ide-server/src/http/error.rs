//! Error responses: every failure is `{"error": "<message>"}`.
//!
//! Client errors carry the store's own message. Internal errors are logged
//! with their cause and answered with a fixed, operation-specific message so
//! no filesystem path reaches the client.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use simple_ide_core::{ErrorKind, StoreError};

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: &'static str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Map a store error; `internal_message` replaces the text of 500s.
    pub fn store(err: StoreError, internal_message: &'static str) -> Self {
        match err.kind() {
            ErrorKind::ClientInput => Self::new(StatusCode::BAD_REQUEST, err.to_string()),
            ErrorKind::NotFound => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            ErrorKind::Internal => {
                tracing::error!(error = %err, "{internal_message}");
                Self::internal(internal_message)
            }
        }
    }

    /// Malformed or oversized request body.
    pub fn body(rejection: JsonRejection) -> Self {
        tracing::debug!(%rejection, "rejected request body");
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::new(StatusCode::PAYLOAD_TOO_LARGE, "Request body is too large.");
        }
        Self::new(StatusCode::BAD_REQUEST, "Request body must be valid JSON.")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
