//! # Error Handling
//!
//! This module defines the request-level error type and how it is converted to
//! HTTP responses.
//!
//! ## Error Categories:
//! - **InvalidInput**: The client sent something we refuse to process (400)
//! - **StoreUnavailable**: The session store could not be reached or errored (500)
//! - **TranscriptionFailed**: The speech-to-text collaborator failed (500)
//! - **GenerationFailed**: The chat completion collaborator failed (500)
//!
//! Failures raised outside these variants (extractor errors, framework errors)
//! are caught by [`crate::middleware::OpaqueServerErrors`].
//!
//! ## Response bodies:
//! Client errors carry a machine-readable type and a message. Server errors never
//! leak details: the body is always `{"error": "internal_server_error"}` and the
//! detail goes to the log instead.

use crate::response::GenerationError;
use crate::session::StoreError;
use crate::transcription::TranscriptionError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;
use tracing::error;

#[derive(Debug)]
pub enum AppError {
    /// Client sent an upload we refuse to process
    InvalidInput(String),

    /// Session store unreachable or returned an error
    StoreUnavailable(String),

    /// Speech-to-text collaborator failed
    TranscriptionFailed(String),

    /// Chat completion collaborator failed
    GenerationFailed(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::StoreUnavailable(msg) => write!(f, "Session store unavailable: {}", msg),
            AppError::TranscriptionFailed(msg) => write!(f, "Transcription failed: {}", msg),
            AppError::GenerationFailed(msg) => write!(f, "Response generation failed: {}", msg),
        }
    }
}

impl AppError {
    /// Machine-readable error type, used in logs and client error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "invalid_input",
            AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::TranscriptionFailed(_) => "transcription_failed",
            AppError::GenerationFailed(_) => "generation_failed",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        if status.is_server_error() {
            error!(error_type = self.kind(), error = %self, "Unhandled request failure");
            return HttpResponse::build(status).json(json!({
                "error": "internal_server_error"
            }));
        }

        let message = match self {
            AppError::InvalidInput(msg) => msg.clone(),
            other => other.to_string(),
        };

        HttpResponse::build(status).json(json!({
            "error": self.kind(),
            "message": message,
        }))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::StoreUnavailable(err.to_string())
    }
}

impl From<TranscriptionError> for AppError {
    fn from(err: TranscriptionError) -> Self {
        AppError::TranscriptionFailed(err.to_string())
    }
}

impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        AppError::GenerationFailed(err.to_string())
    }
}

/// Shorthand for `Result<T, AppError>`.
pub type AppResult<T> = Result<T, AppError>;
