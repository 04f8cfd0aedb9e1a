//! Error types for skyport-importer
//!
//! `ImportError` is the import pipeline taxonomy. Selection-time variants are
//! returned synchronously from `POST /import/start`; everything raised once
//! the stream is open is folded into a terminal `error` frame instead.
//! `ApiError` maps all of them onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::DatasetError;

/// Import pipeline errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    /// Nothing to import (direct selection empty, or inversion excluded everything)
    #[error("No tweets selected for import")]
    EmptySelection,

    /// Resolved selection exceeds the per-job bound
    #[error("You cannot import more than {max} tweets at a time ({count} selected)")]
    SelectionTooLarge { count: usize, max: usize },

    /// A selected position does not exist in the dataset
    #[error("Invalid tweet position {position} (dataset has {dataset_size} tweets)")]
    InvalidPosition { position: String, dataset_size: usize },

    /// Selection artifact could not be written
    #[error("Could not create temporary file for import: {0}")]
    PersistFailure(String),

    /// Selection artifact could not be read back
    #[error("Could not read or parse selection artifact: {0}")]
    ArtifactIo(String),

    /// No uploaded dataset in the session
    #[error("No tweets found in session")]
    DatasetMissing,

    /// Export timestamp in an unexpected format
    #[error("Could not parse tweet timestamp {value:?}: {reason}")]
    TimestampParse { value: String, reason: String },

    /// Anything else that stops the import loop
    #[error("Unexpected import failure: {0}")]
    Unexpected(String),
}

impl ImportError {
    /// Machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::EmptySelection => "EMPTY_SELECTION",
            ImportError::SelectionTooLarge { .. } => "SELECTION_TOO_LARGE",
            ImportError::InvalidPosition { .. } => "INVALID_POSITION",
            ImportError::PersistFailure(_) => "PERSIST_FAILURE",
            ImportError::ArtifactIo(_) => "ARTIFACT_IO",
            ImportError::DatasetMissing => "DATASET_MISSING",
            ImportError::TimestampParse { .. } => "TIMESTAMP_PARSE",
            ImportError::Unexpected(_) => "UNEXPECTED",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ImportError::PersistFailure(_)
            | ImportError::ArtifactIo(_)
            | ImportError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or unknown session (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Conflict (409) - e.g., import already running in this session
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Import pipeline error
    #[error(transparent)]
    Import(#[from] ImportError),

    /// Uploaded export could not be stored or parsed
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
            ApiError::Import(ref err) => (err.status(), err.code(), err.to_string()),
            ApiError::Dataset(ref err) => match err {
                DatasetError::Io(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "IO_ERROR",
                    err.to_string(),
                ),
                DatasetError::Malformed(_) | DatasetError::Encoding(_) => {
                    (StatusCode::BAD_REQUEST, "MALFORMED_EXPORT", err.to_string())
                }
            },
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, "{}", message);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
