//! Error types for the RAG system

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// RAG system errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Text extraction failed (corrupt input, OCR failure)
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Unsupported file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Embedding generation failed after retry budget exhausted
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Index error (dimension mismatch, write failure)
    #[error("Index error: {0}")]
    Index(String),

    /// Query-time retrieval failure
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    /// Answer generation failed (provider failure, content filtered, timeout)
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Malformed request
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Upstream provider returned a non-success status
    #[error("Upstream error: HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an extraction error
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an index error
    pub fn index(message: impl Into<String>) -> Self {
        Self::Index(message.into())
    }

    /// Create a retrieval error
    pub fn retrieval(message: impl Into<String>) -> Self {
        Self::Retrieval(message.into())
    }

    /// Create a generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether retrying the failed operation could succeed.
    ///
    /// Only transport failures and rate-limit / server-side upstream statuses
    /// are transient; logic errors (malformed input, unsupported format,
    /// dimension mismatch) never are.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Upstream { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Short machine-readable kind, used in ingestion reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::Extraction(_) => "extraction_error",
            Self::UnsupportedFileType(_) => "unsupported_type",
            Self::Embedding(_) => "embedding_error",
            Self::Index(_) => "index_error",
            Self::Retrieval(_) => "retrieval_error",
            Self::Generation(_) => "generation_error",
            Self::Validation(_) => "validation_error",
            Self::DocumentNotFound(_) => "not_found",
            Self::Upstream { .. } => "upstream_error",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
            Self::Http(_) => "http_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", msg.clone()),
            Error::Extraction(msg) => (StatusCode::BAD_REQUEST, "extraction_error", msg.clone()),
            Error::UnsupportedFileType(ext) => (
                StatusCode::BAD_REQUEST,
                "unsupported_type",
                format!("Unsupported file type: {}", ext),
            ),
            Error::Embedding(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "embedding_error", msg.clone())
            }
            Error::Index(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "index_error", msg.clone()),
            Error::Retrieval(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "retrieval_error", msg.clone())
            }
            Error::Generation(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "generation_error", msg.clone())
            }
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            Error::DocumentNotFound(id) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("Document not found: {}", id),
            ),
            // Raw upstream detail is logged where it occurs, never returned.
            Error::Upstream { status, .. } => (
                StatusCode::BAD_GATEWAY,
                "upstream_error",
                format!("Upstream provider returned HTTP {}", status),
            ),
            Error::Io(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                err.to_string(),
            ),
            Error::Json(err) => (StatusCode::BAD_REQUEST, "json_error", err.to_string()),
            Error::Http(_) => (
                StatusCode::BAD_GATEWAY,
                "http_error",
                "Upstream provider unreachable".to_string(),
            ),
            Error::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
