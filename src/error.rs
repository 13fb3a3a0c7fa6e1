// src/error.rs
//! Application error types with structured error handling.
//!
//! Error variants name the failure modes of the harvester. The one expected
//! failure, [`AppError::BatchTooLarge`], is a control signal answered by
//! bisection and never shown to the user.

use crate::types::{Interval, ValidationError};
use std::fmt;
use thiserror::Error;

/// flickr API error codes as a typed vocabulary.
///
/// The REST API reports failures as `{"stat": "fail", "code": n, "message": ..}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlickrErrorCode {
    /// The requested user does not exist (anymore)
    UserNotFound,
    /// API key is invalid or has been revoked
    InvalidApiKey,
    /// flickr is temporarily unavailable
    ServiceUnavailable,
    /// A write operation on flickr's side failed
    OperationFailed,
    /// Rate limit exceeded for the key in use
    RateLimited,
    /// HTTP status code fallback when the error body is unparseable
    HttpStatus(u16),
    /// An error code this client doesn't recognize yet
    Unknown(i64),
}

impl FlickrErrorCode {
    /// Parse a flickr `stat: fail` code into the typed vocabulary.
    pub fn from_api_code(code: i64) -> Self {
        match code {
            1 => Self::UserNotFound,
            100 => Self::InvalidApiKey,
            0 | 105 => Self::ServiceUnavailable,
            106 => Self::OperationFailed,
            other => Self::Unknown(other),
        }
    }

    /// Create from an HTTP status code when the error body is unparseable.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            503 => Self::ServiceUnavailable,
            other => Self::HttpStatus(other),
        }
    }

    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited | Self::ServiceUnavailable | Self::OperationFailed => true,
            Self::HttpStatus(status) => *status >= 500,
            _ => false,
        }
    }

    /// Whether this error means the entity simply doesn't exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UserNotFound)
    }
}

impl fmt::Display for FlickrErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserNotFound => write!(f, "user_not_found"),
            Self::InvalidApiKey => write!(f, "invalid_api_key"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
            Self::OperationFailed => write!(f, "operation_failed"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::HttpStatus(code) => write!(f, "http_{}", code),
            Self::Unknown(code) => write!(f, "flickr_{}", code),
        }
    }
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("flickr API returned an error ({code}): {message}")]
    FlickrService {
        code: FlickrErrorCode,
        message: String,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Too many results ({total}) in {interval} to download in one batch")]
    BatchTooLarge { interval: Interval, total: u64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Coverage file {} is unreadable: {source}", .path.display())]
    CoverageFile {
        path: std::path::PathBuf,
        source: serde_json::Error,
    },

    #[error("Worker {worker} stopped abnormally: {message}")]
    WorkerFailed { worker: String, message: String },

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl AppError {
    /// The "too many results" signal that is answered by bisection.
    pub fn is_batch_too_large(&self) -> bool {
        matches!(self, AppError::BatchTooLarge { .. })
    }

    /// Whether the flickr client should retry the request that produced this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkFailure(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            AppError::FlickrService { code, .. } => code.is_retryable(),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            AppError::NotFound(_) => true,
            AppError::FlickrService { code, .. } => code.is_not_found(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedResponse(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_classification() {
        assert!(FlickrErrorCode::from_api_code(1).is_not_found());
        assert!(FlickrErrorCode::from_api_code(105).is_retryable());
        assert!(!FlickrErrorCode::from_api_code(100).is_retryable());
        assert!(FlickrErrorCode::from_http_status(429).is_retryable());
        assert!(FlickrErrorCode::from_http_status(502).is_retryable());
        assert!(!FlickrErrorCode::from_http_status(404).is_retryable());
        assert_eq!(FlickrErrorCode::from_api_code(42).to_string(), "flickr_42");
    }

    #[test]
    fn test_not_found_covers_api_and_local_variants() {
        let api = AppError::FlickrService {
            code: FlickrErrorCode::UserNotFound,
            message: "User not found".to_string(),
        };
        assert!(api.is_not_found());
        assert!(AppError::NotFound("1@N01".to_string()).is_not_found());
        assert!(!AppError::MalformedResponse("x".to_string()).is_not_found());
    }
}
