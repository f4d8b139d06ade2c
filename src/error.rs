//! Error types for search-export
//!
//! This module provides the error taxonomy of an export run:
//! - Stage-specific error types (validation, fetch, encoding, storage)
//! - Retry classification used when reporting failures back to the queue
//! - Machine-readable error codes for failure events

use std::time::Duration;
use thiserror::Error;

/// Result type alias for search-export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for search-export
///
/// Every failed pipeline run ends with exactly one of these. The stage enums are
/// wrapped via `#[from]` so `?` works across module boundaries.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "search.max_pages")
        key: Option<String>,
    },

    /// The job message was malformed or incomplete
    #[error("invalid job message: {0}")]
    Validation(#[from] ValidationError),

    /// Fetching search results failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Serializing the export failed
    #[error("encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    /// Writing the export to the object store failed
    #[error("storage write failed: {0}")]
    Storage(#[from] StorageError),

    /// The run was cancelled before it could publish
    #[error("export cancelled")]
    Cancelled,

    /// The whole-job deadline expired
    #[error("export exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),

    /// I/O error outside the storage path (config files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Job message validation errors
///
/// These are raised before any network call is made.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The queue payload is not valid JSON or has the wrong shape
    #[error("malformed job message: {0}")]
    Malformed(String),

    /// A required field is missing or empty
    #[error("missing required field `{0}`")]
    MissingField(String),

    /// The requested format is neither `csv` nor `json`
    #[error("unsupported export format `{0}`")]
    UnsupportedFormat(String),

    /// A field is present but unusable
    #[error("invalid field `{field}`: {reason}")]
    InvalidField {
        /// Dotted location of the field in the job message
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// The `earthdataEnvironment` has no configured search endpoint
    #[error("unknown environment `{0}`")]
    UnknownEnvironment(String),
}

/// Search service errors
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status
    #[error("search service returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// A single page request did not finish in time
    #[error("search request timed out after {0:?}")]
    Timeout(Duration),

    /// The response body was not a usable GraphQL response
    #[error("invalid search response: {0}")]
    InvalidResponse(String),

    /// The service reported GraphQL errors
    #[error("search service reported errors: {}", .0.join("; "))]
    GraphQl(Vec<String>),

    /// Pagination did not finish within the configured page ceiling
    #[error("pagination exceeded {limit} pages")]
    PageLimitExceeded {
        /// The configured ceiling
        limit: usize,
    },

    /// A non-empty page handed back a cursor that was already used
    #[error("page {page} returned an already used cursor {cursor}")]
    CursorRepeated {
        /// 1-based page number that repeated the cursor
        page: usize,
        /// The repeated cursor, as JSON text
        cursor: String,
    },
}

/// Export serialization errors
#[derive(Debug, Error)]
pub enum EncodingError {
    /// CSV writer failure
    #[error("CSV encoding error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failure
    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// Underlying writer failure
    #[error("write error: {0}")]
    Io(#[from] std::io::Error),
}

/// Object store errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// The storage key cannot be written
    #[error("invalid storage key `{key}`: {reason}")]
    InvalidKey {
        /// The rejected key
        key: String,
        /// Why it was rejected
        reason: String,
    },

    /// The write never produced a response
    #[error("transport error: {0}")]
    Transport(String),

    /// The store answered with a non-success status
    #[error("object store returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// The write did not finish in time
    #[error("storage write timed out after {0:?}")]
    Timeout(Duration),

    /// Local filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Transport(e.to_string())
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(e: reqwest::Error) -> Self {
        StorageError::Transport(e.to_string())
    }
}

/// Trait for errors that can be classified as retryable or not
///
/// The pipeline itself never retries. The classification decides whether a failed
/// job is handed back to the queue for redelivery or acknowledged and dropped.
pub trait IsRetryable {
    /// Returns true if the failure is transient and the whole job may be run again
    fn is_retryable(&self) -> bool;
}

fn is_transient_status(status: u16) -> bool {
    status == 408 || status == 429 || status >= 500
}

impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport(_) | FetchError::Timeout(_) => true,
            FetchError::Status { status, .. } => is_transient_status(*status),
            // A broken body or a query the service rejects will fail the same way again
            FetchError::InvalidResponse(_) | FetchError::GraphQl(_) => false,
            FetchError::PageLimitExceeded { .. } | FetchError::CursorRepeated { .. } => false,
        }
    }
}

impl IsRetryable for StorageError {
    fn is_retryable(&self) -> bool {
        match self {
            StorageError::InvalidKey { .. } => false,
            StorageError::Transport(_) | StorageError::Timeout(_) => true,
            StorageError::Status { status, .. } => is_transient_status(*status),
            StorageError::Io(e) => !matches!(
                e.kind(),
                std::io::ErrorKind::PermissionDenied | std::io::ErrorKind::InvalidInput
            ),
        }
    }
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Config { .. } => false,
            Error::Validation(_) => false,
            Error::Fetch(e) => e.is_retryable(),
            Error::Encoding(_) => false,
            Error::Storage(e) => e.is_retryable(),
            // Interrupted runs left nothing behind and can start over
            Error::Cancelled => true,
            Error::DeadlineExceeded(_) => true,
            Error::Io(_) => false,
        }
    }
}

impl Error {
    /// Machine-readable error code, stable across releases
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(e) => match e {
                ValidationError::Malformed(_) => "malformed_message",
                ValidationError::MissingField(_) => "missing_field",
                ValidationError::UnsupportedFormat(_) => "unsupported_format",
                ValidationError::InvalidField { .. } => "invalid_field",
                ValidationError::UnknownEnvironment(_) => "unknown_environment",
            },
            Error::Fetch(e) => match e {
                FetchError::Transport(_) => "search_transport_error",
                FetchError::Status { .. } => "search_status_error",
                FetchError::Timeout(_) => "search_timeout",
                FetchError::InvalidResponse(_) => "search_invalid_response",
                FetchError::GraphQl(_) => "search_graphql_error",
                FetchError::PageLimitExceeded { .. } => "page_limit_exceeded",
                FetchError::CursorRepeated { .. } => "cursor_repeated",
            },
            Error::Encoding(_) => "encoding_error",
            Error::Storage(e) => match e {
                StorageError::InvalidKey { .. } => "invalid_storage_key",
                StorageError::Transport(_) => "storage_transport_error",
                StorageError::Status { .. } => "storage_status_error",
                StorageError::Timeout(_) => "storage_timeout",
                StorageError::Io(_) => "storage_io_error",
            },
            Error::Cancelled => "cancelled",
            Error::DeadlineExceeded(_) => "deadline_exceeded",
            Error::Io(_) => "io_error",
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn all_error_variants() -> Vec<(Error, bool, &'static str)> {
        vec![
            (
                Error::Config {
                    message: "bad".into(),
                    key: Some("search.max_pages".into()),
                },
                false,
                "config_error",
            ),
            (
                ValidationError::MissingField("extra.key".into()).into(),
                false,
                "missing_field",
            ),
            (
                ValidationError::UnsupportedFormat("xml".into()).into(),
                false,
                "unsupported_format",
            ),
            (
                FetchError::Transport("connection reset".into()).into(),
                true,
                "search_transport_error",
            ),
            (
                FetchError::Status {
                    status: 503,
                    body: String::new(),
                }
                .into(),
                true,
                "search_status_error",
            ),
            (
                FetchError::Status {
                    status: 400,
                    body: String::new(),
                }
                .into(),
                false,
                "search_status_error",
            ),
            (
                FetchError::GraphQl(vec!["bad query".into()]).into(),
                false,
                "search_graphql_error",
            ),
            (
                FetchError::PageLimitExceeded { limit: 3 }.into(),
                false,
                "page_limit_exceeded",
            ),
            (
                StorageError::Status {
                    status: 500,
                    body: String::new(),
                }
                .into(),
                true,
                "storage_status_error",
            ),
            (
                StorageError::InvalidKey {
                    key: "../x".into(),
                    reason: "parent segment".into(),
                }
                .into(),
                false,
                "invalid_storage_key",
            ),
            (Error::Cancelled, true, "cancelled"),
            (
                Error::DeadlineExceeded(Duration::from_secs(1)),
                true,
                "deadline_exceeded",
            ),
        ]
    }

    #[test]
    fn classification_and_codes_cover_variants() {
        for (error, retryable, code) in all_error_variants() {
            assert_eq!(error.is_retryable(), retryable, "retryable mismatch for {error}");
            assert_eq!(error.error_code(), code, "code mismatch for {error}");
        }
    }

    #[test]
    fn graphql_error_message_joins_all_messages() {
        let err = FetchError::GraphQl(vec!["first".into(), "second".into()]);
        assert_eq!(
            err.to_string(),
            "search service reported errors: first; second"
        );
    }

    #[test]
    fn stage_errors_wrap_with_prefix() {
        let err: Error = ValidationError::UnknownEnvironment("uat".into()).into();
        assert_eq!(err.to_string(), "invalid job message: unknown environment `uat`");
    }
}
