//! Error types and classification for meterflow.
//!
//! This crate provides:
//! - [`MfError`] - Top-level error enum for the ingestion pipeline
//! - Domain-specific errors ([`FetchError`], [`ParseError`], [`FilterError`], [`WriteError`])
//! - [`ErrorCategory`] for retry decision making
//! - Error classification based on error type and message contents

use thiserror::Error;

/// Top-level error type for meterflow.
#[derive(Error, Debug)]
pub enum MfError {
    /// Remote object fetch errors (network, auth, missing object)
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Payload or path parsing errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Metadata / entity-filter errors (run-level)
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    /// Local persistence errors (output files, manifest)
    #[error("Write error: {0}")]
    Write(#[from] WriteError),

    /// Configuration errors (invalid batch size, worker count, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors (wrapped anyhow)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors fetching a remote object.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Object does not exist
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Access denied by the store
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// I/O or network failure during fetch
    #[error("I/O error: {0}")]
    Io(String),

    /// Fetch exceeded the configured timeout
    #[error("Fetch timed out after {timeout_secs}s: {uri}")]
    Timeout { uri: String, timeout_secs: u64 },

    /// Malformed object URI
    #[error("Invalid URI: {0}")]
    InvalidUri(String),
}

/// Errors parsing an object payload or its path.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Payload is corrupt or not the expected format
    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    /// Schema mismatch or unsupported column type
    #[error("Schema error: {0}")]
    Schema(String),

    /// Path does not follow the entity naming convention
    #[error("Unrecognized path naming: {0}")]
    Naming(String),
}

/// Errors obtaining or applying the entity filter. Always run-level.
#[derive(Error, Debug)]
pub enum FilterError {
    /// Metadata provider unreachable or object missing
    #[error("Metadata unavailable: {0}")]
    Unavailable(String),

    /// Metadata table lacks a required column
    #[error("Missing metadata column: {0}")]
    MissingColumn(String),

    /// Metadata column has an unusable type
    #[error("Metadata schema error: {0}")]
    Schema(String),
}

/// Errors persisting output files or the manifest.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization failure (manifest, output encoding)
    #[error("Serialization failed: {0}")]
    Serialize(String),
}

impl MfError {
    /// Short stable name of the error domain, for batch outcome records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::Parse(_) => "parse",
            Self::Filter(_) => "filter",
            Self::Write(_) => "write",
            Self::Config(_) => "config",
            Self::Other(_) => "other",
        }
    }
}

/// Error classification for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transient error - retry with exponential backoff
    ///
    /// Examples: network timeout, S3 throttling, 5xx responses
    Transient,

    /// Permanent error - never retry
    ///
    /// Examples: object not found, access denied, corrupt payload
    Permanent,
}

/// Classifies an error to determine retry behavior.
pub fn classify_error(error: &MfError) -> ErrorCategory {
    match error {
        MfError::Fetch(e) => classify_fetch_error(e),
        MfError::Parse(_) => ErrorCategory::Permanent,
        MfError::Filter(_) => ErrorCategory::Permanent,
        MfError::Write(_) => ErrorCategory::Transient,
        MfError::Config(_) => ErrorCategory::Permanent,
        MfError::Other(e) => classify_message(&e.to_string()),
    }
}

fn classify_fetch_error(error: &FetchError) -> ErrorCategory {
    match error {
        FetchError::NotFound(_) => ErrorCategory::Permanent,
        FetchError::AccessDenied(_) => ErrorCategory::Permanent,
        FetchError::InvalidUri(_) => ErrorCategory::Permanent,
        FetchError::Timeout { .. } => ErrorCategory::Transient,
        FetchError::Io(msg) => classify_message(msg),
    }
}

/// Classify an opaque store error by its message.
///
/// Retryable: throttling, 5xx, timeouts, connection failures.
/// Non-retryable: missing keys, auth failures, 4xx.
pub fn classify_message(message: &str) -> ErrorCategory {
    let lower = message.to_lowercase();

    if lower.contains("nosuchkey")
        || lower.contains("not found")
        || lower.contains("accessdenied")
        || lower.contains("access denied")
        || lower.contains("nosuchbucket")
        || lower.contains("403")
        || lower.contains("404")
        || lower.contains("400")
    {
        return ErrorCategory::Permanent;
    }

    if lower.contains("slowdown")
        || lower.contains("toomanyrequests")
        || lower.contains("throttl")
        || lower.contains("service unavailable")
        || lower.contains("500")
        || lower.contains("502")
        || lower.contains("503")
        || lower.contains("504")
        || lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection reset")
        || lower.contains("connection refused")
    {
        return ErrorCategory::Transient;
    }

    // Default to retryable for unknown store errors (be optimistic)
    ErrorCategory::Transient
}

/// Result type alias using MfError.
pub type Result<T> = std::result::Result<T, MfError>;
