//! Unified error types for the offline worker.
//!
//! Per-request failures are recovered as close to the store as possible;
//! only the variants that survive that recovery reach the host.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for zubid-sw.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., unknown HTTP method).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// The origin could not be reached.
    #[error("NETWORK_UNAVAILABLE: {0}")]
    NetworkUnavailable(String),

    /// A write would push a generation past its byte quota.
    ///
    /// Non-fatal at per-request write sites; the response is still served.
    #[error("STORAGE_QUOTA_EXCEEDED: generation {generation} is limited to {limit} bytes")]
    StorageQuotaExceeded { generation: String, limit: u64 },

    /// A manifest asset could not be fetched during install.
    #[error("MANIFEST_FETCH_FAILED: {url}: {reason}")]
    ManifestFetchFailed { url: String, reason: String },

    /// A push event carried a payload that is not a JSON object.
    #[error("MALFORMED_PUSH_PAYLOAD: {0}")]
    MalformedPushPayload(String),

    /// Lifecycle event arrived in the wrong phase.
    #[error("LIFECYCLE_ERROR: {0}")]
    Lifecycle(String),

    /// The notification or navigation primitive failed.
    #[error("PLATFORM_ERROR: {0}")]
    Platform(String),

    /// A background task panicked or was aborted before finishing.
    #[error("BACKGROUND_TASK_FAILED: {0}")]
    Task(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),
}

impl Error {
    /// Whether this failure means the origin was unreachable.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::NetworkUnavailable(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::NetworkUnavailable(msg) => (-32006, msg.clone()),
            Error::StorageQuotaExceeded { .. } => (-32007, err.to_string()),
            Error::ManifestFetchFailed { .. } => (-32008, err.to_string()),
            Error::MalformedPushPayload(msg) => (-32009, msg.clone()),
            Error::Lifecycle(msg) => (-32010, msg.clone()),
            Error::Platform(msg) => (-32011, msg.clone()),
            Error::Task(msg) => (-32012, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
