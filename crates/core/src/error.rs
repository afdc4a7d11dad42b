//! Unified error types for cachekeep.
//!
//! Every variant renders with a stable, upper-case code prefix so operators
//! can grep logs and callers can branch on the code without parsing prose.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error type for the cache lifecycle manager.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input at an entry point (malformed parameters, serialization).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Eviction thresholds rejected before any store access.
    #[error("POLICY_INPUT: {0}")]
    PolicyInput(String),

    /// Metadata store operation failed.
    #[error("STORE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Object store rejected or failed a blob operation.
    #[error("OBJECT_STORE_ERROR: {key}: {message}")]
    ObjectStore { key: String, message: String, transient: bool },

    /// A transient store failure persisted through every retry attempt.
    #[error("STORE_UNAVAILABLE: {operation} failed after {attempts} attempts: {source}")]
    StoreUnavailable {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    /// The caller-supplied deadline elapsed before the operation finished.
    #[error("TIMED_OUT: {operation} exceeded {timeout_ms}ms")]
    TimedOut { operation: String, timeout_ms: u64 },
}

impl Error {
    /// Whether retrying the same call may succeed.
    ///
    /// SQLite reports lock contention as BUSY/LOCKED; object stores flag
    /// their own retryable failures (timeouts, 5xx, throttling).
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Database(tokio_rusqlite::Error::Error(rusqlite::Error::SqliteFailure(err, _))) => {
                matches!(err.code, rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
            }
            Error::ObjectStore { transient, .. } => *transient,
            _ => false,
        }
    }

    /// HTTP-equivalent status for route layers sitting in front of the manager.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidInput(_) | Error::PolicyInput(_) => 400,
            Error::TimedOut { .. } => 504,
            Error::Database(_)
            | Error::MigrationFailed(_)
            | Error::ObjectStore { .. }
            | Error::StoreUnavailable { .. } => 500,
        }
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
        let code = match &err {
            Error::InvalidInput(_) | Error::PolicyInput(_) => -32602,
            Error::Database(_) | Error::MigrationFailed(_) | Error::StoreUnavailable { .. } => -32002,
            Error::ObjectStore { .. } => -32003,
            Error::TimedOut { .. } => -32006,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
