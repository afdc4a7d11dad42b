//! Object store client error types.

use std::sync::Arc;

use cachekeep_core::Error;

/// Errors from the blob store clients.
#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    /// Key is empty or contains segments that would escape the bucket.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Endpoint URL cannot address objects.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// HTTP client could not be constructed.
    #[error("client setup failed: {0}")]
    Setup(String),

    /// Non-success HTTP response other than 404/410.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Filesystem error.
    #[error("io error: {0}")]
    Io(Arc<std::io::Error>),
}

impl ObjectStoreError {
    /// Throttling, server-side failures, timeouts and dropped connections
    /// may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            ObjectStoreError::HttpError { status } => matches!(status, 408 | 429) || *status >= 500,
            ObjectStoreError::Timeout | ObjectStoreError::Network(_) => true,
            ObjectStoreError::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::Interrupted | std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            ),
            ObjectStoreError::InvalidKey(_) | ObjectStoreError::InvalidEndpoint(_) | ObjectStoreError::Setup(_) => {
                false
            }
        }
    }

    /// Attach the key being deleted and convert into the core error.
    pub fn into_store_error(self, key: &str) -> Error {
        Error::ObjectStore { key: key.to_string(), message: self.to_string(), transient: self.is_transient() }
    }
}

impl From<reqwest::Error> for ObjectStoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { ObjectStoreError::Timeout } else { ObjectStoreError::Network(Arc::new(err)) }
    }
}

impl From<std::io::Error> for ObjectStoreError {
    fn from(err: std::io::Error) -> Self {
        ObjectStoreError::Io(Arc::new(err))
    }
}
