//! Object store port for image blobs.
//!
//! Deletes are idempotent: a key that is already gone is a success
//! (`DeleteOutcome::AlreadyAbsent`), never an error.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::Error;

/// Successful result of a blob delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    AlreadyAbsent,
}

/// Blob storage addressed by key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Delete the blob stored under `key`.
    async fn delete(&self, key: &str) -> Result<DeleteOutcome, Error>;
}

/// Injected failure mode for [`MemoryObjectStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Fail every attempt with a retryable error.
    Transient,
    /// Fail the next `n` attempts with a retryable error, then behave.
    TransientTimes(u32),
    /// Fail every attempt with a non-retryable error.
    Permanent,
}

#[derive(Debug, Default)]
struct MemoryState {
    blobs: HashSet<String>,
    failures: HashMap<String, FailureMode>,
    attempts: HashMap<String, u32>,
}

/// In-process object store for local runs and tests.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    state: Mutex<MemoryState>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a blob under `key`.
    pub async fn put(&self, key: impl Into<String>) {
        self.state.lock().await.blobs.insert(key.into());
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.state.lock().await.blobs.contains(key)
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.blobs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Make deletes of `key` fail according to `mode`.
    pub async fn fail_on(&self, key: impl Into<String>, mode: FailureMode) {
        self.state.lock().await.failures.insert(key.into(), mode);
    }

    /// Number of delete attempts seen for `key`.
    pub async fn attempts(&self, key: &str) -> u32 {
        self.state.lock().await.attempts.get(key).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn delete(&self, key: &str) -> Result<DeleteOutcome, Error> {
        let mut state = self.state.lock().await;
        *state.attempts.entry(key.to_string()).or_insert(0) += 1;

        let failure = match state.failures.get_mut(key) {
            Some(FailureMode::Transient) => Some(true),
            Some(FailureMode::Permanent) => Some(false),
            Some(FailureMode::TransientTimes(0)) | None => None,
            Some(FailureMode::TransientTimes(n)) => {
                *n -= 1;
                Some(true)
            }
        };
        if let Some(transient) = failure {
            return Err(Error::ObjectStore {
                key: key.to_string(),
                message: "injected failure".to_string(),
                transient,
            });
        }

        if state.blobs.remove(key) { Ok(DeleteOutcome::Deleted) } else { Ok(DeleteOutcome::AlreadyAbsent) }
    }
}
