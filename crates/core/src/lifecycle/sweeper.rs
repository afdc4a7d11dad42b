//! Cache sweeper: one cleanup pass over both cache classes.
//!
//! 1. Conditionally delete expired search entries (one statement).
//! 2. Select unused image keys.
//! 3. Conditionally delete those keys; only keys this pass actually
//!    removed are credited, so overlapping sweeps never double count.
//! 4. Fan out blob deletes for the removed keys with bounded concurrency.
//!
//! Keys whose blob delete failed, or whose sweep was dropped mid fan-out
//! (caller timeout), go into the manager's blob debt and are retried first
//! by the next sweep.
//!
//! # Error Policy
//!
//! Metadata failures abort the pass. Blob failures do not: metadata is the
//! source of truth, so a leftover blob is unreachable cleanup debt. Failed
//! keys are reported per key and logged for a later pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{StreamExt, stream};
use serde::{Deserialize, Serialize};

use super::CacheManager;
use super::policy::{EvictionPolicy, SEARCH_TTL_HOURS, expired_search_predicate, unused_image_predicate};
use crate::Error;
use crate::objects::DeleteOutcome;
use crate::retry::retry;

/// Final state of one blob delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlobDeleteStatus {
    Deleted,
    AlreadyAbsent,
    Failed,
}

/// Per-key result of the blob fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobDeleteOutcome {
    pub key: String,
    pub status: BlobDeleteStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResult {
    pub expired_search_count: u64,
    pub unused_image_count: u64,
    /// Keys removed from metadata by this sweep, oldest first.
    pub unused_image_keys: Vec<String>,
    pub blob_outcomes: Vec<BlobDeleteOutcome>,
    /// Another sweep held the single-flight guard; nothing was done.
    pub skipped: bool,
}

impl CleanupResult {
    fn skipped() -> Self {
        Self { skipped: true, ..Self::default() }
    }

    /// Keys evicted from metadata whose blob delete failed.
    pub fn failed_blob_keys(&self) -> Vec<&str> {
        self.blob_outcomes
            .iter()
            .filter(|o| o.status == BlobDeleteStatus::Failed)
            .map(|o| o.key.as_str())
            .collect()
    }

    /// Whether some blob deletes failed after metadata eviction succeeded.
    pub fn is_partial(&self) -> bool {
        self.blob_outcomes.iter().any(|o| o.status == BlobDeleteStatus::Failed)
    }
}

/// Holds the single-flight flag for the lifetime of a sweep.
struct SweepGuard<'a>(&'a AtomicBool);

impl<'a> SweepGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Blob keys whose deletes are not yet settled. Dropping it while armed
/// moves the keys into the blob debt.
struct PendingBlobs<'a> {
    keys: Vec<String>,
    debt: &'a Mutex<Vec<String>>,
}

impl<'a> PendingBlobs<'a> {
    fn arm(debt: &'a Mutex<Vec<String>>, keys: Vec<String>) -> Self {
        Self { keys, debt }
    }

    fn keys(&self) -> &[String] {
        &self.keys
    }

    fn disarm(mut self) {
        self.keys.clear();
    }
}

impl Drop for PendingBlobs<'_> {
    fn drop(&mut self) {
        if self.keys.is_empty() {
            return;
        }
        tracing::warn!(
            pending = self.keys.len(),
            keys = ?self.keys,
            "sweep abandoned before blob deletes settled, recording blob debt"
        );
        record_debt(self.debt, std::mem::take(&mut self.keys));
    }
}

fn record_debt(debt: &Mutex<Vec<String>>, keys: Vec<String>) {
    let mut debt = debt.lock().unwrap_or_else(PoisonError::into_inner);
    for key in keys {
        if !debt.contains(&key) {
            debt.push(key);
        }
    }
}

impl CacheManager {
    /// Keys evicted from metadata whose blobs have not been deleted yet.
    pub fn blob_debt(&self) -> Vec<String> {
        self.blob_debt.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn take_blob_debt(&self) -> Vec<String> {
        std::mem::take(&mut *self.blob_debt.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Run one cleanup pass at `now` with the given image policy.
    ///
    /// # Errors
    ///
    /// Returns the metadata store error (after retries) if any metadata
    /// step fails. Blob delete failures never produce an error.
    pub async fn run_cleanup(&self, now: DateTime<Utc>, policy: &EvictionPolicy) -> Result<CleanupResult, Error> {
        let _guard = if self.store.supports_conditional_delete() {
            None
        } else {
            match SweepGuard::acquire(&self.sweep_in_flight) {
                Some(guard) => Some(guard),
                None => {
                    tracing::info!("cleanup already in flight, skipping");
                    return Ok(CleanupResult::skipped());
                }
            }
        };

        let search_filter = expired_search_predicate(now, SEARCH_TTL_HOURS);
        let image_filter = unused_image_predicate(now, policy);
        tracing::debug!(
            search_cutoff = %search_filter.created_at_or_before,
            image_cutoff = %image_filter.created_at_or_before,
            hits_below = image_filter.hits_below,
            "starting cleanup"
        );

        let expired_search_count =
            retry(&self.retry, "delete_expired_search", || self.store.delete_search_where(search_filter)).await?;

        let candidates =
            retry(&self.retry, "select_unused_images", || self.store.select_images_where(image_filter)).await?;

        let unused_image_keys = if candidates.is_empty() {
            Vec::new()
        } else {
            retry(&self.retry, "delete_unused_images", || {
                self.store.delete_images_where(&candidates, image_filter)
            })
            .await?
        };

        if !unused_image_keys.is_empty() {
            tracing::info!(
                count = unused_image_keys.len(),
                keys = ?unused_image_keys,
                "images evicted from metadata, deleting blobs"
            );
        }

        let mut blob_keys = self.take_blob_debt();
        if !blob_keys.is_empty() {
            tracing::info!(count = blob_keys.len(), "retrying blob debt from earlier sweeps");
        }
        blob_keys.extend(unused_image_keys.iter().cloned());

        let pending = PendingBlobs::arm(&self.blob_debt, blob_keys);
        let blob_outcomes = self.delete_blobs(pending.keys()).await;
        pending.disarm();

        let result = CleanupResult {
            expired_search_count,
            unused_image_count: unused_image_keys.len() as u64,
            unused_image_keys,
            blob_outcomes,
            skipped: false,
        };

        if result.is_partial() {
            let failed = result.failed_blob_keys();
            tracing::warn!(
                failed = failed.len(),
                keys = ?failed,
                "images evicted from metadata but some blob deletes failed"
            );
            record_debt(&self.blob_debt, failed.into_iter().map(str::to_string).collect());
        }
        tracing::info!(
            expired_search = result.expired_search_count,
            unused_images = result.unused_image_count,
            raced = (candidates.len() as u64).saturating_sub(result.unused_image_count),
            "cleanup finished"
        );

        Ok(result)
    }

    /// [`run_cleanup`](Self::run_cleanup) bounded by a caller deadline.
    ///
    /// Deletes committed before the deadline stay committed.
    pub async fn run_cleanup_with_timeout(
        &self, now: DateTime<Utc>, policy: &EvictionPolicy, timeout: Duration,
    ) -> Result<CleanupResult, Error> {
        tokio::time::timeout(timeout, self.run_cleanup(now, policy))
            .await
            .map_err(|_| {
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "cleanup timed out");
                Error::TimedOut { operation: "cleanup".to_string(), timeout_ms: timeout.as_millis() as u64 }
            })?
    }

    /// Delete blobs for evicted keys, at most `blob_delete_concurrency` at a time.
    async fn delete_blobs(&self, keys: &[String]) -> Vec<BlobDeleteOutcome> {
        stream::iter(keys.iter().cloned())
            .map(|key| async move {
                let deleted = retry(&self.retry, "delete_blob", || self.objects.delete(&key)).await;
                match deleted {
                    Ok(DeleteOutcome::Deleted) => {
                        BlobDeleteOutcome { key, status: BlobDeleteStatus::Deleted, error: None }
                    }
                    Ok(DeleteOutcome::AlreadyAbsent) => {
                        tracing::debug!(key = %key, "blob already absent");
                        BlobDeleteOutcome { key, status: BlobDeleteStatus::AlreadyAbsent, error: None }
                    }
                    Err(err) => {
                        tracing::warn!(key = %key, error = %err, "blob delete failed");
                        BlobDeleteOutcome { key, status: BlobDeleteStatus::Failed, error: Some(err.to_string()) }
                    }
                }
            })
            .buffered(self.blob_delete_concurrency)
            .collect()
            .await
    }
}
