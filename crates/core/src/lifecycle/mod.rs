//! Cache lifecycle manager.
//!
//! [`CacheManager`] coordinates the metadata store and the object store:
//!
//! - `sweeper`: one cleanup pass (search expiry + unused-image eviction)
//! - `stats`: read-only counts and aggregates
//! - `flush`: unconditional wipe of the search cache
//! - `report`: the operator-facing cleanup / force-clear payloads
//!
//! Both stores are injected, so tests run against in-memory fakes and
//! production wires SQLite plus an HTTP or filesystem blob store.

pub mod flush;
pub mod policy;
pub mod report;
pub mod stats;
pub mod sweeper;

#[cfg(test)]
mod testing;

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use crate::cache::MetadataStore;
use crate::config::AppConfig;
use crate::objects::ObjectStore;
use crate::retry::RetryPolicy;

pub use flush::ForceClearResult;
pub use policy::{EvictionPolicy, ImageFilter, SearchFilter};
pub use report::{CleanupReport, CleanupSummary, ForceClearReport};
pub use stats::CacheStats;
pub use sweeper::{BlobDeleteOutcome, BlobDeleteStatus, CleanupResult};

/// Default bound on concurrent blob deletes.
pub const DEFAULT_BLOB_DELETE_CONCURRENCY: usize = 8;

/// Owner of both cache stores and the policies applied to them.
#[derive(Clone)]
pub struct CacheManager {
    store: Arc<dyn MetadataStore>,
    objects: Arc<dyn ObjectStore>,
    retry: RetryPolicy,
    blob_delete_concurrency: usize,
    sweep_in_flight: Arc<AtomicBool>,
    /// Keys gone from metadata whose blobs still need deleting.
    blob_debt: Arc<Mutex<Vec<String>>>,
}

impl CacheManager {
    pub fn new(store: Arc<dyn MetadataStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            objects,
            retry: RetryPolicy::default(),
            blob_delete_concurrency: DEFAULT_BLOB_DELETE_CONCURRENCY,
            sweep_in_flight: Arc::new(AtomicBool::new(false)),
            blob_debt: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Build a manager with retry and fan-out settings taken from config.
    pub fn from_config(store: Arc<dyn MetadataStore>, objects: Arc<dyn ObjectStore>, config: &AppConfig) -> Self {
        Self::new(store, objects)
            .with_retry(config.retry_policy())
            .with_blob_delete_concurrency(config.blob_delete_concurrency)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the bound on concurrent blob deletes (minimum 1).
    pub fn with_blob_delete_concurrency(mut self, limit: usize) -> Self {
        self.blob_delete_concurrency = limit.max(1);
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }
}
