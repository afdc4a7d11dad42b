//! Shared fixtures for lifecycle tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use tokio_rusqlite::rusqlite;

use super::CacheManager;
use super::policy::{ImageFilter, SearchFilter};
use crate::Error;
use crate::cache::hash::search_fingerprint;
use crate::cache::{CacheDb, ImageCacheEntry, ImageCacheStats, MetadataStore, SearchCacheEntry, SearchCacheStats};
use crate::objects::{DeleteOutcome, MemoryObjectStore, ObjectStore};
use crate::retry::RetryPolicy;

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy { max_attempts: 3, initial_backoff: Duration::from_millis(1), max_backoff: Duration::from_millis(4) }
}

pub async fn memory_db() -> CacheDb {
    CacheDb::open_in_memory().await.unwrap()
}

pub async fn manager_for(db: CacheDb) -> (CacheManager, Arc<MemoryObjectStore>) {
    let objects = Arc::new(MemoryObjectStore::new());
    let manager = CacheManager::new(Arc::new(db), objects.clone()).with_retry(fast_retry());
    (manager, objects)
}

pub fn search_entry(query: &str, created_at: DateTime<Utc>) -> SearchCacheEntry {
    SearchCacheEntry {
        key: search_fingerprint(query),
        query_json: None,
        payload: format!(r#"{{"q":"{query}","results":[]}}"#),
        created_at,
    }
}

/// Insert `count` search entries created `age_hours` before [`now`].
pub async fn seed_search(db: &CacheDb, count: usize, age_hours: i64) {
    for i in 0..count {
        let entry = search_entry(&format!("query {age_hours}h #{i}"), now() - ChronoDuration::hours(age_hours));
        db.upsert_search_entry(&entry).await.unwrap();
    }
}

/// Insert an image row plus its blob.
pub async fn seed_image(db: &CacheDb, objects: &MemoryObjectStore, key: &str, age_days: i64, hits: u64) {
    db.upsert_image_entry(&ImageCacheEntry {
        key: key.to_string(),
        content_type: Some("image/png".to_string()),
        size_bytes: Some(2048),
        hit_count: hits,
        created_at: now() - ChronoDuration::days(age_days),
    })
    .await
    .unwrap();
    objects.put(key).await;
}

fn busy() -> Error {
    rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error { code: rusqlite::ErrorCode::DatabaseBusy, extended_code: 5 },
        Some("database is locked".to_string()),
    )
    .into()
}

/// Store without conditional deletes whose calls take `delay`.
pub struct SlowNonAtomicStore {
    inner: CacheDb,
    delay: Duration,
}

impl SlowNonAtomicStore {
    pub fn new(inner: CacheDb, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl MetadataStore for SlowNonAtomicStore {
    async fn delete_search_where(&self, filter: SearchFilter) -> Result<u64, Error> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete_search_where(filter).await
    }

    async fn select_images_where(&self, filter: ImageFilter) -> Result<Vec<String>, Error> {
        tokio::time::sleep(self.delay).await;
        self.inner.select_images_where(filter).await
    }

    async fn delete_images_where(&self, keys: &[String], filter: ImageFilter) -> Result<Vec<String>, Error> {
        self.inner.delete_images_where(keys, filter).await
    }

    async fn delete_all_search(&self) -> Result<u64, Error> {
        self.inner.delete_all_search().await
    }

    async fn search_stats(&self) -> Result<SearchCacheStats, Error> {
        self.inner.search_stats().await
    }

    async fn image_stats(&self) -> Result<ImageCacheStats, Error> {
        self.inner.image_stats().await
    }

    async fn get_search_entry(&self, key: &str) -> Result<Option<SearchCacheEntry>, Error> {
        self.inner.get_search_entry(key).await
    }

    async fn get_image_entry(&self, key: &str) -> Result<Option<ImageCacheEntry>, Error> {
        self.inner.get_image_entry(key).await
    }

    fn supports_conditional_delete(&self) -> bool {
        false
    }
}

/// Store whose first `failures` calls report SQLITE_BUSY.
pub struct FlakyStore {
    inner: CacheDb,
    remaining: AtomicU32,
}

impl FlakyStore {
    pub fn new(inner: CacheDb, failures: u32) -> Self {
        Self { inner, remaining: AtomicU32::new(failures) }
    }

    fn trip(&self) -> Result<(), Error> {
        let tripped = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if tripped { Err(busy()) } else { Ok(()) }
    }
}

#[async_trait]
impl MetadataStore for FlakyStore {
    async fn delete_search_where(&self, filter: SearchFilter) -> Result<u64, Error> {
        self.trip()?;
        self.inner.delete_search_where(filter).await
    }

    async fn select_images_where(&self, filter: ImageFilter) -> Result<Vec<String>, Error> {
        self.trip()?;
        self.inner.select_images_where(filter).await
    }

    async fn delete_images_where(&self, keys: &[String], filter: ImageFilter) -> Result<Vec<String>, Error> {
        self.trip()?;
        self.inner.delete_images_where(keys, filter).await
    }

    async fn delete_all_search(&self) -> Result<u64, Error> {
        self.trip()?;
        self.inner.delete_all_search().await
    }

    async fn search_stats(&self) -> Result<SearchCacheStats, Error> {
        self.trip()?;
        self.inner.search_stats().await
    }

    async fn image_stats(&self) -> Result<ImageCacheStats, Error> {
        self.trip()?;
        self.inner.image_stats().await
    }

    async fn get_search_entry(&self, key: &str) -> Result<Option<SearchCacheEntry>, Error> {
        self.trip()?;
        self.inner.get_search_entry(key).await
    }

    async fn get_image_entry(&self, key: &str) -> Result<Option<ImageCacheEntry>, Error> {
        self.trip()?;
        self.inner.get_image_entry(key).await
    }
}

/// Store whose image delete also reports `extra` as removed.
pub struct OverReportingStore {
    inner: CacheDb,
    extra: Vec<String>,
}

impl OverReportingStore {
    pub fn new(inner: CacheDb, extra: &[&str]) -> Self {
        Self { inner, extra: extra.iter().map(|k| k.to_string()).collect() }
    }
}

#[async_trait]
impl MetadataStore for OverReportingStore {
    async fn delete_search_where(&self, filter: SearchFilter) -> Result<u64, Error> {
        self.inner.delete_search_where(filter).await
    }

    async fn select_images_where(&self, filter: ImageFilter) -> Result<Vec<String>, Error> {
        self.inner.select_images_where(filter).await
    }

    async fn delete_images_where(&self, keys: &[String], filter: ImageFilter) -> Result<Vec<String>, Error> {
        let mut deleted = self.inner.delete_images_where(keys, filter).await?;
        deleted.extend(self.extra.iter().cloned());
        Ok(deleted)
    }

    async fn delete_all_search(&self) -> Result<u64, Error> {
        self.inner.delete_all_search().await
    }

    async fn search_stats(&self) -> Result<SearchCacheStats, Error> {
        self.inner.search_stats().await
    }

    async fn image_stats(&self) -> Result<ImageCacheStats, Error> {
        self.inner.image_stats().await
    }

    async fn get_search_entry(&self, key: &str) -> Result<Option<SearchCacheEntry>, Error> {
        self.inner.get_search_entry(key).await
    }

    async fn get_image_entry(&self, key: &str) -> Result<Option<ImageCacheEntry>, Error> {
        self.inner.get_image_entry(key).await
    }
}

/// Object store whose deletes take `delay`; tracks peak concurrency.
pub struct SlowObjectStore {
    pub inner: MemoryObjectStore,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SlowObjectStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryObjectStore::new(),
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for SlowObjectStore {
    async fn delete(&self, key: &str) -> Result<DeleteOutcome, Error> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let outcome = self.inner.delete(key).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}
