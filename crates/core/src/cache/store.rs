//! Metadata store port.
//!
//! The lifecycle manager talks to metadata through this trait so the
//! SQLite store can be swapped for a fake (or another database) without
//! touching sweep logic.

use async_trait::async_trait;

use super::connection::CacheDb;
use super::images::{ImageCacheEntry, ImageCacheStats};
use super::search::{SearchCacheEntry, SearchCacheStats};
use crate::Error;
use crate::lifecycle::policy::{ImageFilter, SearchFilter};

/// Typed access to the search cache and image usage tables.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Atomically delete every search entry matching the filter.
    async fn delete_search_where(&self, filter: SearchFilter) -> Result<u64, Error>;

    /// Keys of images matching the filter.
    async fn select_images_where(&self, filter: ImageFilter) -> Result<Vec<String>, Error>;

    /// Delete the listed images that still match the filter; returns the keys removed by this call.
    async fn delete_images_where(&self, keys: &[String], filter: ImageFilter) -> Result<Vec<String>, Error>;

    /// Delete every search entry.
    async fn delete_all_search(&self) -> Result<u64, Error>;

    async fn search_stats(&self) -> Result<SearchCacheStats, Error>;

    async fn image_stats(&self) -> Result<ImageCacheStats, Error>;

    async fn get_search_entry(&self, key: &str) -> Result<Option<SearchCacheEntry>, Error>;

    async fn get_image_entry(&self, key: &str) -> Result<Option<ImageCacheEntry>, Error>;

    /// Whether the deletes above are atomic conditional deletes.
    ///
    /// Stores that answer `false` make the sweeper fall back to a
    /// single-flight guard.
    fn supports_conditional_delete(&self) -> bool {
        true
    }
}

#[async_trait]
impl MetadataStore for CacheDb {
    async fn delete_search_where(&self, filter: SearchFilter) -> Result<u64, Error> {
        CacheDb::delete_search_where(self, filter).await
    }

    async fn select_images_where(&self, filter: ImageFilter) -> Result<Vec<String>, Error> {
        CacheDb::select_images_where(self, filter).await
    }

    async fn delete_images_where(&self, keys: &[String], filter: ImageFilter) -> Result<Vec<String>, Error> {
        CacheDb::delete_images_where(self, keys, filter).await
    }

    async fn delete_all_search(&self) -> Result<u64, Error> {
        CacheDb::delete_all_search(self).await
    }

    async fn search_stats(&self) -> Result<SearchCacheStats, Error> {
        CacheDb::search_stats(self).await
    }

    async fn image_stats(&self) -> Result<ImageCacheStats, Error> {
        CacheDb::image_stats(self).await
    }

    async fn get_search_entry(&self, key: &str) -> Result<Option<SearchCacheEntry>, Error> {
        CacheDb::get_search_entry(self, key).await
    }

    async fn get_image_entry(&self, key: &str) -> Result<Option<ImageCacheEntry>, Error> {
        CacheDb::get_image_entry(self, key).await
    }
}
