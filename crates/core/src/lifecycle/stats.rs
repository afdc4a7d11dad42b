//! Stats reporter.
//!
//! Plain snapshot reads: no locks, so it can run before, during, or after
//! a sweep to produce a diff.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CacheManager;
use crate::Error;
use crate::cache::{ImageCacheStats, SearchCacheStats};
use crate::retry::retry;

/// Point-in-time view of both cache classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub search: SearchCacheStats,
    pub images: ImageCacheStats,
    pub collected_at: DateTime<Utc>,
}

impl CacheStats {
    pub fn search_entries(&self) -> u64 {
        self.search.entries
    }

    pub fn image_entries(&self) -> u64 {
        self.images.entries
    }
}

impl CacheManager {
    /// Count current rows (plus size/age aggregates) in each cache class.
    pub async fn get_cache_stats(&self) -> Result<CacheStats, Error> {
        let search = retry(&self.retry, "search_stats", || self.store.search_stats()).await?;
        let images = retry(&self.retry, "image_stats", || self.store.image_stats()).await?;

        tracing::debug!(search_entries = search.entries, image_entries = images.entries, "collected cache stats");
        Ok(CacheStats { search, images, collected_at: Utc::now() })
    }
}
