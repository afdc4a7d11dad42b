//! Force-clear: emergency invalidation of the whole search cache.
//!
//! Bypasses the policy engine entirely. Callers are expected to have
//! authorized the operator before reaching this point.

use serde::{Deserialize, Serialize};

use super::CacheManager;
use crate::Error;
use crate::retry::retry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceClearResult {
    pub deleted_count: u64,
}

impl CacheManager {
    /// Delete every search cache entry. Clearing an empty cache returns 0.
    pub async fn force_clear_search_cache(&self) -> Result<ForceClearResult, Error> {
        let deleted_count = retry(&self.retry, "delete_all_search", || self.store.delete_all_search()).await?;
        tracing::info!(deleted_count, "search cache force-cleared");
        Ok(ForceClearResult { deleted_count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::EvictionPolicy;
    use crate::lifecycle::testing::*;

    #[tokio::test]
    async fn test_scenario_c_empty_table() {
        let (manager, _) = manager_for(memory_db().await).await;
        let result = manager.force_clear_search_cache().await.unwrap();
        assert_eq!(result, ForceClearResult { deleted_count: 0 });
    }

    #[tokio::test]
    async fn test_force_clear_completeness() {
        let db = memory_db().await;
        let (manager, objects) = manager_for(db.clone()).await;
        seed_search(&db, 3, 1).await;
        seed_search(&db, 2, 48).await;
        seed_image(&db, &objects, "kept", 90, 0).await;

        let before = manager.get_cache_stats().await.unwrap();
        let result = manager.force_clear_search_cache().await.unwrap();
        let after = manager.get_cache_stats().await.unwrap();

        assert_eq!(result.deleted_count, before.search_entries());
        assert_eq!(after.search_entries(), 0);
        // Images are not part of a search flush.
        assert_eq!(after.image_entries(), 1);
        assert!(objects.contains("kept").await);
    }

    #[tokio::test]
    async fn test_force_clear_is_idempotent() {
        let db = memory_db().await;
        let (manager, _) = manager_for(db.clone()).await;
        seed_search(&db, 4, 1).await;

        assert_eq!(manager.force_clear_search_cache().await.unwrap().deleted_count, 4);
        assert_eq!(manager.force_clear_search_cache().await.unwrap().deleted_count, 0);
    }

    #[tokio::test]
    async fn test_force_clear_alongside_sweep() {
        let db = memory_db().await;
        let (manager, _) = manager_for(db.clone()).await;
        seed_search(&db, 5, 30).await;
        seed_search(&db, 5, 1).await;

        let policy = EvictionPolicy::default();
        let (sweep, flush) = tokio::join!(manager.run_cleanup(now(), &policy), manager.force_clear_search_cache());

        assert_eq!(sweep.unwrap().expired_search_count + flush.unwrap().deleted_count, 10);
        assert_eq!(db.search_stats().await.unwrap().entries, 0);
    }
}
