//! Operator-facing payloads for the cleanup entry points.
//!
//! `cleanup_report` backs the plain cleanup call (stats, sweep, stats);
//! `force_clear_report` backs the `forceAll` variant.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CacheManager;
use super::policy::EvictionPolicy;
use super::stats::CacheStats;
use super::sweeper::CleanupResult;
use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupSummary {
    pub expired_search_entries: u64,
    pub unused_images: u64,
    pub unused_image_keys: Vec<String>,
    /// Evicted keys whose blobs are still in the object store.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_blob_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
}

impl From<&CleanupResult> for CleanupSummary {
    fn from(result: &CleanupResult) -> Self {
        Self {
            expired_search_entries: result.expired_search_count,
            unused_images: result.unused_image_count,
            unused_image_keys: result.unused_image_keys.clone(),
            failed_blob_keys: result.failed_blob_keys().into_iter().map(str::to_string).collect(),
            skipped: result.skipped,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub policy: EvictionPolicy,
    pub cleanup: CleanupSummary,
    pub stats_before: CacheStats,
    pub stats_after: CacheStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceClearReport {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub deleted_count: u64,
}

impl CacheManager {
    /// Stats before, one sweep, stats after; all within `timeout`.
    pub async fn cleanup_report(
        &self, now: DateTime<Utc>, policy: &EvictionPolicy, timeout: Duration,
    ) -> Result<CleanupReport, Error> {
        let work = async {
            let stats_before = self.get_cache_stats().await?;
            let result = self.run_cleanup(now, policy).await?;
            let stats_after = self.get_cache_stats().await?;
            Ok::<_, Error>(CleanupReport {
                success: true,
                timestamp: now,
                policy: *policy,
                cleanup: CleanupSummary::from(&result),
                stats_before,
                stats_after,
            })
        };

        tokio::time::timeout(timeout, work).await.map_err(|_| {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "cleanup report timed out");
            Error::TimedOut { operation: "cleanup".to_string(), timeout_ms: timeout.as_millis() as u64 }
        })?
    }

    /// Force-clear the search cache and describe what happened.
    pub async fn force_clear_report(&self, now: DateTime<Utc>) -> Result<ForceClearReport, Error> {
        let result = self.force_clear_search_cache().await?;
        Ok(ForceClearReport {
            success: true,
            timestamp: now,
            message: format!("Force-cleared {} search cache entries", result.deleted_count),
            deleted_count: result.deleted_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::testing::*;
    use crate::objects::FailureMode;

    #[tokio::test]
    async fn test_cleanup_report_shape() {
        let db = memory_db().await;
        let (manager, objects) = manager_for(db.clone()).await;
        seed_search(&db, 6, 25).await;
        seed_search(&db, 4, 1).await;
        seed_image(&db, &objects, "A", 40, 0).await;
        seed_image(&db, &objects, "B", 40, 5).await;
        seed_image(&db, &objects, "C", 5, 0).await;

        let report = manager
            .cleanup_report(now(), &EvictionPolicy::default(), Duration::from_secs(5))
            .await
            .unwrap();

        assert!(report.success);
        assert_eq!(report.cleanup.expired_search_entries, 6);
        assert_eq!(report.cleanup.unused_image_keys, vec!["A".to_string()]);
        assert_eq!(report.stats_before.search_entries(), 10);
        assert_eq!(report.stats_after.search_entries(), 4);
        assert_eq!(report.stats_after.image_entries(), 2);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["cleanup"]["expiredSearchEntries"], 6);
        assert_eq!(json["cleanup"]["unusedImages"], 1);
        assert_eq!(json["cleanup"]["unusedImageKeys"][0], "A");
        assert!(json["cleanup"].get("failedBlobKeys").is_none());
        assert_eq!(json["policy"]["maxAgeDays"], 30);
        assert!(json.get("statsBefore").is_some());
        assert!(json.get("statsAfter").is_some());
    }

    #[tokio::test]
    async fn test_cleanup_report_lists_failed_blobs() {
        let db = memory_db().await;
        let (manager, objects) = manager_for(db.clone()).await;
        seed_image(&db, &objects, "ok", 40, 0).await;
        seed_image(&db, &objects, "stuck", 41, 0).await;
        objects.fail_on("stuck", FailureMode::Transient).await;

        let report = manager
            .cleanup_report(now(), &EvictionPolicy::default(), Duration::from_secs(5))
            .await
            .unwrap();

        assert!(report.success);
        assert_eq!(report.cleanup.unused_images, 2);
        assert_eq!(report.cleanup.failed_blob_keys, vec!["stuck".to_string()]);
        assert_eq!(objects.attempts("stuck").await, fast_retry().max_attempts);
    }

    #[tokio::test]
    async fn test_force_clear_report() {
        let db = memory_db().await;
        let (manager, _) = manager_for(db.clone()).await;
        seed_search(&db, 3, 1).await;

        let report = manager.force_clear_report(now()).await.unwrap();
        assert!(report.success);
        assert_eq!(report.deleted_count, 3);
        assert!(report.message.contains('3'));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["deletedCount"], 3);
    }
}
