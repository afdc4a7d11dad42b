//! cache_cleanup tool implementation.
//!
//! Runs the policy sweep with before/after stats, or force-clears the search
//! cache when `forceAll` is set. Operator authorization happens upstream.

use chrono::Utc;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use cachekeep_core::{AppConfig, CacheManager};

use super::json_content;

/// Parameters for the cache_cleanup tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheCleanupParams {
    /// Delete every search cache entry instead of running the policy sweep.
    #[serde(default)]
    pub force_all: bool,

    /// Evict images created at least this many days ago (default from config).
    pub max_age_days: Option<i64>,

    /// Evict images with fewer hits than this (default from config).
    pub min_hits: Option<i64>,
}

/// Implementation of the cache_cleanup tool.
pub async fn cleanup_impl(
    manager: &CacheManager, config: &AppConfig, params: CacheCleanupParams,
) -> Result<CallToolResult, McpError> {
    let now = Utc::now();

    let content = if params.force_all {
        tracing::info!("force-clearing search cache");
        let report = manager.force_clear_report(now).await?;
        json_content(&report)?
    } else {
        let policy = config.eviction_policy(params.max_age_days, params.min_hits)?;
        let report = manager.cleanup_report(now, &policy, config.sweep_timeout()).await?;
        json_content(&report)?
    };

    Ok(CallToolResult::success(vec![content]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::cache::testing::*;
    use cachekeep_core::{CleanupReport, ForceClearReport};

    #[tokio::test]
    async fn test_cleanup_default_policy() {
        let (db, manager, objects) = setup().await;
        seed_search(&db, "stale", 30).await;
        seed_search(&db, "fresh", 2).await;
        seed_image(&db, &objects, "A", 40, 0).await;
        seed_image(&db, &objects, "B", 40, 5).await;

        let result = cleanup_impl(&manager, &AppConfig::default(), CacheCleanupParams::default())
            .await
            .unwrap();
        let report: CleanupReport = parse_output(&result);

        assert!(report.success);
        assert_eq!(report.cleanup.expired_search_entries, 1);
        assert_eq!(report.cleanup.unused_image_keys, vec!["A".to_string()]);
        assert_eq!(report.stats_before.search_entries(), 2);
        assert_eq!(report.stats_after.search_entries(), 1);
        assert!(!objects.contains("A").await);
        assert!(objects.contains("B").await);
    }

    #[tokio::test]
    async fn test_cleanup_policy_overrides() {
        let (db, manager, objects) = setup().await;
        seed_image(&db, &objects, "B", 40, 5).await;

        let params = CacheCleanupParams { force_all: false, max_age_days: Some(7), min_hits: Some(10) };
        let result = cleanup_impl(&manager, &AppConfig::default(), params).await.unwrap();
        let report: CleanupReport = parse_output(&result);

        assert_eq!(report.policy.max_age_days(), 7);
        assert_eq!(report.cleanup.unused_images, 1);
    }

    #[tokio::test]
    async fn test_cleanup_rejects_negative_policy() {
        let (db, manager, objects) = setup().await;
        seed_image(&db, &objects, "A", 40, 0).await;

        let params = CacheCleanupParams { force_all: false, max_age_days: Some(-1), min_hits: None };
        let err = cleanup_impl(&manager, &AppConfig::default(), params).await.unwrap_err();

        assert_eq!(err.code.0, -32602);
        assert!(objects.contains("A").await);
        assert_eq!(db.image_stats().await.unwrap().entries, 1);
    }

    #[tokio::test]
    async fn test_cleanup_force_all() {
        let (db, manager, objects) = setup().await;
        seed_search(&db, "one", 1).await;
        seed_search(&db, "two", 100).await;
        seed_image(&db, &objects, "A", 40, 0).await;

        let params = CacheCleanupParams { force_all: true, ..Default::default() };
        let result = cleanup_impl(&manager, &AppConfig::default(), params).await.unwrap();
        let report: ForceClearReport = parse_output(&result);

        assert!(report.success);
        assert_eq!(report.deleted_count, 2);
        assert_eq!(db.image_stats().await.unwrap().entries, 1);
    }

    #[test]
    fn test_params_wire_names() {
        let params: CacheCleanupParams =
            serde_json::from_str(r#"{"forceAll": true, "maxAgeDays": 3, "minHits": 1}"#).unwrap();
        assert!(params.force_all);
        assert_eq!(params.max_age_days, Some(3));
        assert_eq!(params.min_hits, Some(1));

        let params: CacheCleanupParams = serde_json::from_str("{}").unwrap();
        assert!(!params.force_all);

        assert!(serde_json::from_str::<CacheCleanupParams>(r#"{"maxAgeDays": 2.5}"#).is_err());
    }
}
