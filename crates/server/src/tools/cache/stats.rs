//! cache_stats tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};

use cachekeep_core::CacheManager;

use super::json_content;

/// Implementation of the cache_stats tool.
pub async fn stats_impl(manager: &CacheManager) -> Result<CallToolResult, McpError> {
    let stats = manager.get_cache_stats().await?;
    Ok(CallToolResult::success(vec![json_content(&stats)?]))
}
