//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the cache lifecycle tools.
use std::sync::Arc;

use crate::tools::{CacheCleanupParams, cleanup_impl, stats_impl};

use cachekeep_core::{AppConfig, CacheManager};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for cachekeep.
#[derive(Clone)]
pub struct CacheKeepServer {
    tool_router: ToolRouter<Self>,
    manager: CacheManager,
    config: Arc<AppConfig>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl CacheKeepServer {
    /// Create a new server handler.
    pub fn new(manager: CacheManager, config: Arc<AppConfig>) -> Self {
        Self { tool_router: Self::tool_router(), manager, config }
    }

    /// Run the cache cleanup, or force-clear the search cache.
    #[tool(
        description = "Evict expired search results and unused images, returning before/after stats. With forceAll, delete every search cache entry instead. Operator only."
    )]
    async fn cache_cleanup(&self, params: Parameters<CacheCleanupParams>) -> Result<CallToolResult, McpError> {
        cleanup_impl(&self.manager, &self.config, params.0).await
    }

    /// Report entry counts and size/age aggregates for both caches.
    #[tool(description = "Report entry counts, sizes and ages for the search and image caches.")]
    async fn cache_stats(&self) -> Result<CallToolResult, McpError> {
        stats_impl(&self.manager).await
    }
}

impl ServerHandler for CacheKeepServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "cachekeep".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
