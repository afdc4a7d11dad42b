//! Cache lifecycle MCP tools.
//!
//! This module exposes the operator cleanup entry point and the stats report.

pub mod cleanup;
pub mod stats;

pub use cleanup::{CacheCleanupParams, cleanup_impl};
pub use stats::stats_impl;

use rmcp::{ErrorData as McpError, model::Content};
use serde::Serialize;

use cachekeep_core::Error;

/// Render a tool payload as pretty JSON text content.
pub(crate) fn json_content<T: Serialize>(value: &T) -> Result<Content, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(Content::text(json))
}
