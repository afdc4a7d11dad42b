//! MCP tool implementations.
//!
//! This module contains all tools exposed by the cachekeep server.

pub mod cache;

pub use cache::{CacheCleanupParams, cleanup_impl, stats_impl};
