//! SQLite-backed metadata store for the search and image caches.
//!
//! Async access goes through tokio-rusqlite. Provides:
//!
//! - Query fingerprinting for search cache keys
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Set-based conditional deletes used by the lifecycle sweeps

pub mod connection;
pub mod hash;
pub mod images;
pub mod migrations;
pub mod search;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use images::{ImageCacheEntry, ImageCacheStats};
pub use search::{SearchCacheEntry, SearchCacheStats};
pub use store::MetadataStore;
