//! Core types and shared functionality for cachekeep.
//!
//! This crate provides:
//! - SQLite metadata store for the search and image caches
//! - Cache lifecycle sweeps, force-clear and stats
//! - Object store port for image blobs
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod objects;
pub mod retry;

pub use cache::{CacheDb, MetadataStore};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use lifecycle::{CacheManager, CacheStats, CleanupReport, CleanupResult, EvictionPolicy, ForceClearReport};
pub use objects::{DeleteOutcome, MemoryObjectStore, ObjectStore};
pub use retry::RetryPolicy;
