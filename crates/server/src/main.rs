//! cachekeep MCP server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use cachekeep_client::object_store_from_config;
use cachekeep_core::{AppConfig, CacheDb, CacheManager};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening metadata store at {}", config.db_path.display()))?;
    let objects = object_store_from_config(&config).context("building object store")?;
    let manager = CacheManager::from_config(Arc::new(db), objects, &config);

    tracing::info!(db_path = %config.db_path.display(), "Starting cachekeep server on stdio transport");

    let handler = handler::CacheKeepServer::new(manager, Arc::new(config));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
