//! cachekeep CLI
//!
//! Operator commands for the cache lifecycle manager, suitable for cron or a
//! shell. Reports go to stdout as pretty JSON; logs go to stderr.
//!
//! # Commands
//!
//! - `stats`: entry counts and size/age aggregates for both caches
//! - `cleanup`: policy sweep with before/after stats
//! - `flush --yes`: delete every search cache entry

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cachekeep_client::object_store_from_config;
use cachekeep_core::{AppConfig, CacheDb, CacheManager};

#[derive(Debug, Parser)]
#[command(name = "cachekeep")]
#[command(version)]
#[command(about = "Expire, evict and report on the search and image caches")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
enum Command {
    /// Print cache statistics
    Stats,
    /// Expire stale search results and evict unused images
    Cleanup {
        /// Evict images created at least this many days ago
        #[arg(long, allow_negative_numbers = true)]
        max_age_days: Option<i64>,

        /// Evict images with fewer hits than this
        #[arg(long, allow_negative_numbers = true)]
        min_hits: Option<i64>,

        /// Abort the run after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Delete every search cache entry
    Flush {
        /// Confirm the flush
        #[arg(long)]
        yes: bool,
    },
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .init();
}

/// Run one command and render its report.
async fn execute(command: Command, manager: &CacheManager, config: &AppConfig) -> Result<String> {
    let now = Utc::now();

    let json = match command {
        Command::Stats => serde_json::to_string_pretty(&manager.get_cache_stats().await?)?,
        Command::Cleanup { max_age_days, min_hits, timeout_ms } => {
            let policy = config.eviction_policy(max_age_days, min_hits)?;
            let timeout = timeout_ms.map(Duration::from_millis).unwrap_or_else(|| config.sweep_timeout());
            let report = manager.cleanup_report(now, &policy, timeout).await?;
            if !report.cleanup.failed_blob_keys.is_empty() {
                tracing::warn!(failed = report.cleanup.failed_blob_keys.len(), "some blobs could not be deleted");
            }
            serde_json::to_string_pretty(&report)?
        }
        Command::Flush { yes } => {
            if !yes {
                bail!("refusing to flush the search cache without --yes");
            }
            serde_json::to_string_pretty(&manager.force_clear_report(now).await?)?
        }
    };

    Ok(json)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = AppConfig::load().context("loading configuration")?;
    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening metadata store at {}", config.db_path.display()))?;
    let objects = object_store_from_config(&config).context("building object store")?;
    let manager = CacheManager::from_config(Arc::new(db.clone()), objects, &config);

    let output = execute(cli.command, &manager, &config).await?;
    println!("{output}");

    db.close().await?;
    Ok(())
}
