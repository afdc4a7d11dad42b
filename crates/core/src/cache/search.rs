//! Search-result cache table.
//!
//! Rows are keyed by query fingerprint and never updated in place: a
//! re-fetch overwrites the whole row. Deletes are always set-based
//! (`DELETE ... WHERE`) so overlapping sweeps each remove only what still
//! matches when their statement runs.

use super::connection::{CacheDb, decode_ts, encode_ts};
use crate::Error;
use crate::lifecycle::policy::{SEARCH_TTL_HOURS, SearchFilter};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

/// A cached search-result document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCacheEntry {
    /// Normalized query fingerprint.
    pub key: String,
    /// Request parameters the payload answers, if recorded.
    pub query_json: Option<String>,
    /// Opaque search-result document.
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

impl SearchCacheEntry {
    /// Freshness horizon: `created_at + 24h`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::hours(i64::from(SEARCH_TTL_HOURS))
    }
}

/// Point-in-time aggregates over the search table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCacheStats {
    pub entries: u64,
    pub payload_bytes: u64,
    pub oldest_created_at: Option<DateTime<Utc>>,
    pub newest_created_at: Option<DateTime<Utc>>,
}

impl CacheDb {
    /// Insert or replace a search entry by key.
    pub async fn upsert_search_entry(&self, entry: &SearchCacheEntry) -> Result<(), Error> {
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO search_cache (key, query_json, payload, created_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(key) DO UPDATE SET
                        query_json = excluded.query_json,
                        payload = excluded.payload,
                        created_at = excluded.created_at",
                    params![entry.key, entry.query_json, entry.payload, encode_ts(entry.created_at)],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get a search entry by key.
    ///
    /// Returns None if the key doesn't exist in the cache.
    pub async fn get_search_entry(&self, key: &str) -> Result<Option<SearchCacheEntry>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<SearchCacheEntry>, Error> {
                let mut stmt =
                    conn.prepare("SELECT key, query_json, payload, created_at FROM search_cache WHERE key = ?1")?;

                let result = stmt.query_row(params![key], |row| {
                    let created_at: String = row.get(3)?;
                    Ok(SearchCacheEntry {
                        key: row.get(0)?,
                        query_json: row.get(1)?,
                        payload: row.get(2)?,
                        created_at: decode_ts(3, &created_at)?,
                    })
                });

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every search entry matching the filter in one statement.
    ///
    /// Returns the number of deleted entries.
    pub async fn delete_search_where(&self, filter: SearchFilter) -> Result<u64, Error> {
        let cutoff = encode_ts(filter.created_at_or_before);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM search_cache WHERE created_at <= ?1", params![cutoff])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every search entry unconditionally.
    ///
    /// Returns the number of deleted entries.
    pub async fn delete_all_search(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM search_cache", [])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Count and aggregate the search table.
    pub async fn search_stats(&self) -> Result<SearchCacheStats, Error> {
        self.conn
            .call(|conn| -> Result<SearchCacheStats, Error> {
                let stats = conn.query_row(
                    "SELECT COUNT(*), COALESCE(SUM(LENGTH(CAST(payload AS BLOB))), 0), MIN(created_at), MAX(created_at)
                     FROM search_cache",
                    [],
                    |row| {
                        let oldest: Option<String> = row.get(2)?;
                        let newest: Option<String> = row.get(3)?;
                        Ok(SearchCacheStats {
                            entries: row.get::<_, i64>(0)? as u64,
                            payload_bytes: row.get::<_, i64>(1)? as u64,
                            oldest_created_at: oldest.as_deref().map(|raw| decode_ts(2, raw)).transpose()?,
                            newest_created_at: newest.as_deref().map(|raw| decode_ts(3, raw)).transpose()?,
                        })
                    },
                )?;
                Ok(stats)
            })
            .await
            .map_err(Error::from)
    }
}
