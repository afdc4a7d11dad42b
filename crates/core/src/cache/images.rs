//! Image usage table.
//!
//! Each row tracks a derived image whose bytes live in the object store
//! under the same key. `hit_count` is incremented by the read path; the
//! lifecycle manager only reads it and deletes rows.

use super::connection::{CacheDb, decode_ts, encode_ts};
use crate::Error;
use crate::lifecycle::policy::ImageFilter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

/// A cached derived image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCacheEntry {
    /// Object store key of the blob.
    pub key: String,
    pub content_type: Option<String>,
    pub size_bytes: Option<u64>,
    pub hit_count: u64,
    pub created_at: DateTime<Utc>,
}

impl ImageCacheEntry {
    /// Whole days elapsed since the image was first cached.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days()
    }
}

/// Point-in-time aggregates over the image table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageCacheStats {
    pub entries: u64,
    pub total_bytes: u64,
    pub total_hits: u64,
    pub oldest_created_at: Option<DateTime<Utc>>,
}

fn to_sql_int(field: &str, value: u64) -> Result<i64, Error> {
    i64::try_from(value).map_err(|_| Error::InvalidInput(format!("{field} {value} exceeds the storable range")))
}

fn filter_params(filter: &ImageFilter) -> (String, i64) {
    (encode_ts(filter.created_at_or_before), i64::from(filter.hits_below))
}

impl CacheDb {
    /// Insert or replace an image row by key.
    pub async fn upsert_image_entry(&self, entry: &ImageCacheEntry) -> Result<(), Error> {
        let size_bytes = entry.size_bytes.map(|b| to_sql_int("size_bytes", b)).transpose()?;
        let hit_count = to_sql_int("hit_count", entry.hit_count)?;
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO image_cache (key, content_type, size_bytes, hit_count, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(key) DO UPDATE SET
                        content_type = excluded.content_type,
                        size_bytes = excluded.size_bytes,
                        hit_count = excluded.hit_count,
                        created_at = excluded.created_at",
                    params![
                        entry.key,
                        entry.content_type,
                        size_bytes,
                        hit_count,
                        encode_ts(entry.created_at),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get an image row by key.
    pub async fn get_image_entry(&self, key: &str) -> Result<Option<ImageCacheEntry>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<ImageCacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key, content_type, size_bytes, hit_count, created_at FROM image_cache WHERE key = ?1",
                )?;

                let result = stmt.query_row(params![key], |row| {
                    let created_at: String = row.get(4)?;
                    Ok(ImageCacheEntry {
                        key: row.get(0)?,
                        content_type: row.get(1)?,
                        size_bytes: row.get::<_, Option<i64>>(2)?.map(|b| b as u64),
                        hit_count: row.get::<_, i64>(3)? as u64,
                        created_at: decode_ts(4, &created_at)?,
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

    /// Keys of every image matching the filter, oldest first.
    pub async fn select_images_where(&self, filter: ImageFilter) -> Result<Vec<String>, Error> {
        let (cutoff, hits_below) = filter_params(&filter);
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key FROM image_cache
                     WHERE created_at <= ?1 AND hit_count < ?2
                     ORDER BY created_at ASC, key ASC",
                )?;
                let keys = stmt
                    .query_map(params![cutoff, hits_below], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the given keys, but only those that still match the filter.
    ///
    /// Runs in one IMMEDIATE transaction. A key already removed by a
    /// concurrent sweep, or whose hit count rose past the threshold since it
    /// was selected, is skipped. Returns the keys this call removed, in the
    /// order they were given.
    pub async fn delete_images_where(&self, keys: &[String], filter: ImageFilter) -> Result<Vec<String>, Error> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let keys = keys.to_vec();
        let (cutoff, hits_below) = filter_params(&filter);
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
                let mut deleted = Vec::with_capacity(keys.len());
                {
                    let mut stmt = tx.prepare(
                        "DELETE FROM image_cache WHERE key = ?1 AND created_at <= ?2 AND hit_count < ?3",
                    )?;
                    for key in keys {
                        if stmt.execute(params![key, cutoff, hits_below])? == 1 {
                            deleted.push(key);
                        }
                    }
                }
                tx.commit()?;
                Ok(deleted)
            })
            .await
            .map_err(Error::from)
    }

    /// Count and aggregate the image table.
    pub async fn image_stats(&self) -> Result<ImageCacheStats, Error> {
        self.conn
            .call(|conn| -> Result<ImageCacheStats, Error> {
                let stats = conn.query_row(
                    "SELECT COUNT(*), COALESCE(SUM(size_bytes), 0), COALESCE(SUM(hit_count), 0), MIN(created_at)
                     FROM image_cache",
                    [],
                    |row| {
                        let oldest: Option<String> = row.get(3)?;
                        Ok(ImageCacheStats {
                            entries: row.get::<_, i64>(0)? as u64,
                            total_bytes: row.get::<_, i64>(1)? as u64,
                            total_hits: row.get::<_, i64>(2)? as u64,
                            oldest_created_at: oldest.as_deref().map(|raw| decode_ts(3, raw)).transpose()?,
                        })
                    },
                )?;
                Ok(stats)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::policy::{EvictionPolicy, unused_image_predicate};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
    }

    fn image(key: &str, age_days: i64, hits: u64) -> ImageCacheEntry {
        ImageCacheEntry {
            key: key.to_string(),
            content_type: Some("image/webp".to_string()),
            size_bytes: Some(1024),
            hit_count: hits,
            created_at: now() - Duration::days(age_days),
        }
    }

    async fn seeded() -> CacheDb {
        let db = CacheDb::open_in_memory().await.unwrap();
        for entry in [image("A", 40, 0), image("B", 40, 5), image("C", 5, 0), image("D", 31, 1)] {
            db.upsert_image_entry(&entry).await.unwrap();
        }
        db
    }

    fn default_filter() -> ImageFilter {
        unused_image_predicate(now(), &EvictionPolicy::default())
    }

    #[tokio::test]
    async fn test_put_and_get_image() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let stored = image("renders/a.webp", 3, 7);
        db.upsert_image_entry(&stored).await.unwrap();

        let retrieved = db.get_image_entry("renders/a.webp").await.unwrap().unwrap();
        assert_eq!(retrieved, stored);
        assert_eq!(retrieved.age_days(now()), 3);
        assert!(db.get_image_entry("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_rejects_unstorable_counts() {
        let db = CacheDb::open_in_memory().await.unwrap();

        let too_many_hits = ImageCacheEntry { hit_count: u64::MAX, ..image("hot", 1, 0) };
        let err = db.upsert_image_entry(&too_many_hits).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref msg) if msg.contains("hit_count")));

        let too_big = ImageCacheEntry { size_bytes: Some(i64::MAX as u64 + 1), ..image("big", 1, 0) };
        let err = db.upsert_image_entry(&too_big).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref msg) if msg.contains("size_bytes")));

        assert_eq!(db.image_stats().await.unwrap().entries, 0);
    }

    #[tokio::test]
    async fn test_select_images_where_orders_oldest_first() {
        let db = seeded().await;
        let keys = db.select_images_where(default_filter()).await.unwrap();
        assert_eq!(keys, vec!["A".to_string(), "D".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_images_where_rechecks_filter() {
        let db = seeded().await;
        let keys = db.select_images_where(default_filter()).await.unwrap();

        // D becomes popular between select and delete.
        db.upsert_image_entry(&image("D", 31, 9)).await.unwrap();

        let deleted = db.delete_images_where(&keys, default_filter()).await.unwrap();
        assert_eq!(deleted, vec!["A".to_string()]);
        assert!(db.get_image_entry("D").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_images_where_twice_deletes_once() {
        let db = seeded().await;
        let keys = db.select_images_where(default_filter()).await.unwrap();

        let first = db.delete_images_where(&keys, default_filter()).await.unwrap();
        let second = db.delete_images_where(&keys, default_filter()).await.unwrap();
        assert_eq!(first.len(), 2);
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_delete_images_where_empty_keys() {
        let db = seeded().await;
        assert!(db.delete_images_where(&[], default_filter()).await.unwrap().is_empty());
        assert_eq!(db.image_stats().await.unwrap().entries, 4);
    }

    #[tokio::test]
    async fn test_image_stats() {
        let db = seeded().await;
        let stats = db.image_stats().await.unwrap();
        assert_eq!(stats.entries, 4);
        assert_eq!(stats.total_bytes, 4096);
        assert_eq!(stats.total_hits, 6);
        assert_eq!(stats.oldest_created_at, Some(now() - Duration::days(40)));
    }
}
