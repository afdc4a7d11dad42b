//! Eviction policy engine.
//!
//! Pure decision logic: given an injected `now` and the policy thresholds,
//! compute the filters that select eviction candidates. Nothing here reads
//! the clock or touches a store, so every decision is reproducible in tests.
//!
//! - Search entries expire once `created_at <= now - ttl_hours`.
//! - Images are unused once `created_at <= now - max_age_days` **and**
//!   `hit_count < min_hits`. Failing either condition protects the image.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Freshness horizon for search results.
pub const SEARCH_TTL_HOURS: u32 = 24;

/// Age threshold used by the scheduled sweep.
pub const DEFAULT_MAX_AGE_DAYS: u32 = 30;

/// Hit threshold used by the scheduled sweep.
pub const DEFAULT_MIN_HITS: u32 = 2;

/// Selects search entries created at or before the cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchFilter {
    pub created_at_or_before: DateTime<Utc>,
}

impl SearchFilter {
    pub fn matches(&self, created_at: DateTime<Utc>) -> bool {
        created_at <= self.created_at_or_before
    }
}

/// Selects images at least as old as the cutoff with fewer than `hits_below` hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageFilter {
    pub created_at_or_before: DateTime<Utc>,
    pub hits_below: u32,
}

impl ImageFilter {
    pub fn matches(&self, created_at: DateTime<Utc>, hit_count: u64) -> bool {
        created_at <= self.created_at_or_before && hit_count < u64::from(self.hits_below)
    }
}

/// Validated usage-eviction thresholds.
///
/// `max_age_days = 0` is a real threshold (every low-hit image is old
/// enough), not a way of switching eviction off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvictionPolicy {
    max_age_days: u32,
    min_hits: u32,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self { max_age_days: DEFAULT_MAX_AGE_DAYS, min_hits: DEFAULT_MIN_HITS }
    }
}

impl EvictionPolicy {
    /// Validate caller-supplied thresholds.
    ///
    /// # Errors
    ///
    /// Returns `Error::PolicyInput` when either value is negative or does
    /// not fit in 32 bits. No store has been touched at that point.
    pub fn new(max_age_days: i64, min_hits: i64) -> Result<Self, Error> {
        Ok(Self { max_age_days: threshold("max_age_days", max_age_days)?, min_hits: threshold("min_hits", min_hits)? })
    }

    pub fn max_age_days(&self) -> u32 {
        self.max_age_days
    }

    pub fn min_hits(&self) -> u32 {
        self.min_hits
    }
}

fn threshold(field: &str, value: i64) -> Result<u32, Error> {
    if value < 0 {
        return Err(Error::PolicyInput(format!("{field} must be a non-negative integer, got {value}")));
    }
    u32::try_from(value).map_err(|_| Error::PolicyInput(format!("{field} is too large: {value}")))
}

/// Filter for search entries whose TTL has elapsed at `now`.
pub fn expired_search_predicate(now: DateTime<Utc>, ttl_hours: u32) -> SearchFilter {
    SearchFilter { created_at_or_before: cutoff(now, TimeDelta::try_hours(i64::from(ttl_hours))) }
}

/// Filter for images that are both old enough and rarely hit at `now`.
pub fn unused_image_predicate(now: DateTime<Utc>, policy: &EvictionPolicy) -> ImageFilter {
    ImageFilter {
        created_at_or_before: cutoff(now, TimeDelta::try_days(i64::from(policy.max_age_days))),
        hits_below: policy.min_hits,
    }
}

/// `now - delta`, clamped to the earliest representable instant.
///
/// A clamped cutoff selects nothing, which is the right reading of an
/// age threshold longer than recorded time.
fn cutoff(now: DateTime<Utc>, delta: Option<TimeDelta>) -> DateTime<Utc> {
    delta
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
