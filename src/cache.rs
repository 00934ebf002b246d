//! # Result Cache
//! Per-club memo of aggregation results with a fixed TTL.
//!
//! Every entry carries its own `stored_at`; expiry is checked lazily on read
//! and an expired entry is dropped at that point. There is no sweeper.
//! Writes are last-writer-wins.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use metrics::counter;
use parking_lot::RwLock;

use crate::aggregate::RankedResult;
use crate::clock::Clock;

pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    value: RankedResult,
    stored_at: DateTime<Utc>,
}

pub struct ResultCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl ResultCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            clock,
        }
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.stored_at) < self.ttl
    }

    /// Fresh value for `club_id`, or `None` (missing or expired).
    pub fn get(&self, club_id: &str) -> Option<RankedResult> {
        let now = self.clock.now();
        {
            let guard = self.entries.read();
            match guard.get(club_id) {
                Some(entry) if self.is_fresh(entry, now) => {
                    counter!("cache_hits_total").increment(1);
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => {
                    counter!("cache_misses_total").increment(1);
                    return None;
                }
            }
        }

        // Expired: drop it unless someone refreshed it in between.
        let mut guard = self.entries.write();
        if guard
            .get(club_id)
            .is_some_and(|entry| !self.is_fresh(entry, now))
        {
            guard.remove(club_id);
        }
        counter!("cache_misses_total").increment(1);
        None
    }

    pub fn put(&self, club_id: &str, value: RankedResult) {
        let entry = CacheEntry {
            value,
            stored_at: self.clock.now(),
        };
        self.entries.write().insert(club_id.to_string(), entry);
    }

    /// Returns true when an entry was removed.
    pub fn invalidate(&self, club_id: &str) -> bool {
        counter!("cache_invalidations_total").increment(1);
        self.entries.write().remove(club_id).is_some()
    }

    /// Clears everything; returns how many entries were dropped.
    pub fn invalidate_all(&self) -> usize {
        counter!("cache_invalidations_total").increment(1);
        let mut guard = self.entries.write();
        let n = guard.len();
        guard.clear();
        n
    }

    /// Number of stored entries, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }
}
