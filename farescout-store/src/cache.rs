//! Stale-while-revalidate offer cache.
//!
//! Entries are immutable once inserted and replaced by atomic swap of
//! the `Arc` value; readers clone the pointer under a short read lock
//! and never block writers for long. The refresh set deduplicates
//! background refreshes: at most one in-flight refresh per key.

use chrono::{DateTime, Utc};
use farescout_core::{Offer, QueryKey, SourceId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

// ============================================================================
// Cache State
// ============================================================================

/// Freshness of a cache read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheState {
    /// Within the fresh window.
    Fresh,
    /// Past fresh, within the stale grace window.
    Stale,
    /// Absent or fully expired.
    Miss,
}

impl std::fmt::Display for CacheState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Fresh => "FRESH",
            Self::Stale => "STALE",
            Self::Miss => "MISS",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Cache Entry
// ============================================================================

/// One cached result set.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Merged offers, sorted by lowest price.
    pub offers: Vec<Offer>,
    /// Price count per source at generation time.
    pub source_mix: BTreeMap<SourceId, usize>,
    /// Wall-clock generation time (for display and history).
    pub generated_at: DateTime<Utc>,
    /// Monotonic generation instant (for freshness math).
    generated_mono: Instant,
    /// Fresh window.
    fresh_ttl: Duration,
    /// Stale grace window after fresh expires.
    stale_ttl: Duration,
}

impl CacheEntry {
    /// Creates an entry stamped now.
    pub fn new(
        offers: Vec<Offer>,
        source_mix: BTreeMap<SourceId, usize>,
        fresh_ttl: Duration,
        stale_ttl: Duration,
    ) -> Self {
        Self {
            offers,
            source_mix,
            generated_at: Utc::now(),
            generated_mono: Instant::now(),
            fresh_ttl,
            stale_ttl,
        }
    }

    /// Freshness of this entry right now.
    pub fn state(&self) -> CacheState {
        let age = self.generated_mono.elapsed();
        if age < self.fresh_ttl {
            CacheState::Fresh
        } else if age < self.fresh_ttl + self.stale_ttl {
            CacheState::Stale
        } else {
            CacheState::Miss
        }
    }
}

// ============================================================================
// Offer Cache
// ============================================================================

/// SWR cache over query keys.
#[derive(Debug, Default)]
pub struct OfferCache {
    entries: RwLock<HashMap<QueryKey, std::sync::Arc<CacheEntry>>>,
    refreshing: Mutex<HashSet<QueryKey>>,
}

impl OfferCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads an entry with its freshness.
    ///
    /// Fully expired entries read as a miss and are dropped lazily.
    pub fn get(&self, key: &QueryKey) -> Option<(std::sync::Arc<CacheEntry>, CacheState)> {
        let entry = {
            let entries = self.entries.read().expect("cache lock poisoned");
            entries.get(key).cloned()
        }?;
        match entry.state() {
            CacheState::Miss => {
                self.entries
                    .write()
                    .expect("cache lock poisoned")
                    .remove(key);
                None
            }
            state => Some((entry, state)),
        }
    }

    /// Atomically replaces the entry for a key.
    pub fn insert(&self, key: QueryKey, entry: CacheEntry) {
        debug!(key = %key, offers = entry.offers.len(), "Cache entry swapped");
        self.entries
            .write()
            .expect("cache lock poisoned")
            .insert(key, std::sync::Arc::new(entry));
    }

    /// Claims the refresh slot for a key.
    ///
    /// Returns false when a refresh is already in flight, making refresh
    /// scheduling idempotent.
    pub fn begin_refresh(&self, key: &QueryKey) -> bool {
        self.refreshing
            .lock()
            .expect("refresh set poisoned")
            .insert(key.clone())
    }

    /// Releases the refresh slot for a key.
    pub fn end_refresh(&self, key: &QueryKey) {
        self.refreshing
            .lock()
            .expect("refresh set poisoned")
            .remove(key);
    }

    /// Whether a refresh is currently in flight for the key.
    pub fn is_refreshing(&self, key: &QueryKey) -> bool {
        self.refreshing
            .lock()
            .expect("refresh set poisoned")
            .contains(key)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops fully expired entries.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        let before = entries.len();
        entries.retain(|_, entry| entry.state() != CacheState::Miss);
        before - entries.len()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use farescout_core::Query;

    fn key() -> QueryKey {
        Query::one_way("ICN", "NRT", NaiveDate::from_ymd_opt(2026, 4, 15).unwrap()).key()
    }

    fn entry(fresh: Duration, stale: Duration) -> CacheEntry {
        CacheEntry::new(Vec::new(), BTreeMap::new(), fresh, stale)
    }

    #[test]
    fn test_fresh_then_stale_then_miss() {
        let e = entry(Duration::from_millis(20), Duration::from_millis(20));
        assert_eq!(e.state(), CacheState::Fresh);
        std::thread::sleep(Duration::from_millis(25));
        assert_eq!(e.state(), CacheState::Stale);
        std::thread::sleep(Duration::from_millis(25));
        assert_eq!(e.state(), CacheState::Miss);
    }

    #[test]
    fn test_get_drops_expired() {
        let cache = OfferCache::new();
        cache.insert(key(), entry(Duration::ZERO, Duration::ZERO));
        std::thread::sleep(Duration::from_millis(2));
        assert!(cache.get(&key()).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_refresh_dedup() {
        let cache = OfferCache::new();
        assert!(cache.begin_refresh(&key()));
        assert!(!cache.begin_refresh(&key()), "second claim must fail");
        assert!(cache.is_refreshing(&key()));
        cache.end_refresh(&key());
        assert!(cache.begin_refresh(&key()));
    }

    #[test]
    fn test_insert_swaps_atomically() {
        let cache = OfferCache::new();
        cache.insert(key(), entry(Duration::from_secs(60), Duration::ZERO));
        let (first, state) = cache.get(&key()).unwrap();
        assert_eq!(state, CacheState::Fresh);

        cache.insert(key(), entry(Duration::from_secs(60), Duration::ZERO));
        let (second, _) = cache.get(&key()).unwrap();
        // Old readers keep their pointer; new readers see the swap.
        assert!(second.generated_at >= first.generated_at);
    }

    #[test]
    fn test_purge() {
        let cache = OfferCache::new();
        cache.insert(key(), entry(Duration::ZERO, Duration::ZERO));
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(cache.purge_expired(), 1);
    }
}
