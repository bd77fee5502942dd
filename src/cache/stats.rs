//! Resolution cache statistics

use std::sync::atomic::{AtomicU64, Ordering};

/// Resolution cache statistics
///
/// All counters are atomic so they can be read without taking the cache lock.
///
/// # Example
///
/// ```
/// use rust_inet::cache::CacheStats;
///
/// let stats = CacheStats::default();
/// stats.record_hit();
/// assert_eq!(stats.hits(), 1);
/// ```
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Lookups answered from a live positive record
    hits: AtomicU64,
    /// Lookups answered from a live negative record
    negative_hits: AtomicU64,
    /// Lookups that found nothing usable (absent or stale)
    misses: AtomicU64,
    /// Lookups that found a stale record
    stale: AtomicU64,
    /// Records inserted or replaced
    inserts: AtomicU64,
    /// Records dropped to stay within capacity
    evictions: AtomicU64,
    /// Puts skipped because the TTL policy said do not cache
    skipped: AtomicU64,
}

impl CacheStats {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_negative_hit(&self) {
        self.negative_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale(&self) {
        self.stale.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn negative_hits(&self) -> u64 {
        self.negative_hits.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn stale(&self) -> u64 {
        self.stale.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn inserts(&self) -> u64 {
        self.inserts.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Create a snapshot of all statistics
    #[must_use]
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits(),
            negative_hits: self.negative_hits(),
            misses: self.misses(),
            stale: self.stale(),
            inserts: self.inserts(),
            evictions: self.evictions(),
            skipped: self.skipped(),
        }
    }
}

/// Snapshot of cache statistics
///
/// This is a plain struct (not atomic) for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub negative_hits: u64,
    pub misses: u64,
    pub stale: u64,
    pub inserts: u64,
    pub evictions: u64,
    pub skipped: u64,
}

impl CacheStatsSnapshot {
    /// Hit rate as a percentage, counting negative hits as hits
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits + self.negative_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }
}
