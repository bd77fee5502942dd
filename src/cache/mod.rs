//! Resolution Cache Module
//!
//! This module provides the bounded hostname → address cache that sits in
//! front of the name system:
//!
//! - **LRU Eviction**: access-ordered; when a put leaves the cache one over
//!   capacity, the least recently accessed entry is dropped
//! - **TTL Management**: per-record absolute expiry from [`TtlPolicy`]
//! - **Negative Caching**: an empty address list records a failed lookup
//! - **Lazy Expiry**: stale records are ignored by `get`, never swept; the
//!   next `put` for the name replaces them
//! - **Statistics**: atomic counters for cache metrics
//!
//! # Architecture
//!
//! ```text
//! resolve(host) → ResolutionCache::get()
//!                   │
//!                   ├── Some(addrs)  → return addrs
//!                   ├── Some([])     → UnknownHost, no re-query
//!                   └── None         → name system → ResolutionCache::put()
//! ```
//!
//! All map access happens under one mutex. The TTL policy, which may read
//! external configuration, is evaluated before the mutex is taken.
//!
//! # Example
//!
//! ```
//! use rust_inet::addr::IpAddress;
//! use rust_inet::cache::ResolutionCache;
//! use rust_inet::config::CacheConfig;
//!
//! let cache = ResolutionCache::new(&CacheConfig::default());
//! assert_eq!(cache.get("example.org"), None);
//!
//! cache.put("example.org", vec![IpAddress::from_bytes(&[93, 184, 216, 34]).unwrap()]);
//! assert_eq!(cache.get("example.org").map(|a| a.len()), Some(1));
//!
//! cache.put_unknown_host("nonexistent.invalid");
//! assert_eq!(cache.get("nonexistent.invalid"), Some(Vec::new()));
//! ```

mod clock;
mod entry;
mod policy;
mod stats;

use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::trace;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{AddressRecord, Expiry};
pub use policy::{CacheTtl, TtlPolicy};
pub use stats::{CacheStats, CacheStatsSnapshot};

use crate::addr::IpAddress;
use crate::config::{CacheConfig, PropertySource};

/// Bounded, TTL-aware hostname cache
pub struct ResolutionCache {
    entries: Mutex<LruCache<String, AddressRecord>>,
    capacity: usize,
    enabled: bool,
    policy: TtlPolicy,
    clock: Arc<dyn Clock>,
    stats: CacheStats,
}

impl ResolutionCache {
    /// Create a cache with the configured capacity and default TTLs
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: Mutex::new(LruCache::unbounded()),
            capacity: config.max_entries.max(1),
            enabled: config.enabled,
            policy: TtlPolicy::from_config(config),
            clock: Arc::new(SystemClock),
            stats: CacheStats::default(),
        }
    }

    /// Consult `source` for TTL overrides
    #[must_use]
    pub fn with_property_source(mut self, source: Arc<dyn PropertySource>) -> Self {
        self.policy = self.policy.with_source(source);
        self
    }

    /// Use a different time source
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn key(host: &str) -> String {
        host.to_ascii_lowercase()
    }

    /// Look up a hostname
    ///
    /// Returns `None` when absent or stale, `Some(empty)` for a live negative
    /// record, and the addresses otherwise. A hit refreshes the entry's LRU
    /// position.
    pub fn get(&self, host: &str) -> Option<Vec<IpAddress>> {
        let key = Self::key(host);
        let now = self.clock.now();

        let mut entries = self.entries.lock();
        match entries.get(&key) {
            None => {
                self.stats.record_miss();
                None
            }
            Some(record) if record.is_expired(now) => {
                self.stats.record_stale();
                self.stats.record_miss();
                trace!("Stale cache entry for {}", key);
                None
            }
            Some(record) => {
                if record.is_negative() {
                    self.stats.record_negative_hit();
                } else {
                    self.stats.record_hit();
                }
                Some(record.addresses().to_vec())
            }
        }
    }

    /// Insert or replace the record for a hostname
    ///
    /// An empty address list inserts a negative record. When the TTL policy
    /// says "do not cache" nothing is inserted. At most one entry is evicted.
    pub fn put(&self, host: &str, addresses: Vec<IpAddress>) {
        if !self.enabled {
            return;
        }

        let ttl = if addresses.is_empty() {
            self.policy.negative()
        } else {
            self.policy.positive()
        };
        let Some(expiry) = ttl.expiry_from(self.clock.now()) else {
            self.stats.record_skipped();
            trace!("TTL policy skips caching {}", host);
            return;
        };

        let key = Self::key(host);
        let record = AddressRecord::new(addresses, expiry);

        let evicted = {
            let mut entries = self.entries.lock();
            entries.put(key, record);
            if entries.len() > self.capacity {
                entries.pop_lru()
            } else {
                None
            }
        };

        self.stats.record_insert();
        if let Some((evicted_host, _)) = evicted {
            self.stats.record_eviction();
            trace!("Evicted {} from resolution cache", evicted_host);
        }
    }

    /// Record that a hostname does not resolve
    pub fn put_unknown_host(&self, host: &str) {
        self.put(host, Vec::new());
    }

    /// Remove the record for a hostname
    pub fn remove(&self, host: &str) -> Option<AddressRecord> {
        self.entries.lock().pop(&Self::key(host))
    }

    /// Drop all records
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of records held, stale ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

impl std::fmt::Debug for ResolutionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StaticProperties, CACHE_TTL_PROPERTY, NEGATIVE_CACHE_TTL_PROPERTY};
    use std::time::Duration;

    fn addr(last: u8) -> IpAddress {
        IpAddress::from_bytes(&[192, 0, 2, last]).unwrap()
    }

    fn cache_with_clock(config: &CacheConfig) -> (ResolutionCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = ResolutionCache::new(config).with_clock(clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_put_then_get() {
        let (cache, _) = cache_with_clock(&CacheConfig::default());
        cache.put("example.org", vec![addr(1), addr(2)]);
        assert_eq!(cache.get("example.org"), Some(vec![addr(1), addr(2)]));
        assert_eq!(cache.stats().hits(), 1);
    }

    #[test]
    fn test_get_is_case_insensitive() {
        let (cache, _) = cache_with_clock(&CacheConfig::default());
        cache.put("Example.ORG", vec![addr(1)]);
        assert_eq!(cache.get("example.org"), Some(vec![addr(1)]));
    }

    #[test]
    fn test_positive_expiry() {
        let (cache, clock) = cache_with_clock(&CacheConfig::default());
        cache.put("example.org", vec![addr(1)]);

        clock.advance(Duration::from_secs(599));
        assert!(cache.get("example.org").is_some());

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get("example.org"), None);
        // Lazy expiry: the stale record is still held.
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().stale(), 1);
    }

    #[test]
    fn test_negative_entry_distinct_from_miss() {
        let (cache, clock) = cache_with_clock(&CacheConfig::default());
        cache.put_unknown_host("nonexistent.invalid");

        assert_eq!(cache.get("nonexistent.invalid"), Some(Vec::new()));
        assert_eq!(cache.get("never-inserted.invalid"), None);
        assert_eq!(cache.stats().negative_hits(), 1);

        clock.advance(Duration::from_secs(10));
        assert_eq!(cache.get("nonexistent.invalid"), None);
    }

    #[test]
    fn test_stale_entry_replaced_by_put() {
        let (cache, clock) = cache_with_clock(&CacheConfig::default());
        cache.put_unknown_host("flaky.example");
        clock.advance(Duration::from_secs(11));
        cache.put("flaky.example", vec![addr(7)]);
        assert_eq!(cache.get("flaky.example"), Some(vec![addr(7)]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lru_eviction_at_capacity() {
        let (cache, _) = cache_with_clock(&CacheConfig::default());
        for i in 0..512 {
            cache.put(&format!("host{i}.example"), vec![addr(1)]);
        }
        // Touch host0 so host1 becomes the least recently used.
        assert!(cache.get("host0.example").is_some());

        cache.put("host512.example", vec![addr(1)]);

        assert_eq!(cache.len(), 512);
        assert_eq!(cache.get("host1.example"), None);
        assert!(cache.get("host0.example").is_some());
        for i in 2..=512 {
            assert!(cache.get(&format!("host{i}.example")).is_some(), "host{i} missing");
        }
        assert_eq!(cache.stats().evictions(), 1);
    }

    #[test]
    fn test_replacing_does_not_evict() {
        let config = CacheConfig::default().with_max_entries(2);
        let (cache, _) = cache_with_clock(&config);
        cache.put("a", vec![addr(1)]);
        cache.put("b", vec![addr(2)]);
        cache.put("a", vec![addr(3)]);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions(), 0);
        assert_eq!(cache.get("a"), Some(vec![addr(3)]));
    }

    #[test]
    fn test_override_zero_skips_insert() {
        let props = Arc::new(StaticProperties::new());
        props.set(CACHE_TTL_PROPERTY, "0");
        let (cache, _) = cache_with_clock(&CacheConfig::default());
        let cache = cache.with_property_source(props);

        cache.put("example.org", vec![addr(1)]);
        assert_eq!(cache.get("example.org"), None);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().skipped(), 1);
    }

    #[test]
    fn test_override_forever() {
        let props = Arc::new(StaticProperties::new());
        props.set(CACHE_TTL_PROPERTY, "-1");
        props.set(NEGATIVE_CACHE_TTL_PROPERTY, "-1");
        let clock = Arc::new(ManualClock::new());
        let cache = ResolutionCache::new(&CacheConfig::default())
            .with_clock(clock.clone())
            .with_property_source(props);

        cache.put("example.org", vec![addr(1)]);
        cache.put_unknown_host("nonexistent.invalid");
        clock.advance(Duration::from_secs(50 * 365 * 24 * 3600));

        assert_eq!(cache.get("example.org"), Some(vec![addr(1)]));
        assert_eq!(cache.get("nonexistent.invalid"), Some(Vec::new()));
    }

    #[test]
    fn test_malformed_override_uses_default() {
        let props = Arc::new(StaticProperties::new());
        props.set(CACHE_TTL_PROPERTY, "forever-ish");
        let clock = Arc::new(ManualClock::new());
        let cache = ResolutionCache::new(&CacheConfig::default())
            .with_clock(clock.clone())
            .with_property_source(props);

        cache.put("example.org", vec![addr(1)]);
        clock.advance(Duration::from_secs(599));
        assert!(cache.get("example.org").is_some());
        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get("example.org"), None);
    }

    #[test]
    fn test_disabled_cache_never_stores() {
        let cache = ResolutionCache::new(&CacheConfig::default().disabled());
        cache.put("example.org", vec![addr(1)]);
        assert!(cache.is_empty());
        assert!(!cache.is_enabled());
    }

    #[test]
    fn test_remove_and_clear() {
        let (cache, _) = cache_with_clock(&CacheConfig::default());
        cache.put("a.example", vec![addr(1)]);
        cache.put("b.example", vec![addr(2)]);
        assert!(cache.remove("A.example").is_some());
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(ResolutionCache::new(&CacheConfig::default().with_max_entries(64)));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let host = format!("h{}.example", (t * 200 + i) % 100);
                        cache.put(&host, vec![addr(t as u8)]);
                        if let Some(addrs) = cache.get(&host) {
                            assert_eq!(addrs.len(), 1);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.len() <= 64);
    }
}
