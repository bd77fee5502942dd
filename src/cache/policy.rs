//! Cache TTL policy
//!
//! Positive and negative results have separate TTLs. Each has a default from
//! [`CacheConfig`] and may be overridden through a [`PropertySource`]:
//!
//! | Override | Meaning |
//! |----------|---------|
//! | `-1` (any negative) | cache forever |
//! | `0` | do not cache |
//! | `N > 0` | cache for N seconds |
//! | anything else | ignored, default applies |
//!
//! With no property source configured the defaults are returned without
//! any lookup.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use super::entry::Expiry;
use crate::config::{CacheConfig, PropertySource, CACHE_TTL_PROPERTY, NEGATIVE_CACHE_TTL_PROPERTY};

/// How long a record may be cached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTtl {
    /// Do not insert the record
    DoNotCache,
    /// Never expire
    Forever,
    /// Expire after this many seconds
    Seconds(u64),
}

impl CacheTtl {
    /// Interpret a TTL given in seconds (0 means do not cache)
    #[must_use]
    pub fn from_secs(secs: u64) -> Self {
        if secs == 0 {
            Self::DoNotCache
        } else {
            Self::Seconds(secs)
        }
    }

    /// Parse an override string; `None` if malformed
    ///
    /// # Example
    ///
    /// ```
    /// use rust_inet::cache::CacheTtl;
    ///
    /// assert_eq!(CacheTtl::parse("-1"), Some(CacheTtl::Forever));
    /// assert_eq!(CacheTtl::parse("0"), Some(CacheTtl::DoNotCache));
    /// assert_eq!(CacheTtl::parse(" 30 "), Some(CacheTtl::Seconds(30)));
    /// assert_eq!(CacheTtl::parse("soon"), None);
    /// ```
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let secs: i64 = value.trim().parse().ok()?;
        Some(match secs {
            s if s < 0 => Self::Forever,
            0 => Self::DoNotCache,
            s => Self::Seconds(s.unsigned_abs()),
        })
    }

    /// Absolute expiry for a record inserted at `now`; `None` means do not cache
    #[must_use]
    pub fn expiry_from(self, now: Instant) -> Option<Expiry> {
        match self {
            Self::DoNotCache => None,
            Self::Forever => Some(Expiry::Never),
            Self::Seconds(secs) => Some(
                now.checked_add(Duration::from_secs(secs))
                    .map_or(Expiry::Never, Expiry::At),
            ),
        }
    }
}

/// TTL policy for positive and negative records
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    positive: CacheTtl,
    negative: CacheTtl,
    source: Option<Arc<dyn PropertySource>>,
}

impl TtlPolicy {
    /// Policy with the configured defaults and no override source
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            positive: CacheTtl::from_secs(config.positive_ttl_secs),
            negative: CacheTtl::from_secs(config.negative_ttl_secs),
            source: None,
        }
    }

    /// Consult `source` for overrides on every lookup
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn PropertySource>) -> Self {
        self.source = Some(source);
        self
    }

    /// TTL for a successful lookup
    #[must_use]
    pub fn positive(&self) -> CacheTtl {
        self.lookup(CACHE_TTL_PROPERTY, self.positive)
    }

    /// TTL for a failed lookup
    #[must_use]
    pub fn negative(&self) -> CacheTtl {
        self.lookup(NEGATIVE_CACHE_TTL_PROPERTY, self.negative)
    }

    fn lookup(&self, key: &str, default: CacheTtl) -> CacheTtl {
        let Some(source) = &self.source else {
            return default;
        };
        match source.get(key) {
            None => default,
            Some(value) => CacheTtl::parse(&value).unwrap_or_else(|| {
                debug!("Ignoring malformed {} override {:?}", key, value);
                default
            }),
        }
    }
}
