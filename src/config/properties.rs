//! String-keyed property lookup
//!
//! A [`PropertySource`] answers `get(key) -> Option<String>`. The cache TTL
//! policy is its only consumer today; it is consulted for the keys below.
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `inet.cache.ttl` | TTL override for successful lookups |
//! | `inet.cache.negative.ttl` | TTL override for failed lookups |
//!
//! # Example
//!
//! ```
//! use rust_inet::config::{PropertySource, StaticProperties, CACHE_TTL_PROPERTY};
//!
//! let props = StaticProperties::new();
//! assert_eq!(props.get(CACHE_TTL_PROPERTY), None);
//!
//! props.set(CACHE_TTL_PROPERTY, "-1");
//! assert_eq!(props.get(CACHE_TTL_PROPERTY).as_deref(), Some("-1"));
//! ```

use std::collections::HashMap;
use std::fmt::Debug;

use parking_lot::RwLock;

/// Property key for the positive cache TTL override
pub const CACHE_TTL_PROPERTY: &str = "inet.cache.ttl";

/// Property key for the negative cache TTL override
pub const NEGATIVE_CACHE_TTL_PROPERTY: &str = "inet.cache.negative.ttl";

/// External configuration lookup
pub trait PropertySource: Send + Sync + Debug {
    /// Look up a property by key
    fn get(&self, key: &str) -> Option<String>;
}

impl PropertySource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// In-memory property set that can be changed at runtime
#[derive(Debug, Default)]
pub struct StaticProperties {
    values: RwLock<HashMap<String, String>>,
}

impl StaticProperties {
    /// Create an empty property set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a property set from existing values
    #[must_use]
    pub fn from_map(values: HashMap<String, String>) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }

    /// Set a property
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(key.into(), value.into());
    }

    /// Remove a property
    pub fn remove(&self, key: &str) -> Option<String> {
        self.values.write().remove(key)
    }
}

impl PropertySource for StaticProperties {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }
}

/// Properties read from the process environment
///
/// The key is upper-cased and `.` becomes `_`, so `inet.cache.ttl` is read
/// from `INET_CACHE_TTL`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvProperties;

impl EnvProperties {
    /// Environment variable name for a property key
    #[must_use]
    pub fn var_name(key: &str) -> String {
        key.to_ascii_uppercase().replace('.', "_")
    }
}

impl PropertySource for EnvProperties {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(Self::var_name(key)).ok()
    }
}
