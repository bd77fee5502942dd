//! Configuration module for rust-inet
//!
//! This module provides configuration types, loading utilities, and the
//! string-keyed [`PropertySource`] used for cache TTL overrides.
//!
//! # Example
//!
//! ```no_run
//! use rust_inet::config::load_config;
//!
//! let config = load_config("/etc/rust-inet/config.json").unwrap();
//! println!("Cache capacity: {}", config.cache.max_entries);
//! ```

mod loader;
mod properties;
mod types;

pub use loader::{
    apply_env_overrides, create_default_config, load_config, load_config_str,
    load_config_with_env,
};
pub use properties::{
    EnvProperties, PropertySource, StaticProperties, CACHE_TTL_PROPERTY,
    NEGATIVE_CACHE_TTL_PROPERTY,
};
pub use types::{
    CacheConfig, Config, LogConfig, ProbeConfig, ResolverConfig, DEFAULT_CACHE_MAX_ENTRIES,
    DEFAULT_NEGATIVE_TTL_SECS, DEFAULT_POSITIVE_TTL_SECS, DEFAULT_PROBE_PORT,
};
