//! Configuration types for rust-inet

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default resolution cache capacity
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 512;

/// Default TTL for positive resolution results (seconds)
pub const DEFAULT_POSITIVE_TTL_SECS: u64 = 600;

/// Default TTL for negative resolution results (seconds)
pub const DEFAULT_NEGATIVE_TTL_SECS: u64 = 10;

/// Echo port used by reachability probes
pub const DEFAULT_PROBE_PORT: u16 = 7;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Resolution cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Resolver behavior
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Reachability probe configuration
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,

    /// String-valued property overrides (e.g. `inet.cache.ttl`)
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl Config {
    /// Create the default configuration
    #[must_use]
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` on the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        self.probe.validate()?;
        self.log.validate()?;
        Ok(())
    }
}

/// Resolution cache configuration
///
/// # Example
///
/// ```
/// use rust_inet::config::CacheConfig;
///
/// let config = CacheConfig::default();
/// assert_eq!(config.max_entries, 512);
/// assert_eq!(config.positive_ttl_secs, 600);
/// assert_eq!(config.negative_ttl_secs, 10);
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Whether caching is enabled at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum number of hostnames retained
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Default TTL for successful lookups
    #[serde(default = "default_positive_ttl")]
    pub positive_ttl_secs: u64,

    /// Default TTL for failed lookups
    #[serde(default = "default_negative_ttl")]
    pub negative_ttl_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_max_entries() -> usize {
    DEFAULT_CACHE_MAX_ENTRIES
}

fn default_positive_ttl() -> u64 {
    DEFAULT_POSITIVE_TTL_SECS
}

fn default_negative_ttl() -> u64 {
    DEFAULT_NEGATIVE_TTL_SECS
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            positive_ttl_secs: DEFAULT_POSITIVE_TTL_SECS,
            negative_ttl_secs: DEFAULT_NEGATIVE_TTL_SECS,
        }
    }
}

impl CacheConfig {
    /// Set the maximum number of entries
    #[must_use]
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Set the default positive TTL
    #[must_use]
    pub fn with_positive_ttl(mut self, secs: u64) -> Self {
        self.positive_ttl_secs = secs;
        self
    }

    /// Set the default negative TTL
    #[must_use]
    pub fn with_negative_ttl(mut self, secs: u64) -> Self {
        self.negative_ttl_secs = secs;
        self
    }

    /// Disable caching
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Validate the cache configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `max_entries` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entries == 0 {
            return Err(ConfigError::validation(
                "cache.max_entries must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Resolver behavior
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Order IPv6 results before IPv4 results
    #[serde(default)]
    pub prefer_ipv6: bool,
}

/// Reachability probe configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeConfig {
    /// Destination port for TCP probes
    #[serde(default = "default_probe_port")]
    pub port: u16,

    /// Timeout used by the CLI when none is given
    #[serde(default = "default_probe_timeout")]
    pub default_timeout_ms: u64,
}

fn default_probe_port() -> u16 {
    DEFAULT_PROBE_PORT
}

fn default_probe_timeout() -> u64 {
    5000
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PROBE_PORT,
            default_timeout_ms: default_probe_timeout(),
        }
    }
}

impl ProbeConfig {
    /// Validate the probe configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the port is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::validation("probe.port must not be 0"));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Include target (module path)
    #[serde(default)]
    pub target: bool,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            target: false,
        }
    }
}

impl LogConfig {
    /// Validate the logging configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` for an unknown format.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.format.as_str() {
            "text" | "json" => Ok(()),
            other => Err(ConfigError::validation(format!(
                "log.format must be \"text\" or \"json\", got \"{other}\""
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default_config();
        assert!(config.validate().is_ok());
        assert!(config.cache.enabled);
        assert!(!config.resolver.prefer_ipv6);
        assert_eq!(config.probe.port, 7);
    }

    #[test]
    fn test_zero_max_entries_rejected() {
        let mut config = Config::default();
        config.cache = CacheConfig::default().with_max_entries(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let mut config = Config::default();
        config.log.format = "xml".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{ "cache": { "max_entries": 64 } }"#).unwrap();
        assert_eq!(config.cache.max_entries, 64);
        assert_eq!(config.cache.positive_ttl_secs, DEFAULT_POSITIVE_TTL_SECS);
        assert_eq!(config.log.level, "info");
        assert!(config.properties.is_empty());
    }
}
