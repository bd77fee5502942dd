//! Configuration loading and management
//!
//! This module handles loading configuration from files and environment variables.

use std::path::Path;

use tracing::{debug, info};

use super::types::Config;
use crate::error::ConfigError;

/// Load configuration from a JSON file
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed or validated.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    debug!("Loading configuration from {:?}", path);

    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let contents = std::fs::read_to_string(path)?;

    let config: Config = serde_json::from_str(&contents).map_err(|e| {
        ConfigError::ParseError(format!("Failed to parse JSON: {e} at {path:?}"))
    })?;

    config.validate()?;

    info!(
        "Configuration loaded: cache max_entries={}, prefer_ipv6={}, {} properties",
        config.cache.max_entries,
        config.resolver.prefer_ipv6,
        config.properties.len()
    );

    Ok(config)
}

/// Load configuration from a JSON string
///
/// # Errors
///
/// Returns `ConfigError` if parsing or validation fails.
pub fn load_config_str(json: &str) -> Result<Config, ConfigError> {
    let config: Config =
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.validate()?;

    Ok(config)
}

/// Apply environment variable overrides to a configuration
///
/// Environment variables:
/// - `RUST_INET_LOG_LEVEL`: Override log level
/// - `RUST_INET_CACHE_MAX_ENTRIES`: Override cache capacity
/// - `RUST_INET_PREFER_IPV6`: Override address family preference (`true`/`false`)
///
/// # Errors
///
/// Returns `ConfigError` if an override is malformed or the result is invalid.
pub fn apply_env_overrides(mut config: Config) -> Result<Config, ConfigError> {
    if let Ok(level) = std::env::var("RUST_INET_LOG_LEVEL") {
        config.log.level = level;
        debug!("Log level overridden to {}", config.log.level);
    }

    if let Ok(max) = std::env::var("RUST_INET_CACHE_MAX_ENTRIES") {
        config.cache.max_entries = max.parse().map_err(|_| ConfigError::EnvError {
            name: "RUST_INET_CACHE_MAX_ENTRIES".into(),
            reason: format!("Invalid number: {max}"),
        })?;
        debug!("Cache max entries overridden to {}", config.cache.max_entries);
    }

    if let Ok(prefer) = std::env::var("RUST_INET_PREFER_IPV6") {
        config.resolver.prefer_ipv6 = prefer.parse().map_err(|_| ConfigError::EnvError {
            name: "RUST_INET_PREFER_IPV6".into(),
            reason: format!("Invalid boolean: {prefer}"),
        })?;
        debug!("IPv6 preference overridden to {}", config.resolver.prefer_ipv6);
    }

    config.validate()?;

    Ok(config)
}

/// Load configuration with environment variable overrides
///
/// # Errors
///
/// Returns `ConfigError` if loading, parsing or an override fails.
pub fn load_config_with_env(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    apply_env_overrides(load_config(path)?)
}

/// Create a default configuration file at the given path
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be written.
pub fn create_default_config(path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let config = Config::default_config();
    let json = serde_json::to_string_pretty(&config)
        .map_err(|e| ConfigError::ParseError(format!("Failed to serialize config: {e}")))?;

    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        let config = Config::default_config();
        let json = serde_json::to_string_pretty(&config).unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_config() {
        let file = create_temp_config();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.cache.max_entries, 512);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config("/nonexistent/path/config.json");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_load_config_str() {
        let json = r#"{
            "cache": { "max_entries": 1024, "negative_ttl_secs": 30 },
            "resolver": { "prefer_ipv6": true },
            "properties": { "inet.cache.ttl": "-1" }
        }"#;
        let config = load_config_str(json).unwrap();
        assert_eq!(config.cache.max_entries, 1024);
        assert_eq!(config.cache.negative_ttl_secs, 30);
        assert!(config.resolver.prefer_ipv6);
        assert_eq!(config.properties.get("inet.cache.ttl").map(String::as_str), Some("-1"));
    }

    #[test]
    fn test_load_config_invalid_json() {
        let result = load_config_str("not valid json");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_fails_validation() {
        let result = load_config_str(r#"{ "probe": { "port": 0 } }"#);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_create_default_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        create_default_config(&path).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.log.format, "text");
    }
}
