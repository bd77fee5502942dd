//! Configuration file loading and property overrides

use std::io::Write;
use std::sync::Arc;

use tempfile::NamedTempFile;

use rust_inet::config::{load_config, load_config_str, StaticProperties, CACHE_TTL_PROPERTY};
use rust_inet::resolver::MockNameSystem;
use rust_inet::socket::MockIoProvider;
use rust_inet::InetContextBuilder;

use super::Harness;

#[test]
fn test_partial_file_keeps_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"cache": {{"max_entries": 2}}, "resolver": {{"prefer_ipv6": true}}}}"#
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.cache.max_entries, 2);
    assert_eq!(config.cache.positive_ttl_secs, 600);
    assert!(config.resolver.prefer_ipv6);
    assert_eq!(config.probe.port, 7);
}

#[test]
fn test_invalid_values_rejected() {
    assert!(load_config_str(r#"{"cache": {"max_entries": 0}}"#).is_err());
    assert!(load_config_str(r#"{"probe": {"port": 0}}"#).is_err());
    assert!(load_config_str(r#"{"log": {"format": "xml"}}"#).is_err());
    assert!(load_config_str("{not json").is_err());
}

#[tokio::test]
async fn test_capacity_from_file_bounds_cache() {
    let config = load_config_str(r#"{"cache": {"max_entries": 2}}"#).unwrap();
    let harness = Harness::new(config);
    for (host, ip) in [("a.test", "192.0.2.1"), ("b.test", "192.0.2.2"), ("c.test", "192.0.2.3")] {
        harness.names.insert(host, &[ip]);
    }

    let resolver = harness.context.resolver();
    resolver.resolve_all("a.test").await.unwrap();
    resolver.resolve_all("b.test").await.unwrap();
    resolver.resolve_all("c.test").await.unwrap();
    assert_eq!(harness.context.cache().len(), 2);

    // "a.test" was least recently used and is looked up again
    resolver.resolve_all("a.test").await.unwrap();
    assert_eq!(harness.names.lookup_calls(), 4);
}

#[tokio::test]
async fn test_runtime_property_change() {
    let names = Arc::new(MockNameSystem::new());
    names.insert("live.test", &["192.0.2.10"]);
    let properties = Arc::new(StaticProperties::new());

    let mut builder = InetContextBuilder::new(load_config_str("{}").unwrap());
    builder
        .name_system(names.clone())
        .io_provider(Arc::new(MockIoProvider::new()))
        .properties(properties.clone());
    let context = builder.build().unwrap();
    let resolver = context.resolver();

    properties.set(CACHE_TTL_PROPERTY, "0");
    resolver.resolve_all("live.test").await.unwrap();
    assert!(context.cache().is_empty());

    properties.remove(CACHE_TTL_PROPERTY);
    resolver.resolve_all("live.test").await.unwrap();
    resolver.resolve_all("live.test").await.unwrap();
    assert_eq!(names.lookup_calls(), 2);
    assert_eq!(context.cache().len(), 1);
}
