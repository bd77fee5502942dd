//! Resolver and cache behavior through the context

use rust_inet::addr::{NetworkInterface, StaticInterfaces};
use rust_inet::config::Config;
use rust_inet::IpAddress;

use super::Harness;

fn ip(s: &str) -> IpAddress {
    s.parse().unwrap()
}

#[tokio::test]
async fn test_concurrent_resolvers_share_results() {
    let harness = Harness::new(Config::default());
    harness.names.insert("shared.test", &["192.0.2.1", "2001:db8::1"]);
    harness.context.resolver().resolve_all("shared.test").await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let resolver = harness.context.resolver();
        tasks.push(tokio::spawn(async move {
            resolver.resolve_all("SHARED.test").await.unwrap()
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), vec![ip("192.0.2.1"), ip("2001:db8::1")]);
    }
    assert_eq!(harness.names.lookup_calls(), 1);
    assert_eq!(harness.context.cache().stats().snapshot().hits, 8);
}

#[tokio::test]
async fn test_results_carry_queried_name() {
    let harness = Harness::new(Config::default());
    harness.names.insert("named.test", &["192.0.2.5"]);
    let resolver = harness.context.resolver();

    let addr = resolver.resolve_one("named.test").await.unwrap();
    assert_eq!(addr.host_name(), Some("named.test"));
    assert_eq!(resolver.host_name(&addr).await, "named.test");
    assert_eq!(harness.names.reverse_calls(), 0);
}

#[tokio::test]
async fn test_unknown_host_is_negative_cached() {
    let harness = Harness::new(Config::default());
    let resolver = harness.context.resolver();

    for _ in 0..3 {
        let err = resolver.resolve_all("missing.test").await.unwrap_err();
        assert!(err.is_unknown_host());
    }
    assert_eq!(harness.names.lookup_calls(), 1);
    assert_eq!(harness.context.cache().stats().snapshot().negative_hits, 2);
}

#[tokio::test]
async fn test_literals_never_touch_cache() {
    let harness = Harness::new(Config::default());
    let resolver = harness.context.resolver();

    assert_eq!(resolver.resolve_all("10.1").await.unwrap(), vec![ip("10.0.0.1")]);
    assert_eq!(resolver.resolve_all("[::1]").await.unwrap(), vec![ip("::1")]);
    assert!(resolver.resolve_all("[::1").await.unwrap_err().is_unknown_host());
    assert!(harness.context.cache().is_empty());
    assert_eq!(harness.names.lookup_calls(), 0);
}

#[tokio::test]
async fn test_scope_name_resolved_through_interfaces() {
    let interfaces = StaticInterfaces::new(vec![NetworkInterface::new(
        "wlan0",
        7,
        vec![ip("fe80::7")],
    )]);
    let harness = Harness::with_interfaces(Config::default(), interfaces);
    let resolver = harness.context.resolver();

    let addr = resolver.resolve_one("fe80::1%wlan0").await.unwrap();
    assert_eq!(addr.scope_id(), Some(7));
    assert!(resolver
        .resolve_all("fe80::1%eth9")
        .await
        .unwrap_err()
        .is_unknown_host());
}

#[tokio::test]
async fn test_prefer_ipv6_orders_results() {
    let mut config = Config::default();
    config.resolver.prefer_ipv6 = true;
    let harness = Harness::new(config);
    harness.names.insert("dual.test", &["192.0.2.1", "2001:db8::1", "192.0.2.2"]);

    let addresses = harness.context.resolver().resolve_all("dual.test").await.unwrap();
    assert_eq!(
        addresses,
        vec![ip("2001:db8::1"), ip("192.0.2.1"), ip("192.0.2.2")]
    );
}

#[tokio::test]
async fn test_reverse_lookup_requires_forward_match() {
    let harness = Harness::new(Config::default());
    let resolver = harness.context.resolver();
    let honest = ip("192.0.2.20");
    let spoofed = ip("192.0.2.21");
    harness.names.insert("honest.test", &["192.0.2.20"]);
    harness.names.insert_reverse(&honest, "honest.test");
    harness.names.insert("bank.test", &["198.51.100.1"]);
    harness.names.insert_reverse(&spoofed, "bank.test");

    assert_eq!(resolver.host_name(&honest).await, "honest.test");
    assert_eq!(resolver.host_name(&spoofed).await, "192.0.2.21");
}

#[tokio::test]
async fn test_local_host_fallback() {
    let harness = Harness::new(Config::default());
    let resolver = harness.context.resolver();
    assert_eq!(resolver.local_host().await, IpAddress::loopback_v4());

    harness.names.set_local_host_name("box.test");
    harness.names.insert("box.test", &["192.0.2.99"]);
    assert_eq!(resolver.local_host().await, ip("192.0.2.99"));
}

#[tokio::test]
async fn test_empty_host_is_loopback() {
    let harness = Harness::new(Config::default());
    let addresses = harness.context.resolver().resolve_all("").await.unwrap();
    assert_eq!(addresses, vec![IpAddress::loopback_v4(), IpAddress::loopback_v6()]);
    assert_eq!(harness.names.lookup_calls(), 0);
}
