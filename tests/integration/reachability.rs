//! Reachability probes through the context's prober

use std::time::{Duration, Instant};

use rust_inet::addr::{InterfaceEnumerator, NetworkInterface, StaticInterfaces};
use rust_inet::config::Config;
use rust_inet::socket::ConnectOutcome;
use rust_inet::{InetError, IpAddress};

use super::Harness;

fn ip(s: &str) -> IpAddress {
    s.parse().unwrap()
}

fn host_interfaces() -> StaticInterfaces {
    StaticInterfaces::new(vec![
        NetworkInterface::new("lo", 1, vec![IpAddress::loopback_v4()]),
        NetworkInterface::new("eth0", 2, vec![ip("10.0.0.2"), ip("10.0.1.2")]),
    ])
}

#[tokio::test]
async fn test_own_addresses_need_no_probe() {
    let harness = Harness::with_interfaces(Config::default(), host_interfaces());
    let prober = harness.context.prober();

    assert!(prober.is_reachable(&ip("10.0.1.2"), 100).await.unwrap());
    assert!(prober.is_reachable(&ip("127.0.0.1"), 100).await.unwrap());
    assert_eq!(harness.io.connect_attempts(), 0);

    // Not carried by any interface, so it takes one real attempt
    harness.io.set_default_outcome(ConnectOutcome::Unreachable);
    assert!(!prober.is_reachable(&ip("127.0.0.5"), 100).await.unwrap());
    assert_eq!(harness.io.connect_attempts(), 1);
}

#[tokio::test]
async fn test_configured_port_used() {
    let mut config = Config::default();
    config.probe.port = 2222;
    let harness = Harness::with_interfaces(config, host_interfaces());
    harness.io.set_default_outcome(ConnectOutcome::Refuse);

    assert!(harness
        .context
        .prober()
        .is_reachable(&ip("192.0.2.1"), 500)
        .await
        .unwrap());
    let attempts = harness.io.attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].target.port(), 2222);
    assert_eq!(attempts[0].timeout, Some(Duration::from_millis(500)));
}

#[tokio::test]
async fn test_unreachable_and_timed_out() {
    let harness = Harness::with_interfaces(Config::default(), host_interfaces());
    harness
        .io
        .set_outcome(ip("192.0.2.2"), ConnectOutcome::Unreachable);
    harness.io.set_outcome(ip("192.0.2.3"), ConnectOutcome::TimeOut);
    let prober = harness.context.prober();

    assert!(!prober.is_reachable(&ip("192.0.2.2"), 100).await.unwrap());
    assert!(!prober.is_reachable(&ip("192.0.2.3"), 100).await.unwrap());
    // Every probe socket is released
    assert_eq!(harness.io.closed_count(), 2);
}

#[tokio::test]
async fn test_interface_probe_from_each_source() {
    let interfaces = host_interfaces();
    let eth0 = interfaces.by_name("eth0").unwrap().unwrap();
    let harness = Harness::with_interfaces(Config::default(), interfaces);
    harness.io.set_default_outcome(ConnectOutcome::TimeOut);

    let reachable = harness
        .context
        .prober()
        .is_reachable_via(Some(eth0.as_ref()), &ip("192.0.2.9"), 8, 200)
        .await
        .unwrap();
    assert!(!reachable);

    let mut sources: Vec<IpAddress> = harness
        .io
        .attempts()
        .into_iter()
        .map(|a| {
            assert_eq!(a.ttl, Some(8));
            a.source.unwrap().ip().clone()
        })
        .collect();
    sources.sort_by_key(IpAddress::to_bytes);
    assert_eq!(sources, vec![ip("10.0.0.2"), ip("10.0.1.2")]);
}

#[tokio::test]
async fn test_slow_probes_bounded_by_timeout() {
    let interfaces = host_interfaces();
    let eth0 = interfaces.by_name("eth0").unwrap().unwrap();
    let harness = Harness::with_interfaces(Config::default(), interfaces);
    harness.io.set_connect_delay(3000);

    let started = Instant::now();
    let reachable = harness
        .context
        .prober()
        .is_reachable_via(Some(eth0.as_ref()), &ip("192.0.2.9"), 0, 200)
        .await
        .unwrap();
    assert!(!reachable);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_argument_validation() {
    let harness = Harness::with_interfaces(Config::default(), host_interfaces());
    let prober = harness.context.prober();

    assert!(matches!(
        prober.is_reachable(&ip("192.0.2.1"), -1).await,
        Err(InetError::InvalidArgument(_))
    ));
    assert!(matches!(
        prober.is_reachable_via(None, &ip("192.0.2.1"), -1, 100).await,
        Err(InetError::InvalidArgument(_))
    ));
    assert_eq!(harness.io.connect_attempts(), 0);
}
