//! Reachability probing
//!
//! A host counts as reachable when a TCP connect to its echo port (7 by
//! default) either succeeds or is refused: a refusal means the host itself
//! answered. Any other failure (timeout, unreachable network) means "not
//! reached" for that attempt.
//!
//! # Forms
//!
//! - [`ReachabilityProber::is_reachable`]: one attempt from the default
//!   source address
//! - [`ReachabilityProber::is_reachable_via`]: one concurrent attempt per
//!   non-loopback address of a network interface, each bound to that source
//!   address; the first success wins and the remaining attempts are abandoned
//!
//! Both forms answer `true` without any I/O when the target is one of this
//! machine's own interface addresses, so the single-address form makes at
//! most one attempt. A loopback address that no interface carries is probed
//! like any other target.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use rust_inet::addr::{IpAddress, StaticInterfaces};
//! use rust_inet::config::ProbeConfig;
//! use rust_inet::probe::ReachabilityProber;
//! use rust_inet::socket::{ConnectOutcome, MockIoProvider};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let provider = Arc::new(MockIoProvider::new());
//! provider.set_default_outcome(ConnectOutcome::Refuse);
//! let prober = ReachabilityProber::new(
//!     provider.clone(),
//!     Arc::new(StaticInterfaces::loopback_only()),
//!     &ProbeConfig::default(),
//! );
//!
//! let target: IpAddress = "192.0.2.1".parse().unwrap();
//! assert!(prober.is_reachable(&target, 1000).await.unwrap());
//! assert_eq!(provider.connect_attempts(), 1);
//! # });
//! ```

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::addr::{InterfaceEnumerator, IpAddress, NetworkInterface, SocketAddress};
use crate::config::ProbeConfig;
use crate::error::{InetError, InetResult};
use crate::socket::{timeout_from_millis, IoProvider, StreamSocket};

/// TCP-connect reachability prober
#[derive(Debug, Clone)]
pub struct ReachabilityProber {
    provider: Arc<dyn IoProvider>,
    interfaces: Arc<dyn InterfaceEnumerator>,
    port: u16,
}

/// Validate a hop limit; 0 keeps the system default
fn hop_limit(ttl: i64) -> InetResult<Option<u32>> {
    match ttl {
        0 => Ok(None),
        ttl => u32::try_from(ttl)
            .map(Some)
            .map_err(|_| {
                InetError::invalid_argument(format!("ttl out of range [0, {}]: {ttl}", u32::MAX))
            }),
    }
}

/// One connect attempt; refusal counts as reached
async fn probe_once(
    provider: Arc<dyn IoProvider>,
    source: Option<IpAddress>,
    target: SocketAddress,
    ttl: Option<u32>,
    timeout_ms: i64,
) -> bool {
    let attempt = async {
        let socket = StreamSocket::new(provider)?;
        if let Some(source) = &source {
            socket.bind(&SocketAddress::new(source.clone(), 0))?;
        }
        if let Some(ttl) = ttl {
            socket.set_ttl(ttl)?;
        }
        let result = socket.connect(&target, timeout_ms).await;
        socket.close();
        result
    };

    match attempt.await {
        Ok(()) => {
            debug!("Probe {:?} -> {} connected", source, target);
            true
        }
        Err(e) if e.is_connection_refused() => {
            debug!("Probe {:?} -> {} refused, host is up", source, target);
            true
        }
        Err(e) => {
            debug!("Probe {:?} -> {} failed: {}", source, target, e);
            false
        }
    }
}

impl ReachabilityProber {
    #[must_use]
    pub fn new(
        provider: Arc<dyn IoProvider>,
        interfaces: Arc<dyn InterfaceEnumerator>,
        config: &ProbeConfig,
    ) -> Self {
        Self {
            provider,
            interfaces,
            port: config.port,
        }
    }

    /// Destination port of probes
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether `target` is one of this machine's interface addresses
    fn is_local(&self, target: &IpAddress) -> bool {
        match self.interfaces.local_addresses() {
            Ok(addresses) => addresses.contains(target),
            Err(e) => {
                warn!("Interface enumeration failed, probing {} anyway: {}", target, e);
                false
            }
        }
    }

    /// Probe `target` with a single attempt; `timeout_ms` of 0 waits forever
    ///
    /// # Errors
    ///
    /// Returns `InetError::InvalidArgument` for a negative timeout. Probe
    /// failures are reported as `Ok(false)`.
    pub async fn is_reachable(&self, target: &IpAddress, timeout_ms: i64) -> InetResult<bool> {
        self.is_reachable_via(None, target, 0, timeout_ms).await
    }

    /// Probe `target` from every non-loopback address of `interface`
    ///
    /// With no interface this is a single attempt from the default source.
    /// `ttl` of 0 keeps the system hop limit.
    ///
    /// # Errors
    ///
    /// Returns `InetError::InvalidArgument` for a negative `ttl` or timeout.
    pub async fn is_reachable_via(
        &self,
        interface: Option<&NetworkInterface>,
        target: &IpAddress,
        ttl: i64,
        timeout_ms: i64,
    ) -> InetResult<bool> {
        let timeout = timeout_from_millis(timeout_ms)?;
        let ttl = hop_limit(ttl)?;

        if self.is_local(target) {
            debug!("{} is a local address, reachable without probing", target);
            return Ok(true);
        }

        let destination = SocketAddress::new(target.clone(), self.port);
        let Some(interface) = interface else {
            return Ok(probe_once(Arc::clone(&self.provider), None, destination, ttl, timeout_ms).await);
        };

        let sources: Vec<IpAddress> = interface
            .addresses()
            .iter()
            .filter(|a| !a.is_loopback() && a.family() == target.family())
            .cloned()
            .collect();
        if sources.is_empty() {
            debug!(
                "Interface {} has no usable source address for {}",
                interface.name(),
                target
            );
            return Ok(false);
        }

        let mut probes = JoinSet::new();
        for source in sources {
            probes.spawn(probe_once(
                Arc::clone(&self.provider),
                Some(source),
                destination.clone(),
                ttl,
                timeout_ms,
            ));
        }

        let first_success = async {
            while let Some(joined) = probes.join_next().await {
                match joined {
                    Ok(true) => return true,
                    Ok(false) => {}
                    Err(e) => warn!("Probe task failed: {}", e),
                }
            }
            false
        };
        let reached = match timeout {
            Some(limit) => tokio::time::timeout(limit, first_success)
                .await
                .unwrap_or(false),
            None => first_success.await,
        };

        // Stragglers finish on their own; their results are discarded.
        probes.detach_all();
        debug!(
            "{} via {}: {}",
            target,
            interface.name(),
            if reached { "reachable" } else { "unreachable" }
        );
        Ok(reached)
    }
}
