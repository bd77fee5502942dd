//! Hostname resolution
//!
//! The [`Resolver`] answers `resolve_all(host)` in this order:
//!
//! 1. Empty host → the loopback addresses of both families
//! 2. Numeric literal → parsed directly, no cache or name system
//! 3. Cache hit → cached addresses, or `UnknownHost` for a negative record
//! 4. Cache miss → name system; the result (or the failure) is cached
//!
//! Results are ordered by family preference, keeping the name system's
//! order within each family.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use rust_inet::cache::ResolutionCache;
//! use rust_inet::config::{CacheConfig, ResolverConfig};
//! use rust_inet::resolver::{MockNameSystem, Resolver};
//!
//! # tokio_test_block_on(async {
//! let names = Arc::new(MockNameSystem::new());
//! names.insert("db.internal", &["2001:db8::5", "10.0.0.5"]);
//!
//! let cache = Arc::new(ResolutionCache::new(&CacheConfig::default()));
//! let resolver = Resolver::new(cache, names.clone(), &ResolverConfig::default());
//!
//! let addrs = resolver.resolve_all("db.internal").await.unwrap();
//! assert!(addrs[0].is_ipv4());
//!
//! // Second call is served from the cache.
//! resolver.resolve_all("db.internal").await.unwrap();
//! assert_eq!(names.lookup_calls(), 1);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

mod name_system;

use std::sync::Arc;

use tracing::{debug, warn};

pub use name_system::{MockNameSystem, NameSystem, SystemNameSystem};

use crate::addr::{
    parse_literal, sort_by_family, Inet4Address, Inet6Address, InterfaceEnumerator, IpAddress,
    Literal, ScopeSpec,
};
use crate::cache::ResolutionCache;
use crate::config::ResolverConfig;
use crate::error::{InetError, InetResult};

/// Cache-backed hostname resolver
#[derive(Debug, Clone)]
pub struct Resolver {
    cache: Arc<ResolutionCache>,
    name_system: Arc<dyn NameSystem>,
    interfaces: Option<Arc<dyn InterfaceEnumerator>>,
    prefer_ipv6: bool,
}

impl Resolver {
    /// Create a resolver over a shared cache and name system
    #[must_use]
    pub fn new(
        cache: Arc<ResolutionCache>,
        name_system: Arc<dyn NameSystem>,
        config: &ResolverConfig,
    ) -> Self {
        Self {
            cache,
            name_system,
            interfaces: None,
            prefer_ipv6: config.prefer_ipv6,
        }
    }

    /// Resolve `%ifname` scopes of IPv6 literals through `interfaces`
    #[must_use]
    pub fn with_interfaces(mut self, interfaces: Arc<dyn InterfaceEnumerator>) -> Self {
        self.interfaces = Some(interfaces);
        self
    }

    /// The shared resolution cache
    #[must_use]
    pub fn cache(&self) -> &Arc<ResolutionCache> {
        &self.cache
    }

    #[must_use]
    pub fn prefers_ipv6(&self) -> bool {
        self.prefer_ipv6
    }

    /// Loopback addresses of both families, preferred family first
    #[must_use]
    pub fn loopback_addresses(&self) -> Vec<IpAddress> {
        if self.prefer_ipv6 {
            vec![IpAddress::loopback_v6(), IpAddress::loopback_v4()]
        } else {
            vec![IpAddress::loopback_v4(), IpAddress::loopback_v6()]
        }
    }

    /// Resolve a host into all of its addresses
    ///
    /// An empty `host` resolves to the loopback addresses.
    ///
    /// # Errors
    ///
    /// Returns `InetError::UnknownHost` if the host does not resolve or is a
    /// malformed literal. Transport failures of the name system other than
    /// "unknown host" are propagated and not cached.
    pub async fn resolve_all(&self, host: &str) -> InetResult<Vec<IpAddress>> {
        if host.is_empty() {
            return Ok(self.loopback_addresses());
        }

        match parse_literal(host) {
            Literal::V4(octets) => return Ok(vec![IpAddress::V4(Inet4Address::new(octets))]),
            Literal::V6 { octets, scope } => return Ok(vec![self.scoped_v6(host, octets, scope)?]),
            Literal::Invalid => {
                debug!("Malformed address literal {:?}", host);
                return Err(InetError::unknown_host(host));
            }
            Literal::NotLiteral => {}
        }

        if let Some(cached) = self.cache.get(host) {
            if cached.is_empty() {
                debug!("Negative cache hit for {}", host);
                return Err(InetError::unknown_host(host));
            }
            return Ok(cached);
        }

        debug!("Cache miss for {}, querying name system", host);
        match self.name_system.lookup(host).await {
            Ok(raw) => {
                let mut addresses = Vec::with_capacity(raw.len());
                for bytes in &raw {
                    match IpAddress::with_host_name(host, bytes) {
                        Ok(addr) => addresses.push(addr),
                        Err(e) => warn!("Dropping address for {}: {}", host, e),
                    }
                }
                if addresses.is_empty() {
                    self.cache.put_unknown_host(host);
                    return Err(InetError::unknown_host(host));
                }
                sort_by_family(&mut addresses, self.prefer_ipv6);
                self.cache.put(host, addresses.clone());
                Ok(addresses)
            }
            Err(e) if e.is_unknown_host() => {
                debug!("{} does not resolve, caching negative result", host);
                self.cache.put_unknown_host(host);
                Err(InetError::unknown_host(host))
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve a host into its first address
    ///
    /// # Errors
    ///
    /// Same as [`Resolver::resolve_all`].
    pub async fn resolve_one(&self, host: &str) -> InetResult<IpAddress> {
        self.resolve_all(host)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| InetError::unknown_host(host))
    }

    fn scoped_v6(
        &self,
        host: &str,
        octets: [u8; 16],
        scope: Option<ScopeSpec>,
    ) -> InetResult<IpAddress> {
        match scope {
            None => IpAddress::from_bytes(&octets),
            Some(ScopeSpec::Id(id)) => Ok(IpAddress::V6(Inet6Address::with_scope_id(octets, id))),
            Some(ScopeSpec::Name(name)) => {
                let interface = match &self.interfaces {
                    Some(enumerator) => enumerator.by_name(&name)?,
                    None => None,
                };
                interface
                    .map(|i| IpAddress::V6(Inet6Address::with_scoped_interface(octets, &i)))
                    .ok_or_else(|| InetError::unknown_host(host))
            }
        }
    }

    /// Hostname for an address, memoized on the address
    ///
    /// Uses the address's known hostname if it has one. Otherwise performs a
    /// reverse lookup and keeps the name only if it resolves back to the same
    /// address; in every failure case the textual address is returned.
    pub async fn host_name(&self, addr: &IpAddress) -> String {
        if let Some(name) = addr.host_name() {
            return name.to_string();
        }
        let name = self.canonical_host_name(addr).await;
        addr.remember_host_name(name).to_string()
    }

    /// Reverse-resolve an address without consulting the memoized name
    pub async fn canonical_host_name(&self, addr: &IpAddress) -> String {
        let literal = addr.host_address();
        let name = match self.name_system.reverse_lookup(&addr.to_bytes()).await {
            Ok(name) => name,
            Err(e) => {
                debug!("Reverse lookup of {} failed: {}", literal, e);
                return literal;
            }
        };

        match self.resolve_all(&name).await {
            Ok(forward) if forward.contains(addr) => name,
            _ => {
                debug!("{} does not resolve back to {}", name, literal);
                literal
            }
        }
    }

    /// Address of the local host
    ///
    /// Falls back to the preferred loopback address if the local hostname is
    /// unavailable or does not resolve.
    pub async fn local_host(&self) -> IpAddress {
        let fallback = || self.loopback_addresses().remove(0);

        let name = match self.name_system.local_host_name() {
            Ok(name) => name,
            Err(e) => {
                warn!("Local host name unavailable: {}", e);
                return fallback();
            }
        };

        match self.resolve_one(&name).await {
            Ok(addr) => addr,
            Err(e) => {
                warn!("Local host name {} does not resolve: {}", name, e);
                fallback()
            }
        }
    }
}
