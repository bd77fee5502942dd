//! Process-lifetime wiring
//!
//! An [`InetContext`] owns the one resolution cache of the process together
//! with the collaborators (name system, I/O provider, interface enumerator,
//! property source) and hands out resolvers, probers, and sockets that share
//! them. The application creates it once at startup and passes it (or
//! clones of the `Arc`s it hands out) to whatever needs networking.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use rust_inet::config::Config;
//! use rust_inet::context::InetContextBuilder;
//! use rust_inet::resolver::MockNameSystem;
//! use rust_inet::socket::MockIoProvider;
//! use rust_inet::addr::StaticInterfaces;
//!
//! let mut builder = InetContextBuilder::new(Config::default());
//! builder
//!     .name_system(Arc::new(MockNameSystem::new()))
//!     .io_provider(Arc::new(MockIoProvider::new()))
//!     .interfaces(Arc::new(StaticInterfaces::loopback_only()));
//! let context = builder.build().unwrap();
//!
//! // Resolvers share the context's cache.
//! let a = context.resolver();
//! let b = context.resolver();
//! assert!(Arc::ptr_eq(a.cache(), b.cache()));
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::addr::{InterfaceEnumerator, NetworkInterface, SystemInterfaces};
use crate::cache::{Clock, ResolutionCache};
use crate::config::{Config, PropertySource, StaticProperties};
use crate::error::{ConfigError, InetResult};
use crate::probe::ReachabilityProber;
use crate::resolver::{NameSystem, Resolver, SystemNameSystem};
use crate::socket::{DatagramSocket, IoProvider, StreamSocket, TokioIoProvider};

/// Shared cache and collaborators for one process
#[derive(Clone)]
pub struct InetContext {
    config: Config,
    cache: Arc<ResolutionCache>,
    name_system: Arc<dyn NameSystem>,
    io: Arc<dyn IoProvider>,
    interfaces: Arc<dyn InterfaceEnumerator>,
}

impl InetContext {
    /// Wire the platform collaborators for `config`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the configuration is invalid.
    pub fn system(config: &Config) -> Result<Self, ConfigError> {
        InetContextBuilder::new(config.clone()).build()
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The process-wide resolution cache
    #[must_use]
    pub fn cache(&self) -> &Arc<ResolutionCache> {
        &self.cache
    }

    #[must_use]
    pub fn io_provider(&self) -> &Arc<dyn IoProvider> {
        &self.io
    }

    #[must_use]
    pub fn interfaces(&self) -> &Arc<dyn InterfaceEnumerator> {
        &self.interfaces
    }

    /// A resolver over the shared cache
    #[must_use]
    pub fn resolver(&self) -> Resolver {
        Resolver::new(
            Arc::clone(&self.cache),
            Arc::clone(&self.name_system),
            &self.config.resolver,
        )
        .with_interfaces(Arc::clone(&self.interfaces))
    }

    /// A reachability prober over the shared provider
    #[must_use]
    pub fn prober(&self) -> ReachabilityProber {
        ReachabilityProber::new(
            Arc::clone(&self.io),
            Arc::clone(&self.interfaces),
            &self.config.probe,
        )
    }

    /// A new unbound stream socket
    ///
    /// # Errors
    ///
    /// Returns the provider's error if no handle can be allocated.
    pub fn stream_socket(&self) -> InetResult<StreamSocket> {
        StreamSocket::new(Arc::clone(&self.io))
    }

    /// A new unbound datagram socket
    ///
    /// # Errors
    ///
    /// Returns the provider's error if no handle can be allocated.
    pub fn datagram_socket(&self) -> InetResult<DatagramSocket> {
        DatagramSocket::new(Arc::clone(&self.io))
    }

    /// Fresh snapshot of the machine's interfaces
    ///
    /// # Errors
    ///
    /// Propagates enumeration failures.
    pub fn list_interfaces(&self) -> InetResult<Vec<Arc<NetworkInterface>>> {
        self.interfaces.list()
    }
}

impl fmt::Debug for InetContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InetContext")
            .field("cache_entries", &self.cache.len())
            .field("name_system", &self.name_system)
            .field("io", &self.io)
            .finish_non_exhaustive()
    }
}

/// Builder for an [`InetContext`]
///
/// Collaborators left unset default to the platform implementations.
pub struct InetContextBuilder {
    config: Config,
    name_system: Option<Arc<dyn NameSystem>>,
    io: Option<Arc<dyn IoProvider>>,
    interfaces: Option<Arc<dyn InterfaceEnumerator>>,
    properties: Option<Arc<dyn PropertySource>>,
    clock: Option<Arc<dyn Clock>>,
}

impl InetContextBuilder {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            name_system: None,
            io: None,
            interfaces: None,
            properties: None,
            clock: None,
        }
    }

    pub fn name_system(&mut self, name_system: Arc<dyn NameSystem>) -> &mut Self {
        self.name_system = Some(name_system);
        self
    }

    pub fn io_provider(&mut self, io: Arc<dyn IoProvider>) -> &mut Self {
        self.io = Some(io);
        self
    }

    pub fn interfaces(&mut self, interfaces: Arc<dyn InterfaceEnumerator>) -> &mut Self {
        self.interfaces = Some(interfaces);
        self
    }

    /// Source of cache TTL overrides
    ///
    /// Replaces the `properties` map of the configuration.
    pub fn properties(&mut self, properties: Arc<dyn PropertySource>) -> &mut Self {
        self.properties = Some(properties);
        self
    }

    /// Time source for cache expiry
    pub fn clock(&mut self, clock: Arc<dyn Clock>) -> &mut Self {
        self.clock = Some(clock);
        self
    }

    /// Validate the configuration and build the context
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the configuration is invalid.
    pub fn build(self) -> Result<InetContext, ConfigError> {
        self.config.validate()?;

        // Without overrides the cache never consults a property source.
        let properties = self.properties.or_else(|| {
            (!self.config.properties.is_empty()).then(|| {
                Arc::new(StaticProperties::from_map(self.config.properties.clone()))
                    as Arc<dyn PropertySource>
            })
        });

        let mut cache = ResolutionCache::new(&self.config.cache);
        if let Some(properties) = properties {
            cache = cache.with_property_source(properties);
        }
        if let Some(clock) = self.clock {
            cache = cache.with_clock(clock);
        }

        info!(
            "Resolution cache: enabled={}, capacity={}, ttl={}s, negative_ttl={}s",
            self.config.cache.enabled,
            self.config.cache.max_entries,
            self.config.cache.positive_ttl_secs,
            self.config.cache.negative_ttl_secs
        );

        Ok(InetContext {
            cache: Arc::new(cache),
            name_system: self
                .name_system
                .unwrap_or_else(|| Arc::new(SystemNameSystem::new())),
            io: self.io.unwrap_or_else(|| Arc::new(TokioIoProvider::new())),
            interfaces: self
                .interfaces
                .unwrap_or_else(|| Arc::new(SystemInterfaces::new())),
            config: self.config,
        })
    }
}
