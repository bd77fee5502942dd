//! Integration tests for rust-inet
//!
//! These tests drive the public API through an [`InetContext`] wired with the
//! in-crate mock collaborators, plus a few real loopback exchanges.
//!
//! # Test Organization
//!
//! - `config_loading`: JSON configuration files and property overrides
//! - `resolution`: resolver and cache behavior across resolvers
//! - `sockets`: socket lifecycle over mock and tokio providers
//! - `reachability`: probes through the context's prober
//!
//! [`InetContext`]: rust_inet::InetContext

pub mod config_loading;
pub mod reachability;
pub mod resolution;
pub mod sockets;

use std::sync::Arc;

use rust_inet::addr::{InterfaceEnumerator, StaticInterfaces};
use rust_inet::config::Config;
use rust_inet::resolver::MockNameSystem;
use rust_inet::socket::MockIoProvider;
use rust_inet::{InetContext, InetContextBuilder};

/// Context wired with mocks, plus handles on the mocks
pub struct Harness {
    pub context: InetContext,
    pub names: Arc<MockNameSystem>,
    pub io: Arc<MockIoProvider>,
}

impl Harness {
    pub fn new(config: Config) -> Self {
        Self::with_interfaces(config, StaticInterfaces::loopback_only())
    }

    pub fn with_interfaces(config: Config, interfaces: impl InterfaceEnumerator + 'static) -> Self {
        let names = Arc::new(MockNameSystem::new());
        let io = Arc::new(MockIoProvider::new());
        let mut builder = InetContextBuilder::new(config);
        builder
            .name_system(names.clone())
            .io_provider(io.clone())
            .interfaces(Arc::new(interfaces));
        Self {
            context: builder.build().expect("valid config"),
            names,
            io,
        }
    }
}
