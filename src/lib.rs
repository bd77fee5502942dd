//! rust-inet: Internet address model, resolver cache and socket lifecycle
//!
//! This crate provides the address layer a networking runtime sits on:
//! parsing and classifying IPv4/IPv6 addresses, resolving hostnames through a
//! process-wide TTL cache, enforcing the lifecycle of stream and datagram
//! sockets, and probing whether a host is reachable.
//!
//! # Features
//!
//! - **Address model**: IPv4 and IPv6 values with literal parsing, scope ids
//!   and the usual classification predicates
//! - **Resolution cache**: bounded LRU cache with separate positive and
//!   negative TTLs, overridable at runtime through a property source
//! - **Socket lifecycle**: bind/connect/close/shutdown state machine in front
//!   of a pluggable I/O provider
//! - **Reachability**: TCP echo-port probes, optionally from every address
//!   of one interface
//!
//! # Architecture
//!
//! ```text
//!                 InetContext
//!        ┌────────────┼──────────────┐
//!        ↓            ↓              ↓
//!    Resolver   ReachabilityProber  Stream/DatagramSocket
//!     ↓     ↓         ↓                   ↓
//!  Cache  NameSystem  └──────────→ IoProvider (tokio / mock)
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use rust_inet::config::Config;
//! use rust_inet::context::InetContext;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let context = InetContext::system(&Config::default())?;
//!
//! let addresses = context.resolver().resolve_all("example.com").await?;
//! let reachable = context
//!     .prober()
//!     .is_reachable(&addresses[0], 2000)
//!     .await?;
//! println!("{} reachable: {reachable}", addresses[0]);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`addr`]: Address values, literal parsing and interfaces
//! - [`cache`]: Resolution cache and TTL policy
//! - [`config`]: Configuration types and loading
//! - [`context`]: Process-lifetime wiring
//! - [`error`]: Error types
//! - [`probe`]: Reachability probing
//! - [`resolver`]: Hostname resolution
//! - [`socket`]: Socket state machine and I/O providers

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod addr;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod probe;
pub mod resolver;
pub mod socket;

// Re-export commonly used types at the crate root
pub use addr::{AddressFamily, IpAddress, NetworkInterface, SocketAddress};
pub use cache::ResolutionCache;
pub use config::Config;
pub use context::{InetContext, InetContextBuilder};
pub use error::{ConfigError, InetError, InetResult};
pub use probe::ReachabilityProber;
pub use resolver::Resolver;
pub use socket::{DatagramSocket, StreamSocket};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
