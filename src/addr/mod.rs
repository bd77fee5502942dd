//! IP address model
//!
//! This module provides the tagged address type used throughout the crate:
//!
//! - [`IpAddress`]: either an [`Inet4Address`] or an [`Inet6Address`]
//! - [`SocketAddress`]: an address plus a validated port
//! - [`NetworkInterface`]: an immutable interface snapshot
//! - [`InterfaceEnumerator`]: the platform enumeration collaborator
//!
//! Addresses are immutable after construction except for the lazily
//! memoized hostname. Equality and hashing use the octets only.
//!
//! # Example
//!
//! ```
//! use rust_inet::addr::IpAddress;
//!
//! let addr = IpAddress::from_bytes(&[10, 0, 0, 1]).unwrap();
//! assert!(addr.is_ipv4());
//! assert!(addr.is_site_local());
//!
//! assert!(IpAddress::from_bytes(&[1, 2, 3]).is_err());
//! ```

mod interface;
mod literal;
mod socket_addr;
mod v4;
mod v6;

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

pub use interface::{InterfaceEnumerator, NetworkInterface, StaticInterfaces, SystemInterfaces};
pub use literal::{parse_ipv4_literal, parse_literal, Literal, ScopeSpec};
pub use socket_addr::{check_port, SocketAddress};
pub use v4::Inet4Address;
pub use v6::Inet6Address;

use crate::error::{InetError, InetResult};

/// Address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    /// IPv4
    Inet,
    /// IPv6
    Inet6,
}

/// An IPv4 or IPv6 address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IpAddress {
    /// IPv4 address
    V4(Inet4Address),
    /// IPv6 address
    V6(Inet6Address),
}

impl IpAddress {
    /// Build an address from raw octets
    ///
    /// Four bytes give a V4 address, sixteen a V6 address. An IPv4-mapped
    /// IPv6 address (`::ffff:a.b.c.d`) is converted to V4.
    ///
    /// # Errors
    ///
    /// Returns `InetError::InvalidArgument` for any other length.
    pub fn from_bytes(bytes: &[u8]) -> InetResult<Self> {
        match bytes.len() {
            Inet4Address::LEN => {
                let mut octets = [0u8; 4];
                octets.copy_from_slice(bytes);
                Ok(Self::V4(Inet4Address::new(octets)))
            }
            Inet6Address::LEN => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(bytes);
                let v6 = Inet6Address::new(octets);
                Ok(match v6.to_ipv4_mapped() {
                    Some(v4) => Self::V4(Inet4Address::new(v4)),
                    None => Self::V6(v6),
                })
            }
            n => Err(InetError::invalid_argument(format!(
                "address must be 4 or 16 bytes, got {n}"
            ))),
        }
    }

    /// Build an address from raw octets that carries the given hostname
    ///
    /// # Errors
    ///
    /// Returns `InetError::InvalidArgument` if the length is not 4 or 16.
    pub fn with_host_name(host_name: impl Into<String>, bytes: &[u8]) -> InetResult<Self> {
        let host_name = host_name.into();
        Ok(match Self::from_bytes(bytes)? {
            Self::V4(v4) => Self::V4(Inet4Address::with_host_name(host_name, v4.octets())),
            Self::V6(v6) => Self::V6(Inet6Address::with_host_name(host_name, v6.octets())),
        })
    }

    /// IPv4 loopback, `127.0.0.1`
    #[must_use]
    pub fn loopback_v4() -> Self {
        Self::V4(Inet4Address::loopback())
    }

    /// IPv6 loopback, `::1`
    #[must_use]
    pub fn loopback_v6() -> Self {
        Self::V6(Inet6Address::loopback())
    }

    /// Wildcard address of the given family
    #[must_use]
    pub fn any(family: AddressFamily) -> Self {
        match family {
            AddressFamily::Inet => Self::V4(Inet4Address::any()),
            AddressFamily::Inet6 => Self::V6(Inet6Address::any()),
        }
    }

    /// Address family
    #[must_use]
    pub fn family(&self) -> AddressFamily {
        match self {
            Self::V4(_) => AddressFamily::Inet,
            Self::V6(_) => AddressFamily::Inet6,
        }
    }

    #[must_use]
    pub fn is_ipv4(&self) -> bool {
        matches!(self, Self::V4(_))
    }

    #[must_use]
    pub fn is_ipv6(&self) -> bool {
        matches!(self, Self::V6(_))
    }

    /// Raw octets (4 or 16 bytes)
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::V4(a) => a.octets().to_vec(),
            Self::V6(a) => a.octets().to_vec(),
        }
    }

    /// Memoized hostname, if known
    #[must_use]
    pub fn host_name(&self) -> Option<&str> {
        match self {
            Self::V4(a) => a.host_name(),
            Self::V6(a) => a.host_name(),
        }
    }

    /// Memoize a hostname and return the stored one
    pub(crate) fn remember_host_name(&self, host_name: String) -> &str {
        match self {
            Self::V4(a) => a.remember_host_name(host_name),
            Self::V6(a) => a.remember_host_name(host_name),
        }
    }

    /// Textual form of the address without any hostname
    #[must_use]
    pub fn host_address(&self) -> String {
        self.to_string()
    }

    /// Convert to the standard library representation (scope is dropped)
    #[must_use]
    pub fn to_std(&self) -> IpAddr {
        match self {
            Self::V4(a) => IpAddr::V4(Ipv4Addr::from(a)),
            Self::V6(a) => IpAddr::V6(Ipv6Addr::from(a)),
        }
    }

    #[must_use]
    pub fn scope_id(&self) -> Option<u32> {
        match self {
            Self::V4(_) => None,
            Self::V6(a) => a.scope_id(),
        }
    }

    #[must_use]
    pub fn is_any_local(&self) -> bool {
        match self {
            Self::V4(a) => a.is_any_local(),
            Self::V6(a) => a.is_any_local(),
        }
    }

    #[must_use]
    pub fn is_loopback(&self) -> bool {
        match self {
            Self::V4(a) => a.is_loopback(),
            Self::V6(a) => a.is_loopback(),
        }
    }

    #[must_use]
    pub fn is_link_local(&self) -> bool {
        match self {
            Self::V4(a) => a.is_link_local(),
            Self::V6(a) => a.is_link_local(),
        }
    }

    #[must_use]
    pub fn is_site_local(&self) -> bool {
        match self {
            Self::V4(a) => a.is_site_local(),
            Self::V6(a) => a.is_site_local(),
        }
    }

    #[must_use]
    pub fn is_multicast(&self) -> bool {
        match self {
            Self::V4(a) => a.is_multicast(),
            Self::V6(a) => a.is_multicast(),
        }
    }

    #[must_use]
    pub fn is_mc_global(&self) -> bool {
        match self {
            Self::V4(a) => a.is_mc_global(),
            Self::V6(a) => a.is_mc_global(),
        }
    }

    #[must_use]
    pub fn is_mc_node_local(&self) -> bool {
        match self {
            Self::V4(a) => a.is_mc_node_local(),
            Self::V6(a) => a.is_mc_node_local(),
        }
    }

    #[must_use]
    pub fn is_mc_link_local(&self) -> bool {
        match self {
            Self::V4(a) => a.is_mc_link_local(),
            Self::V6(a) => a.is_mc_link_local(),
        }
    }

    #[must_use]
    pub fn is_mc_site_local(&self) -> bool {
        match self {
            Self::V4(a) => a.is_mc_site_local(),
            Self::V6(a) => a.is_mc_site_local(),
        }
    }

    #[must_use]
    pub fn is_mc_org_local(&self) -> bool {
        match self {
            Self::V4(a) => a.is_mc_org_local(),
            Self::V6(a) => a.is_mc_org_local(),
        }
    }
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4(a) => a.fmt(f),
            Self::V6(a) => a.fmt(f),
        }
    }
}

impl From<IpAddr> for IpAddress {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(a) => Self::V4(a.into()),
            IpAddr::V6(a) => Self::V6(a.into()),
        }
    }
}

impl From<Inet4Address> for IpAddress {
    fn from(addr: Inet4Address) -> Self {
        Self::V4(addr)
    }
}

impl From<Inet6Address> for IpAddress {
    fn from(addr: Inet6Address) -> Self {
        Self::V6(addr)
    }
}

impl FromStr for IpAddress {
    type Err = InetError;

    /// Parse a numeric literal; interface-name scopes are not resolved here
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_literal(s) {
            Literal::V4(octets) => Ok(Self::V4(Inet4Address::new(octets))),
            Literal::V6 { octets, scope } => match scope {
                None => IpAddress::from_bytes(&octets),
                Some(ScopeSpec::Id(id)) => Ok(Self::V6(Inet6Address::with_scope_id(octets, id))),
                Some(ScopeSpec::Name(name)) => Err(InetError::invalid_argument(format!(
                    "interface scope '{name}' needs an interface lookup"
                ))),
            },
            Literal::Invalid | Literal::NotLiteral => {
                Err(InetError::invalid_argument(format!("not an IP literal: {s}")))
            }
        }
    }
}

/// Stable sort putting the preferred family first
///
/// Order within a family is preserved.
pub fn sort_by_family(addresses: &mut [IpAddress], prefer_ipv6: bool) {
    addresses.sort_by_key(|addr| addr.is_ipv6() != prefer_ipv6);
}
