//! Socket address: an [`IpAddress`] plus a port

use std::fmt;
use std::net::{SocketAddr, SocketAddrV4, SocketAddrV6};

use super::{AddressFamily, IpAddress};
use crate::error::{InetError, InetResult};

/// Validate a port number to the range `[0, 65535]`
///
/// # Errors
///
/// Returns `InetError::InvalidArgument` when out of range.
///
/// # Example
///
/// ```
/// use rust_inet::addr::check_port;
///
/// assert_eq!(check_port(80).unwrap(), 80);
/// assert!(check_port(-1).is_err());
/// assert!(check_port(65536).is_err());
/// ```
pub fn check_port(port: i64) -> InetResult<u16> {
    u16::try_from(port).map_err(|_| InetError::invalid_argument(format!("port out of range: {port}")))
}

/// An IP address and port
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SocketAddress {
    ip: IpAddress,
    port: u16,
}

impl SocketAddress {
    /// Create a socket address
    #[must_use]
    pub fn new(ip: IpAddress, port: u16) -> Self {
        Self { ip, port }
    }

    /// Create a socket address from an unchecked port number
    ///
    /// # Errors
    ///
    /// Returns `InetError::InvalidArgument` when the port is out of range.
    pub fn from_port(ip: IpAddress, port: i64) -> InetResult<Self> {
        Ok(Self::new(ip, check_port(port)?))
    }

    /// IPv4 wildcard address with the given port
    #[must_use]
    pub fn wildcard(port: u16) -> Self {
        Self::new(IpAddress::any(AddressFamily::Inet), port)
    }

    #[must_use]
    pub fn ip(&self) -> &IpAddress {
        &self.ip
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Convert to the standard library representation, keeping the scope id
    #[must_use]
    pub fn to_std(&self) -> SocketAddr {
        match &self.ip {
            IpAddress::V4(a) => SocketAddr::V4(SocketAddrV4::new(a.into(), self.port)),
            IpAddress::V6(a) => SocketAddr::V6(SocketAddrV6::new(
                a.into(),
                self.port,
                0,
                a.scope_id().unwrap_or(0),
            )),
        }
    }
}

impl From<SocketAddr> for SocketAddress {
    fn from(addr: SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(a) => Self::new(IpAddress::from(std::net::IpAddr::V4(*a.ip())), a.port()),
            SocketAddr::V6(a) => {
                let ip = if a.scope_id() == 0 {
                    super::Inet6Address::new(a.ip().octets())
                } else {
                    super::Inet6Address::with_scope_id(a.ip().octets(), a.scope_id())
                };
                Self::new(IpAddress::V6(ip), a.port())
            }
        }
    }
}

impl fmt::Display for SocketAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ip {
            IpAddress::V4(a) => write!(f, "{a}:{}", self.port),
            IpAddress::V6(a) => write!(f, "[{a}]:{}", self.port),
        }
    }
}
