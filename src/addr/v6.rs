//! IPv6 address
//!
//! Besides the sixteen octets an IPv6 address may carry a scope id and a
//! weak reference to the interface it is scoped to. Neither takes part in
//! equality or hashing.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::Ipv6Addr;
use std::sync::{Arc, OnceLock, Weak};

use super::interface::NetworkInterface;

/// An IPv6 address
///
/// # Example
///
/// ```
/// use rust_inet::addr::Inet6Address;
///
/// let mut octets = [0u8; 16];
/// octets[15] = 1;
/// let addr = Inet6Address::new(octets);
/// assert!(addr.is_loopback());
///
/// let scoped = Inet6Address::with_scope_id(octets, 3);
/// assert_eq!(scoped.scope_id(), Some(3));
/// assert_eq!(addr, scoped);
/// ```
#[derive(Debug, Clone)]
pub struct Inet6Address {
    octets: [u8; 16],
    scope_id: Option<u32>,
    scoped_interface: Option<Weak<NetworkInterface>>,
    host_name: OnceLock<String>,
}

impl Inet6Address {
    /// Number of octets in an IPv6 address
    pub const LEN: usize = 16;

    /// Create an unscoped address
    #[must_use]
    pub fn new(octets: [u8; 16]) -> Self {
        Self {
            octets,
            scope_id: None,
            scoped_interface: None,
            host_name: OnceLock::new(),
        }
    }

    /// Create an address with a numeric scope id
    #[must_use]
    pub fn with_scope_id(octets: [u8; 16], scope_id: u32) -> Self {
        Self {
            scope_id: Some(scope_id),
            ..Self::new(octets)
        }
    }

    /// Create an address scoped to an interface; the scope id is the interface index
    #[must_use]
    pub fn with_scoped_interface(octets: [u8; 16], interface: &Arc<NetworkInterface>) -> Self {
        Self::scoped_to(octets, interface.index(), Arc::downgrade(interface))
    }

    pub(crate) fn scoped_to(octets: [u8; 16], index: u32, interface: Weak<NetworkInterface>) -> Self {
        Self {
            scope_id: Some(index),
            scoped_interface: Some(interface),
            ..Self::new(octets)
        }
    }

    /// Create an address that already knows its hostname
    #[must_use]
    pub fn with_host_name(host_name: impl Into<String>, octets: [u8; 16]) -> Self {
        let addr = Self::new(octets);
        let _ = addr.host_name.set(host_name.into());
        addr
    }

    /// `::`
    #[must_use]
    pub fn any() -> Self {
        Self::new([0; 16])
    }

    /// `::1`, named `localhost`
    #[must_use]
    pub fn loopback() -> Self {
        Self::with_host_name("localhost", Ipv6Addr::LOCALHOST.octets())
    }

    /// The raw octets
    #[must_use]
    pub fn octets(&self) -> [u8; 16] {
        self.octets
    }

    /// Numeric scope id, if any
    #[must_use]
    pub fn scope_id(&self) -> Option<u32> {
        self.scope_id
    }

    /// The interface this address is scoped to, if it is still alive
    #[must_use]
    pub fn scoped_interface(&self) -> Option<Arc<NetworkInterface>> {
        self.scoped_interface.as_ref().and_then(Weak::upgrade)
    }

    /// The memoized hostname, if known
    #[must_use]
    pub fn host_name(&self) -> Option<&str> {
        self.host_name.get().map(String::as_str)
    }

    pub(crate) fn remember_host_name(&self, host_name: String) -> &str {
        self.host_name.get_or_init(|| host_name)
    }

    /// Returns the embedded IPv4 address of an IPv4-mapped address (`::ffff:a.b.c.d`)
    #[must_use]
    pub fn to_ipv4_mapped(&self) -> Option<[u8; 4]> {
        let o = &self.octets;
        if o[..10].iter().all(|b| *b == 0) && o[10] == 0xFF && o[11] == 0xFF {
            Some([o[12], o[13], o[14], o[15]])
        } else {
            None
        }
    }

    /// IPv4-compatible address (`::a.b.c.d`, deprecated form)
    #[must_use]
    pub fn is_ipv4_compatible(&self) -> bool {
        self.octets[..12].iter().all(|b| *b == 0)
    }

    #[must_use]
    pub fn is_any_local(&self) -> bool {
        self.octets.iter().all(|b| *b == 0)
    }

    #[must_use]
    pub fn is_loopback(&self) -> bool {
        self.octets[..15].iter().all(|b| *b == 0) && self.octets[15] == 1
    }

    /// `fe80::/10`
    #[must_use]
    pub fn is_link_local(&self) -> bool {
        self.octets[0] == 0xFE && (self.octets[1] & 0xC0) == 0x80
    }

    /// `fec0::/10`
    #[must_use]
    pub fn is_site_local(&self) -> bool {
        self.octets[0] == 0xFE && (self.octets[1] & 0xC0) == 0xC0
    }

    #[must_use]
    pub fn is_multicast(&self) -> bool {
        self.octets[0] == 0xFF
    }

    fn multicast_scope(&self) -> Option<u8> {
        self.is_multicast().then_some(self.octets[1] & 0x0F)
    }

    #[must_use]
    pub fn is_mc_node_local(&self) -> bool {
        self.multicast_scope() == Some(0x1)
    }

    #[must_use]
    pub fn is_mc_link_local(&self) -> bool {
        self.multicast_scope() == Some(0x2)
    }

    #[must_use]
    pub fn is_mc_site_local(&self) -> bool {
        self.multicast_scope() == Some(0x5)
    }

    #[must_use]
    pub fn is_mc_org_local(&self) -> bool {
        self.multicast_scope() == Some(0x8)
    }

    #[must_use]
    pub fn is_mc_global(&self) -> bool {
        self.multicast_scope() == Some(0xE)
    }
}

// Scope is not part of equality; two spellings of fe80::1 on different
// interfaces compare equal.
impl PartialEq for Inet6Address {
    fn eq(&self, other: &Self) -> bool {
        self.octets == other.octets
    }
}

impl Eq for Inet6Address {}

impl Hash for Inet6Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.octets.hash(state);
    }
}

impl fmt::Display for Inet6Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Ipv6Addr::from(self.octets))?;
        if let Some(interface) = self.scoped_interface() {
            write!(f, "%{}", interface.name())
        } else if let Some(scope_id) = self.scope_id {
            write!(f, "%{scope_id}")
        } else {
            Ok(())
        }
    }
}

impl From<Ipv6Addr> for Inet6Address {
    fn from(addr: Ipv6Addr) -> Self {
        Self::new(addr.octets())
    }
}

impl From<&Inet6Address> for Ipv6Addr {
    fn from(addr: &Inet6Address) -> Self {
        Ipv6Addr::from(addr.octets)
    }
}
