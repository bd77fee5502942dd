//! IPv4 address
//!
//! Classification predicates are evaluated purely from the four octets.
//!
//! | Predicate | Range |
//! |-----------|-------|
//! | any-local | `0.0.0.0` |
//! | loopback | `127.0.0.0/8` |
//! | link-local | `169.254.0.0/16` |
//! | site-local | `10.0.0.0/8`, `172.16.0.0/12`, `192.168.0.0/16` |
//! | multicast | `224.0.0.0/4` |
//! | mc-global | `224.0.1.0` - `238.255.255.255` |
//! | mc-link-local | `224.0.0.0/24` |
//! | mc-site-local | `239.255.0.0/16` |
//! | mc-org-local | `239.192.0.0/14` |

use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::Ipv4Addr;
use std::sync::OnceLock;

/// An IPv4 address with an optional memoized hostname
///
/// Equality and hashing use the octets only.
///
/// # Example
///
/// ```
/// use rust_inet::addr::Inet4Address;
///
/// let addr = Inet4Address::new([224, 0, 0, 1]);
/// assert!(addr.is_multicast());
/// assert!(addr.is_mc_link_local());
/// assert!(!addr.is_mc_global());
/// ```
#[derive(Debug, Clone)]
pub struct Inet4Address {
    octets: [u8; 4],
    host_name: OnceLock<String>,
}

impl Inet4Address {
    /// Number of octets in an IPv4 address
    pub const LEN: usize = 4;

    /// Create an address from its octets
    #[must_use]
    pub fn new(octets: [u8; 4]) -> Self {
        Self {
            octets,
            host_name: OnceLock::new(),
        }
    }

    /// Create an address that already knows its hostname
    #[must_use]
    pub fn with_host_name(host_name: impl Into<String>, octets: [u8; 4]) -> Self {
        let addr = Self::new(octets);
        let _ = addr.host_name.set(host_name.into());
        addr
    }

    /// `0.0.0.0`
    #[must_use]
    pub fn any() -> Self {
        Self::new([0, 0, 0, 0])
    }

    /// `127.0.0.1`, named `localhost`
    #[must_use]
    pub fn loopback() -> Self {
        Self::with_host_name("localhost", [127, 0, 0, 1])
    }

    /// The raw octets
    #[must_use]
    pub fn octets(&self) -> [u8; 4] {
        self.octets
    }

    /// The octets as a big-endian integer
    #[must_use]
    pub fn to_bits(&self) -> u32 {
        u32::from_be_bytes(self.octets)
    }

    /// The memoized hostname, if known
    #[must_use]
    pub fn host_name(&self) -> Option<&str> {
        self.host_name.get().map(String::as_str)
    }

    /// Memoize a hostname; the first stored value wins
    pub(crate) fn remember_host_name(&self, host_name: String) -> &str {
        self.host_name.get_or_init(|| host_name)
    }

    #[must_use]
    pub fn is_any_local(&self) -> bool {
        self.octets == [0, 0, 0, 0]
    }

    #[must_use]
    pub fn is_loopback(&self) -> bool {
        self.octets[0] == 127
    }

    #[must_use]
    pub fn is_link_local(&self) -> bool {
        self.octets[0] == 169 && self.octets[1] == 254
    }

    #[must_use]
    pub fn is_site_local(&self) -> bool {
        let [a, b, ..] = self.octets;
        a == 10 || (a == 172 && (b & 0xF0) == 16) || (a == 192 && b == 168)
    }

    #[must_use]
    pub fn is_multicast(&self) -> bool {
        (self.octets[0] & 0xF0) == 0xE0
    }

    /// Globally scoped multicast: 224.0.1.0 through 238.255.255.255
    #[must_use]
    pub fn is_mc_global(&self) -> bool {
        let [a, b, c, _] = self.octets;
        (224..=238).contains(&a) && !(a == 224 && b == 0 && c == 0)
    }

    /// IPv4 has no node-local multicast scope
    #[must_use]
    pub fn is_mc_node_local(&self) -> bool {
        false
    }

    #[must_use]
    pub fn is_mc_link_local(&self) -> bool {
        let [a, b, c, _] = self.octets;
        a == 224 && b == 0 && c == 0
    }

    #[must_use]
    pub fn is_mc_site_local(&self) -> bool {
        self.octets[0] == 239 && self.octets[1] == 255
    }

    #[must_use]
    pub fn is_mc_org_local(&self) -> bool {
        self.octets[0] == 239 && (192..=195).contains(&self.octets[1])
    }
}

impl PartialEq for Inet4Address {
    fn eq(&self, other: &Self) -> bool {
        self.octets == other.octets
    }
}

impl Eq for Inet4Address {}

impl Hash for Inet4Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.octets.hash(state);
    }
}

impl fmt::Display for Inet4Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.octets;
        write!(f, "{a}.{b}.{c}.{d}")
    }
}

impl From<Ipv4Addr> for Inet4Address {
    fn from(addr: Ipv4Addr) -> Self {
        Self::new(addr.octets())
    }
}

impl From<&Inet4Address> for Ipv4Addr {
    fn from(addr: &Inet4Address) -> Self {
        Ipv4Addr::from(addr.octets)
    }
}
