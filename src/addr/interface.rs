//! Network interface snapshots and enumeration
//!
//! A [`NetworkInterface`] is an immutable snapshot produced by an
//! [`InterfaceEnumerator`]. Snapshots are not cached: every `list()` call
//! re-enumerates.
//!
//! IPv6 addresses that carry a scope id are linked back to their interface
//! through a weak reference, so dropping the snapshot never leaks.

use std::ffi::{CStr, CString};
use std::fmt::Debug;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::trace;

use super::{Inet4Address, Inet6Address, IpAddress};
use crate::error::InetResult;

/// An immutable network interface snapshot
///
/// Equality compares index, name, and the ordered address list.
#[derive(Debug)]
pub struct NetworkInterface {
    name: String,
    display_name: String,
    index: u32,
    addresses: Vec<IpAddress>,
}

impl NetworkInterface {
    /// Create a snapshot; the display name defaults to the name
    ///
    /// IPv6 addresses with a scope id are re-scoped to the new interface.
    #[must_use]
    pub fn new(name: impl Into<String>, index: u32, addresses: Vec<IpAddress>) -> Arc<Self> {
        let name = name.into();
        let display_name = name.clone();
        Self::with_display_name(name, display_name, index, addresses)
    }

    /// Create a snapshot with a separate display name
    #[must_use]
    pub fn with_display_name(
        name: impl Into<String>,
        display_name: impl Into<String>,
        index: u32,
        addresses: Vec<IpAddress>,
    ) -> Arc<Self> {
        let name = name.into();
        let display_name = display_name.into();
        Arc::new_cyclic(|weak| {
            let addresses = addresses
                .into_iter()
                .map(|addr| match addr {
                    IpAddress::V6(v6) if v6.scope_id().is_some() => {
                        IpAddress::V6(Inet6Address::scoped_to(v6.octets(), index, weak.clone()))
                    }
                    other => other,
                })
                .collect();
            Self {
                name,
                display_name,
                index,
                addresses,
            }
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Kernel index; 0 means unknown
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Bound addresses, in enumeration order
    #[must_use]
    pub fn addresses(&self) -> &[IpAddress] {
        &self.addresses
    }

    /// True if every bound address is a loopback address
    #[must_use]
    pub fn is_loopback(&self) -> bool {
        !self.addresses.is_empty() && self.addresses.iter().all(IpAddress::is_loopback)
    }
}

impl PartialEq for NetworkInterface {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.name == other.name && self.addresses == other.addresses
    }
}

impl Eq for NetworkInterface {}

/// Platform interface enumeration
pub trait InterfaceEnumerator: Send + Sync + Debug {
    /// Enumerate all interfaces
    ///
    /// # Errors
    ///
    /// Returns `InetError::Io` if the platform call fails.
    fn list(&self) -> InetResult<Vec<Arc<NetworkInterface>>>;

    /// Find an interface by name
    ///
    /// # Errors
    ///
    /// Propagates enumeration failures.
    fn by_name(&self, name: &str) -> InetResult<Option<Arc<NetworkInterface>>> {
        Ok(self.list()?.into_iter().find(|i| i.name() == name))
    }

    /// Find an interface by kernel index
    ///
    /// # Errors
    ///
    /// Propagates enumeration failures.
    fn by_index(&self, index: u32) -> InetResult<Option<Arc<NetworkInterface>>> {
        Ok(self.list()?.into_iter().find(|i| i.index() == index))
    }

    /// Find the interface an address is bound to
    ///
    /// # Errors
    ///
    /// Propagates enumeration failures.
    fn by_address(&self, addr: &IpAddress) -> InetResult<Option<Arc<NetworkInterface>>> {
        Ok(self
            .list()?
            .into_iter()
            .find(|i| i.addresses().contains(addr)))
    }

    /// All addresses bound on this machine
    ///
    /// # Errors
    ///
    /// Propagates enumeration failures.
    fn local_addresses(&self) -> InetResult<Vec<IpAddress>> {
        Ok(self
            .list()?
            .iter()
            .flat_map(|i| i.addresses().iter().cloned())
            .collect())
    }
}

/// Interface enumeration backed by `getifaddrs(3)`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInterfaces;

impl SystemInterfaces {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn interface_index(name: &str) -> u32 {
        CString::new(name)
            // SAFETY: the pointer is a valid NUL-terminated string for the call.
            .map(|c| unsafe { libc::if_nametoindex(c.as_ptr()) })
            .unwrap_or(0)
    }
}

impl InterfaceEnumerator for SystemInterfaces {
    fn list(&self) -> InetResult<Vec<Arc<NetworkInterface>>> {
        let mut head: *mut libc::ifaddrs = std::ptr::null_mut();
        // SAFETY: getifaddrs initializes `head` on success; it is freed below.
        if unsafe { libc::getifaddrs(&mut head) } != 0 {
            return Err(io::Error::last_os_error().into());
        }

        let mut grouped: Vec<(String, Vec<IpAddress>)> = Vec::new();
        let mut cursor = head;
        while !cursor.is_null() {
            // SAFETY: cursor is a live node of the list returned by getifaddrs.
            let entry = unsafe { &*cursor };
            cursor = entry.ifa_next;

            if entry.ifa_name.is_null() {
                continue;
            }
            // SAFETY: ifa_name is a NUL-terminated string owned by the list.
            let name = unsafe { CStr::from_ptr(entry.ifa_name) }
                .to_string_lossy()
                .into_owned();
            let slot = match grouped.iter().position(|(n, _)| *n == name) {
                Some(i) => i,
                None => {
                    grouped.push((name, Vec::new()));
                    grouped.len() - 1
                }
            };

            if entry.ifa_addr.is_null() {
                continue;
            }
            // SAFETY: ifa_addr is non-null and points at a sockaddr of the family it reports.
            let family = i32::from(unsafe { (*entry.ifa_addr).sa_family });
            let addr = match family {
                libc::AF_INET => {
                    // SAFETY: family is AF_INET, so this is a sockaddr_in.
                    let sin = unsafe { &*entry.ifa_addr.cast::<libc::sockaddr_in>() };
                    IpAddress::V4(Inet4Address::new(sin.sin_addr.s_addr.to_ne_bytes()))
                }
                libc::AF_INET6 => {
                    // SAFETY: family is AF_INET6, so this is a sockaddr_in6.
                    let sin6 = unsafe { &*entry.ifa_addr.cast::<libc::sockaddr_in6>() };
                    let octets = sin6.sin6_addr.s6_addr;
                    if sin6.sin6_scope_id == 0 {
                        IpAddress::V6(Inet6Address::new(octets))
                    } else {
                        IpAddress::V6(Inet6Address::with_scope_id(octets, sin6.sin6_scope_id))
                    }
                }
                _ => continue,
            };
            grouped[slot].1.push(addr);
        }

        // SAFETY: head came from a successful getifaddrs and is freed exactly once.
        unsafe { libc::freeifaddrs(head) };

        let interfaces: Vec<_> = grouped
            .into_iter()
            .map(|(name, addresses)| {
                let index = Self::interface_index(&name);
                NetworkInterface::new(name, index, addresses)
            })
            .collect();

        trace!("Enumerated {} interfaces", interfaces.len());
        Ok(interfaces)
    }
}

/// Fixed interface list for tests and embedded use
///
/// Counts `list()` calls so tests can verify enumeration happened.
#[derive(Debug, Default)]
pub struct StaticInterfaces {
    interfaces: Vec<Arc<NetworkInterface>>,
    list_calls: AtomicU64,
}

impl StaticInterfaces {
    /// Create an enumerator returning the given interfaces
    #[must_use]
    pub fn new(interfaces: Vec<Arc<NetworkInterface>>) -> Self {
        Self {
            interfaces,
            list_calls: AtomicU64::new(0),
        }
    }

    /// A single `lo` interface holding `127.0.0.1` and `::1`
    #[must_use]
    pub fn loopback_only() -> Self {
        Self::new(vec![NetworkInterface::new(
            "lo",
            1,
            vec![IpAddress::loopback_v4(), IpAddress::loopback_v6()],
        )])
    }

    /// Number of `list()` calls so far
    #[must_use]
    pub fn list_calls(&self) -> u64 {
        self.list_calls.load(Ordering::Relaxed)
    }
}

impl InterfaceEnumerator for StaticInterfaces {
    fn list(&self) -> InetResult<Vec<Arc<NetworkInterface>>> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.interfaces.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eth0() -> Arc<NetworkInterface> {
        NetworkInterface::new(
            "eth0",
            2,
            vec![
                "192.0.2.10".parse().unwrap(),
                "fe80::10%9".parse().unwrap(),
            ],
        )
    }

    #[test]
    fn test_scoped_addresses_link_back() {
        let iface = eth0();
        let IpAddress::V6(v6) = &iface.addresses()[1] else {
            panic!("expected v6");
        };
        assert_eq!(v6.scope_id(), Some(2));
        let owner = v6.scoped_interface().unwrap();
        assert_eq!(owner.name(), "eth0");
    }

    #[test]
    fn test_equality_is_order_sensitive() {
        let a = NetworkInterface::new(
            "eth0",
            2,
            vec!["10.0.0.1".parse().unwrap(), "10.0.0.2".parse().unwrap()],
        );
        let b = NetworkInterface::new(
            "eth0",
            2,
            vec!["10.0.0.2".parse().unwrap(), "10.0.0.1".parse().unwrap()],
        );
        let c = NetworkInterface::new(
            "eth0",
            2,
            vec!["10.0.0.1".parse().unwrap(), "10.0.0.2".parse().unwrap()],
        );
        assert_ne!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_static_lookups() {
        let enumerator = StaticInterfaces::new(vec![eth0()]);
        assert!(enumerator.by_name("eth0").unwrap().is_some());
        assert!(enumerator.by_name("wlan0").unwrap().is_none());
        assert_eq!(enumerator.by_index(2).unwrap().unwrap().name(), "eth0");

        let addr: IpAddress = "192.0.2.10".parse().unwrap();
        assert!(enumerator.by_address(&addr).unwrap().is_some());
        assert_eq!(enumerator.local_addresses().unwrap().len(), 2);
        assert_eq!(enumerator.list_calls(), 5);
    }

    #[test]
    fn test_loopback_only() {
        let enumerator = StaticInterfaces::loopback_only();
        let list = enumerator.list().unwrap();
        assert_eq!(list.len(), 1);
        assert!(list[0].is_loopback());
    }

    #[test]
    fn test_system_interfaces_enumerates() {
        // Every Linux host has at least a loopback interface.
        let interfaces = SystemInterfaces::new().list().unwrap();
        assert!(interfaces.iter().any(|i| i.is_loopback() || i.name() == "lo"));
    }
}
