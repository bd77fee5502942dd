//! Name system collaborators
//!
//! A [`NameSystem`] turns hostnames into raw address bytes and back. The
//! resolver never talks to DNS directly; it goes through this trait so tests
//! can substitute [`MockNameSystem`].

use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::fmt::Debug;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use socket2::SockAddr;
use tracing::trace;

use crate::addr::IpAddress;
use crate::error::{InetError, InetResult};

/// Buffer size for `getnameinfo` host output (glibc `NI_MAXHOST`)
const MAX_HOST_LEN: usize = 1025;

/// Forward and reverse name resolution
#[async_trait]
pub trait NameSystem: Send + Sync + Debug {
    /// Resolve a hostname into raw 4- or 16-byte addresses
    ///
    /// # Errors
    ///
    /// Returns `InetError::UnknownHost` if the name does not resolve, and
    /// `InetError::Io` for failures that say nothing about the name (the
    /// resolver is unreachable or answered "try again").
    async fn lookup(&self, host: &str) -> InetResult<Vec<Vec<u8>>>;

    /// Resolve raw address bytes into a hostname
    ///
    /// # Errors
    ///
    /// Returns `InetError::UnknownHost` if there is no name for the address.
    async fn reverse_lookup(&self, addr: &[u8]) -> InetResult<String>;

    /// Name of the local host
    ///
    /// # Errors
    ///
    /// Returns `InetError::Io` if the platform call fails.
    fn local_host_name(&self) -> InetResult<String>;
}

/// Name system backed by the platform resolver (`getaddrinfo` / `getnameinfo`)
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemNameSystem;

impl SystemNameSystem {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Whether a `getaddrinfo` result code says the name has no addresses
///
/// Every other code (temporary failure, resolver misconfiguration, system
/// error) is a transport failure and must not be cached as a negative result.
fn is_name_not_found(code: libc::c_int) -> bool {
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    if code == libc::EAI_NODATA {
        return true;
    }
    code == libc::EAI_NONAME
}

fn gai_error(host: &str, code: libc::c_int) -> InetError {
    if is_name_not_found(code) {
        return InetError::unknown_host(host);
    }
    if code == libc::EAI_SYSTEM {
        return io::Error::last_os_error().into();
    }

    // SAFETY: gai_strerror returns a pointer to a static NUL-terminated string.
    let message = unsafe { CStr::from_ptr(libc::gai_strerror(code)) }.to_string_lossy();
    let kind = if code == libc::EAI_AGAIN {
        io::ErrorKind::WouldBlock
    } else {
        io::ErrorKind::Other
    };
    io::Error::new(kind, format!("getaddrinfo({host}): {message}")).into()
}

/// Raw bytes of an `AF_INET` / `AF_INET6` socket address
///
/// # Safety
///
/// `addr` must point to a socket address of the given family.
unsafe fn sockaddr_octets(addr: *const libc::sockaddr, family: libc::c_int) -> Option<Vec<u8>> {
    match family {
        libc::AF_INET => {
            let v4 = &*addr.cast::<libc::sockaddr_in>();
            Some(v4.sin_addr.s_addr.to_ne_bytes().to_vec())
        }
        libc::AF_INET6 => {
            let v6 = &*addr.cast::<libc::sockaddr_in6>();
            Some(v6.sin6_addr.s6_addr.to_vec())
        }
        _ => None,
    }
}

/// Blocking `getaddrinfo`, de-duplicated in the order returned
fn addr_info(host: &str) -> InetResult<Vec<Vec<u8>>> {
    let c_host = CString::new(host).map_err(|_| InetError::unknown_host(host))?;

    // SAFETY: an all-zero addrinfo is a valid "no hints" value.
    let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
    hints.ai_family = libc::AF_UNSPEC;
    hints.ai_socktype = libc::SOCK_STREAM;

    let mut head: *mut libc::addrinfo = std::ptr::null_mut();
    // SAFETY: c_host is NUL-terminated, hints is initialized, and on success
    // `head` owns a list that is freed below.
    let rc = unsafe { libc::getaddrinfo(c_host.as_ptr(), std::ptr::null(), &hints, &mut head) };
    if rc != 0 {
        trace!("getaddrinfo({}) failed with code {}", host, rc);
        return Err(gai_error(host, rc));
    }

    let mut addresses: Vec<Vec<u8>> = Vec::new();
    let mut cursor = head;
    while !cursor.is_null() {
        // SAFETY: cursor walks the list returned by getaddrinfo.
        let info = unsafe { &*cursor };
        if !info.ai_addr.is_null() {
            // SAFETY: ai_addr points to an address of family ai_family.
            if let Some(bytes) = unsafe { sockaddr_octets(info.ai_addr, info.ai_family) } {
                if !addresses.contains(&bytes) {
                    addresses.push(bytes);
                }
            }
        }
        cursor = info.ai_next;
    }
    // SAFETY: head came from a successful getaddrinfo and is freed once.
    unsafe { libc::freeaddrinfo(head) };

    if addresses.is_empty() {
        return Err(InetError::unknown_host(host));
    }
    Ok(addresses)
}

fn name_info(addr: IpAddr) -> io::Result<String> {
    let sockaddr = SockAddr::from(SocketAddr::new(addr, 0));
    let mut host = [0 as libc::c_char; MAX_HOST_LEN];

    // SAFETY: sockaddr is a valid socket address of the reported length and
    // `host` is writable for its full length.
    let rc = unsafe {
        libc::getnameinfo(
            sockaddr.as_ptr(),
            sockaddr.len(),
            host.as_mut_ptr(),
            host.len() as libc::socklen_t,
            std::ptr::null_mut(),
            0,
            libc::NI_NAMEREQD,
        )
    };
    if rc != 0 {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("getnameinfo failed with code {rc}"),
        ));
    }

    // SAFETY: getnameinfo NUL-terminates the output on success.
    Ok(unsafe { CStr::from_ptr(host.as_ptr()) }
        .to_string_lossy()
        .into_owned())
}

#[async_trait]
impl NameSystem for SystemNameSystem {
    async fn lookup(&self, host: &str) -> InetResult<Vec<Vec<u8>>> {
        let owned = host.to_string();
        tokio::task::spawn_blocking(move || addr_info(&owned))
            .await
            .map_err(|e| InetError::Io(io::Error::new(io::ErrorKind::Other, e)))?
    }

    async fn reverse_lookup(&self, addr: &[u8]) -> InetResult<String> {
        let ip = IpAddress::from_bytes(addr)?.to_std();
        tokio::task::spawn_blocking(move || name_info(ip))
            .await
            .map_err(|e| InetError::Io(io::Error::new(io::ErrorKind::Other, e)))?
            .map_err(|_| InetError::unknown_host(ip.to_string()))
    }

    fn local_host_name(&self) -> InetResult<String> {
        let mut buf = [0 as libc::c_char; 256];
        // SAFETY: buf is writable for its full length; the last byte is left
        // as NUL so the result is always terminated.
        let rc = unsafe { libc::gethostname(buf.as_mut_ptr(), buf.len() - 1) };
        if rc != 0 {
            return Err(io::Error::last_os_error().into());
        }
        // SAFETY: buf is NUL-terminated (see above).
        Ok(unsafe { CStr::from_ptr(buf.as_ptr()) }
            .to_string_lossy()
            .into_owned())
    }
}

/// In-memory name system with call counters
///
/// # Example
///
/// ```
/// use rust_inet::resolver::MockNameSystem;
///
/// let names = MockNameSystem::new();
/// names.insert("db.internal", &["10.0.0.5"]);
/// assert_eq!(names.lookup_calls(), 0);
/// ```
#[derive(Debug, Default)]
pub struct MockNameSystem {
    forward: Mutex<HashMap<String, Vec<Vec<u8>>>>,
    reverse: Mutex<HashMap<Vec<u8>, String>>,
    local_name: Mutex<Option<String>>,
    lookup_failure: Mutex<Option<io::ErrorKind>>,
    lookup_calls: AtomicU64,
    reverse_calls: AtomicU64,
}

impl MockNameSystem {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register forward results, given as address literals
    ///
    /// # Panics
    ///
    /// Panics if a literal does not parse; this type is a test fixture.
    pub fn insert(&self, host: &str, literals: &[&str]) {
        let bytes = literals
            .iter()
            .map(|l| {
                l.parse::<IpAddr>()
                    .map(|ip| IpAddress::from(ip).to_bytes())
                    .unwrap_or_else(|_| panic!("invalid literal {l}"))
            })
            .collect();
        self.insert_raw(host, bytes);
    }

    /// Register forward results as raw bytes
    pub fn insert_raw(&self, host: &str, addresses: Vec<Vec<u8>>) {
        self.forward
            .lock()
            .insert(host.to_ascii_lowercase(), addresses);
    }

    /// Register a reverse mapping
    pub fn insert_reverse(&self, addr: &IpAddress, host: &str) {
        self.reverse.lock().insert(addr.to_bytes(), host.to_string());
    }

    /// Set the local host name
    pub fn set_local_host_name(&self, host: &str) {
        *self.local_name.lock() = Some(host.to_string());
    }

    /// Make forward lookups fail with an I/O error of `kind`; `None` restores
    /// normal answers
    pub fn set_lookup_failure(&self, kind: Option<io::ErrorKind>) {
        *self.lookup_failure.lock() = kind;
    }

    /// Number of forward lookups performed
    #[must_use]
    pub fn lookup_calls(&self) -> u64 {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    /// Number of reverse lookups performed
    #[must_use]
    pub fn reverse_calls(&self) -> u64 {
        self.reverse_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NameSystem for MockNameSystem {
    async fn lookup(&self, host: &str) -> InetResult<Vec<Vec<u8>>> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(kind) = *self.lookup_failure.lock() {
            return Err(io::Error::new(kind, "name server unavailable (mock)").into());
        }
        self.forward
            .lock()
            .get(&host.to_ascii_lowercase())
            .filter(|addrs| !addrs.is_empty())
            .cloned()
            .ok_or_else(|| InetError::unknown_host(host))
    }

    async fn reverse_lookup(&self, addr: &[u8]) -> InetResult<String> {
        self.reverse_calls.fetch_add(1, Ordering::SeqCst);
        self.reverse
            .lock()
            .get(addr)
            .cloned()
            .ok_or_else(|| InetError::unknown_host(format!("{addr:?}")))
    }

    fn local_host_name(&self) -> InetResult<String> {
        self.local_name
            .lock()
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no local host name").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_lookup() {
        let names = MockNameSystem::new();
        names.insert("Example.org", &["192.0.2.1", "2001:db8::1"]);

        let addrs = names.lookup("example.org").await.unwrap();
        assert_eq!(addrs.len(), 2);
        assert_eq!(addrs[0], vec![192, 0, 2, 1]);
        assert_eq!(addrs[1].len(), 16);

        let err = names.lookup("missing.invalid").await.unwrap_err();
        assert!(err.is_unknown_host());
        assert_eq!(names.lookup_calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_reverse() {
        let names = MockNameSystem::new();
        let addr: IpAddress = "192.0.2.1".parse().unwrap();
        names.insert_reverse(&addr, "host.example");
        assert_eq!(names.reverse_lookup(&addr.to_bytes()).await.unwrap(), "host.example");
        assert!(names.reverse_lookup(&[10, 0, 0, 1]).await.is_err());
    }

    #[tokio::test]
    async fn test_system_lookup_localhost() {
        let addrs = SystemNameSystem::new().lookup("localhost").await.unwrap();
        assert!(!addrs.is_empty());
        assert!(addrs.iter().all(|a| a.len() == 4 || a.len() == 16));
    }

    #[test]
    fn test_gai_error_classification() {
        assert!(gai_error("gone.example", libc::EAI_NONAME).is_unknown_host());

        let again = gai_error("flaky.example", libc::EAI_AGAIN);
        assert!(!again.is_unknown_host());
        assert!(again.is_recoverable());
        assert!(again.to_string().contains("flaky.example"));

        assert!(matches!(gai_error("broken.example", libc::EAI_FAIL), InetError::Io(_)));
    }

    #[tokio::test]
    async fn test_system_lookup_rejects_interior_nul() {
        let err = SystemNameSystem::new().lookup("bad\0host").await.unwrap_err();
        assert!(err.is_unknown_host());
    }

    #[test]
    fn test_system_local_host_name() {
        let name = SystemNameSystem::new().local_host_name().unwrap();
        assert!(!name.is_empty());
    }
}
