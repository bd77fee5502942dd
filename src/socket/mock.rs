//! In-memory I/O provider for tests
//!
//! [`MockIoProvider`] performs no real I/O. It hands out handles, records
//! every connect attempt, and answers connects with a configurable
//! [`ConnectOutcome`] per destination address.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::provider::{IoProvider, SocketHandle, SocketKind};
use crate::addr::{IpAddress, SocketAddress};
use crate::error::{InetError, InetResult};

/// Ephemeral ports handed out by the mock start here
const EPHEMERAL_BASE: u16 = 40000;

/// How the mock answers a connect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectOutcome {
    /// The connect succeeds
    #[default]
    Accept,
    /// The peer answers with a reset (`ECONNREFUSED`)
    Refuse,
    /// No route to the destination
    Unreachable,
    /// Nothing answers before the deadline
    TimeOut,
}

impl ConnectOutcome {
    fn into_result(self) -> io::Result<()> {
        match self {
            Self::Accept => Ok(()),
            Self::Refuse => Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused (mock)",
            )),
            Self::Unreachable => Err(io::Error::from_raw_os_error(libc::ENETUNREACH)),
            Self::TimeOut => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "connect timed out (mock)",
            )),
        }
    }
}

/// One recorded connect attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectAttempt {
    pub handle: SocketHandle,
    /// Local address the socket was bound to, if any
    pub source: Option<SocketAddress>,
    pub target: SocketAddress,
    /// Proxy used for the attempt, if any
    pub proxy: Option<SocketAddress>,
    /// Hop limit set before the attempt, if any
    pub ttl: Option<u32>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Default)]
struct MockSocket {
    local: Option<SocketAddress>,
    peer: Option<SocketAddress>,
    ttl: Option<u32>,
}

/// Mock I/O provider with connect outcomes and call recording
///
/// # Example
///
/// ```
/// use rust_inet::socket::{ConnectOutcome, MockIoProvider};
///
/// let provider = MockIoProvider::new();
/// provider.set_default_outcome(ConnectOutcome::Refuse);
/// assert_eq!(provider.connect_attempts(), 0);
/// ```
#[derive(Debug, Default)]
pub struct MockIoProvider {
    sockets: Mutex<HashMap<SocketHandle, MockSocket>>,
    default_outcome: Mutex<ConnectOutcome>,
    outcomes: Mutex<HashMap<IpAddress, ConnectOutcome>>,
    attempts: Mutex<Vec<ConnectAttempt>>,
    closed: Mutex<HashSet<SocketHandle>>,
    incoming: Mutex<VecDeque<(Vec<u8>, SocketAddress)>>,
    sent: Mutex<Vec<(SocketHandle, Vec<u8>, Option<SocketAddress>)>>,
    /// Artificial connect delay (milliseconds)
    connect_delay_ms: AtomicU64,
    next_id: AtomicU64,
}

impl MockIoProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcome for destinations without a specific outcome
    pub fn set_default_outcome(&self, outcome: ConnectOutcome) {
        *self.default_outcome.lock() = outcome;
    }

    /// Outcome for connects to `ip`
    pub fn set_outcome(&self, ip: IpAddress, outcome: ConnectOutcome) {
        self.outcomes.lock().insert(ip, outcome);
    }

    /// Make every connect wait before answering
    pub fn set_connect_delay(&self, delay_ms: u64) {
        self.connect_delay_ms.store(delay_ms, Ordering::SeqCst);
    }

    /// Queue a datagram or stream chunk for the next receive
    pub fn push_incoming(&self, data: &[u8], from: SocketAddress) {
        self.incoming.lock().push_back((data.to_vec(), from));
    }

    /// Number of connect attempts seen
    #[must_use]
    pub fn connect_attempts(&self) -> usize {
        self.attempts.lock().len()
    }

    /// All connect attempts seen, in order
    #[must_use]
    pub fn attempts(&self) -> Vec<ConnectAttempt> {
        self.attempts.lock().clone()
    }

    /// Payloads sent, with the explicit target for `send_to`
    #[must_use]
    pub fn sent(&self) -> Vec<(SocketHandle, Vec<u8>, Option<SocketAddress>)> {
        self.sent.lock().clone()
    }

    /// Whether `close` was called for the handle
    #[must_use]
    pub fn is_closed(&self, handle: SocketHandle) -> bool {
        self.closed.lock().contains(&handle)
    }

    /// Peer a handle is currently connected to
    #[must_use]
    pub fn peer_of(&self, handle: SocketHandle) -> Option<SocketAddress> {
        self.sockets.lock().get(&handle).and_then(|s| s.peer.clone())
    }

    /// Number of handles closed
    #[must_use]
    pub fn closed_count(&self) -> usize {
        self.closed.lock().len()
    }

    fn ephemeral_port(handle: SocketHandle) -> u16 {
        EPHEMERAL_BASE.wrapping_add((handle.id() % 20000) as u16)
    }

    fn check_open(&self, handle: SocketHandle) -> InetResult<()> {
        if self.closed.lock().contains(&handle) || !self.sockets.lock().contains_key(&handle) {
            return Err(io::Error::new(io::ErrorKind::NotFound, format!("handle {handle} not open")).into());
        }
        Ok(())
    }

    async fn attempt(
        &self,
        handle: SocketHandle,
        remote: &SocketAddress,
        proxy: Option<&SocketAddress>,
        timeout: Option<Duration>,
    ) -> InetResult<SocketAddress> {
        self.check_open(handle)?;

        let (source, ttl) = {
            let sockets = self.sockets.lock();
            let socket = sockets.get(&handle);
            (socket.and_then(|s| s.local.clone()), socket.and_then(|s| s.ttl))
        };
        self.attempts.lock().push(ConnectAttempt {
            handle,
            source: source.clone(),
            target: remote.clone(),
            proxy: proxy.cloned(),
            ttl,
            timeout,
        });

        let delay = self.connect_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let outcome = self
            .outcomes
            .lock()
            .get(remote.ip())
            .copied()
            .unwrap_or_else(|| *self.default_outcome.lock());
        outcome.into_result()?;

        let local = source.unwrap_or_else(|| {
            SocketAddress::new(IpAddress::any(remote.ip().family()), Self::ephemeral_port(handle))
        });
        if let Some(socket) = self.sockets.lock().get_mut(&handle) {
            socket.local = Some(local.clone());
            socket.peer = Some(remote.clone());
        }
        Ok(local)
    }
}

#[async_trait]
impl IoProvider for MockIoProvider {
    fn create(&self, _kind: SocketKind) -> InetResult<SocketHandle> {
        let handle = SocketHandle::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.sockets.lock().insert(handle, MockSocket::default());
        Ok(handle)
    }

    fn bind(&self, handle: SocketHandle, local: &SocketAddress) -> InetResult<SocketAddress> {
        self.check_open(handle)?;
        let bound = if local.port() == 0 {
            SocketAddress::new(local.ip().clone(), Self::ephemeral_port(handle))
        } else {
            local.clone()
        };
        if let Some(socket) = self.sockets.lock().get_mut(&handle) {
            socket.local = Some(bound.clone());
        }
        Ok(bound)
    }

    async fn connect(
        &self,
        handle: SocketHandle,
        remote: &SocketAddress,
        timeout: Option<Duration>,
    ) -> InetResult<SocketAddress> {
        self.attempt(handle, remote, None, timeout).await
    }

    async fn connect_via_proxy(
        &self,
        handle: SocketHandle,
        proxy: &SocketAddress,
        remote: &SocketAddress,
        timeout: Option<Duration>,
    ) -> InetResult<SocketAddress> {
        self.attempt(handle, remote, Some(proxy), timeout).await
    }

    fn disconnect(&self, handle: SocketHandle) -> InetResult<()> {
        self.check_open(handle)?;
        if let Some(socket) = self.sockets.lock().get_mut(&handle) {
            socket.peer = None;
        }
        Ok(())
    }

    fn close(&self, handle: SocketHandle) {
        self.closed.lock().insert(handle);
    }

    fn shutdown_input(&self, handle: SocketHandle) -> InetResult<()> {
        self.check_open(handle)
    }

    fn shutdown_output(&self, handle: SocketHandle) -> InetResult<()> {
        self.check_open(handle)
    }

    fn set_ttl(&self, handle: SocketHandle, ttl: u32) -> InetResult<()> {
        self.check_open(handle)?;
        if let Some(socket) = self.sockets.lock().get_mut(&handle) {
            socket.ttl = Some(ttl);
        }
        Ok(())
    }

    async fn send(&self, handle: SocketHandle, buf: &[u8]) -> InetResult<usize> {
        self.check_open(handle)?;
        self.sent.lock().push((handle, buf.to_vec(), None));
        Ok(buf.len())
    }

    async fn receive(
        &self,
        handle: SocketHandle,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> InetResult<usize> {
        self.receive_from(handle, buf, timeout).await.map(|(n, _)| n)
    }

    async fn send_to(
        &self,
        handle: SocketHandle,
        buf: &[u8],
        target: &SocketAddress,
    ) -> InetResult<usize> {
        self.check_open(handle)?;
        self.sent
            .lock()
            .push((handle, buf.to_vec(), Some(target.clone())));
        Ok(buf.len())
    }

    async fn receive_from(
        &self,
        handle: SocketHandle,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> InetResult<(usize, SocketAddress)> {
        self.check_open(handle)?;
        let next = self.incoming.lock().pop_front();
        let Some((data, from)) = next else {
            if let Some(limit) = timeout {
                tokio::time::sleep(limit).await;
            }
            return Err(InetError::from(io::Error::new(
                io::ErrorKind::TimedOut,
                "nothing to receive (mock)",
            )));
        };
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        Ok((n, from))
    }
}
