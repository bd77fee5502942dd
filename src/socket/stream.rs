//! Connection-oriented socket

use std::sync::Arc;
use std::time::Duration;

use super::provider::{IoProvider, SocketHandle, SocketKind};
use super::shared::SocketCore;
use crate::addr::SocketAddress;
use crate::error::InetResult;

/// Stream (TCP) socket guarded by the socket state machine
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use rust_inet::addr::{IpAddress, SocketAddress};
/// use rust_inet::socket::{MockIoProvider, StreamSocket};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let socket = StreamSocket::new(Arc::new(MockIoProvider::new())).unwrap();
/// socket
///     .connect(&SocketAddress::new(IpAddress::loopback_v4(), 8080), 1000)
///     .await
///     .unwrap();
/// assert!(socket.is_connected() && socket.is_bound());
///
/// socket.close();
/// socket.close();
/// assert!(socket.send(b"late").await.is_err());
/// # });
/// ```
#[derive(Debug)]
pub struct StreamSocket {
    core: SocketCore,
    proxy: Option<SocketAddress>,
}

impl StreamSocket {
    /// Create an unbound, unconnected socket
    ///
    /// # Errors
    ///
    /// Returns the provider's error if no handle can be allocated.
    pub fn new(provider: Arc<dyn IoProvider>) -> InetResult<Self> {
        Ok(Self {
            core: SocketCore::open(SocketKind::Stream, provider)?,
            proxy: None,
        })
    }

    /// Create a socket whose connects go through `proxy`
    ///
    /// Connecting does not bind implicitly; the provider binds as needed.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if no handle can be allocated.
    pub fn with_proxy(provider: Arc<dyn IoProvider>, proxy: SocketAddress) -> InetResult<Self> {
        Ok(Self {
            core: SocketCore::open(SocketKind::Stream, provider)?,
            proxy: Some(proxy),
        })
    }

    #[must_use]
    pub fn handle(&self) -> SocketHandle {
        self.core.handle()
    }

    #[must_use]
    pub fn proxy(&self) -> Option<&SocketAddress> {
        self.proxy.as_ref()
    }

    /// Bind to a local address
    ///
    /// # Errors
    ///
    /// `SocketClosed` if closed, `SocketState` if already bound, or the
    /// provider's I/O error.
    pub fn bind(&self, local: &SocketAddress) -> InetResult<SocketAddress> {
        self.core.bind(local)
    }

    /// Connect to `remote`; `timeout_ms` of 0 waits forever
    ///
    /// An unbound socket is first bound to the wildcard address.
    ///
    /// # Errors
    ///
    /// `SocketClosed` if closed, `InvalidArgument` for a negative timeout,
    /// `SocketState` if connected or connecting, or the provider's I/O error.
    pub async fn connect(&self, remote: &SocketAddress, timeout_ms: i64) -> InetResult<()> {
        self.core
            .connect(remote, timeout_ms, self.proxy.as_ref())
            .await
    }

    /// Close the socket; calling it again does nothing
    pub fn close(&self) {
        self.core.close();
    }

    /// Shut down the receive half
    ///
    /// # Errors
    ///
    /// `SocketClosed`, `SocketState` if not connected or already shut down,
    /// or the provider's I/O error.
    pub fn shutdown_input(&self) -> InetResult<()> {
        self.core.shutdown_input()
    }

    /// Shut down the send half
    ///
    /// # Errors
    ///
    /// `SocketClosed`, `SocketState` if not connected or already shut down,
    /// or the provider's I/O error.
    pub fn shutdown_output(&self) -> InetResult<()> {
        self.core.shutdown_output()
    }

    /// Send bytes to the peer
    ///
    /// # Errors
    ///
    /// `SocketClosed`, `SocketState` if not connected or output is shut
    /// down, or the provider's I/O error.
    pub async fn send(&self, buf: &[u8]) -> InetResult<usize> {
        self.core.with_state(|s| s.check_send())?;
        self.core.provider().send(self.handle(), buf).await
    }

    /// Receive bytes from the peer; `Ok(0)` is end of stream
    ///
    /// After `shutdown_input` this returns `Ok(0)` without I/O.
    ///
    /// # Errors
    ///
    /// `SocketClosed`, `SocketState` if not connected, or the provider's I/O
    /// error (including a timeout).
    pub async fn receive(&self, buf: &mut [u8]) -> InetResult<usize> {
        let (live, timeout) = self
            .core
            .with_state(|s| Ok((s.check_receive()?, s.receive_timeout())))?;
        if !live {
            return Ok(0);
        }
        self.core
            .provider()
            .receive(self.handle(), buf, timeout)
            .await
    }

    /// Set the receive timeout; 0 waits forever
    ///
    /// # Errors
    ///
    /// `SocketClosed` or `InvalidArgument` for a negative value.
    pub fn set_receive_timeout(&self, ms: i64) -> InetResult<()> {
        self.core.set_receive_timeout(ms)
    }

    /// Set the hop limit for outgoing packets
    ///
    /// # Errors
    ///
    /// `SocketClosed` or the provider's I/O error.
    pub fn set_ttl(&self, ttl: u32) -> InetResult<()> {
        self.core.set_ttl(ttl)
    }

    #[must_use]
    pub fn receive_timeout(&self) -> Option<Duration> {
        self.core.state().receive_timeout()
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.core.state().is_bound()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.core.state().is_connected()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.core.state().is_closed()
    }

    #[must_use]
    pub fn is_input_shutdown(&self) -> bool {
        self.core.state().is_input_shutdown()
    }

    #[must_use]
    pub fn is_output_shutdown(&self) -> bool {
        self.core.state().is_output_shutdown()
    }

    #[must_use]
    pub fn local_address(&self) -> Option<SocketAddress> {
        self.core.state().local_address().cloned()
    }

    #[must_use]
    pub fn remote_address(&self) -> Option<SocketAddress> {
        self.core.state().remote_address().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addr::IpAddress;
    use crate::error::InetError;
    use crate::socket::{ConnectOutcome, MockIoProvider};

    fn remote(port: u16) -> SocketAddress {
        SocketAddress::new("192.0.2.10".parse().unwrap(), port)
    }

    fn setup() -> (StreamSocket, Arc<MockIoProvider>) {
        let provider = Arc::new(MockIoProvider::new());
        (StreamSocket::new(provider.clone()).unwrap(), provider)
    }

    #[test]
    fn test_fresh_socket() {
        let (socket, _) = setup();
        assert!(!socket.is_bound());
        assert!(!socket.is_connected());
        assert!(!socket.is_closed());
        assert!(socket.local_address().is_none());
    }

    #[test]
    fn test_bind_twice() {
        let (socket, _) = setup();
        let bound = socket
            .bind(&SocketAddress::new(IpAddress::loopback_v4(), 0))
            .unwrap();
        assert_ne!(bound.port(), 0);
        assert_eq!(socket.local_address(), Some(bound));
        assert!(socket.bind(&SocketAddress::wildcard(0)).unwrap_err().is_state_error());
    }

    #[tokio::test]
    async fn test_connect_binds_implicitly() {
        let (socket, provider) = setup();
        socket.connect(&remote(80), 0).await.unwrap();
        assert!(socket.is_bound());
        assert!(socket.local_address().unwrap().ip().is_any_local());
        assert_eq!(socket.remote_address(), Some(remote(80)));

        let attempt = &provider.attempts()[0];
        assert!(attempt.source.is_some());
        assert_eq!(attempt.timeout, None);
    }

    #[tokio::test]
    async fn test_connect_when_connected() {
        let (socket, provider) = setup();
        socket.connect(&remote(80), 100).await.unwrap();
        let err = socket.connect(&remote(81), 100).await.unwrap_err();
        assert!(matches!(err, InetError::SocketState(_)));
        assert_eq!(provider.connect_attempts(), 1);
    }

    #[tokio::test]
    async fn test_negative_timeout_rejected_before_io() {
        let (socket, provider) = setup();
        let err = socket.connect(&remote(80), -1).await.unwrap_err();
        assert!(matches!(err, InetError::InvalidArgument(_)));
        assert!(!socket.is_bound());
        assert_eq!(provider.connect_attempts(), 0);
    }

    #[tokio::test]
    async fn test_failed_connect_releases_handle() {
        let (socket, provider) = setup();
        provider.set_default_outcome(ConnectOutcome::Refuse);
        let err = socket.connect(&remote(80), 100).await.unwrap_err();
        assert!(err.is_connection_refused());

        assert!(provider.is_closed(socket.handle()));
        assert!(!socket.is_closed());
        assert!(!socket.is_connected());
    }

    #[tokio::test]
    async fn test_close_idempotent_and_absorbing() {
        let (socket, provider) = setup();
        socket.connect(&remote(80), 0).await.unwrap();
        socket.close();
        socket.close();
        assert!(socket.is_closed());
        assert_eq!(provider.closed_count(), 1);

        assert!(matches!(socket.send(b"x").await, Err(InetError::SocketClosed)));
        let mut buf = [0u8; 4];
        assert!(matches!(socket.receive(&mut buf).await, Err(InetError::SocketClosed)));
        assert!(matches!(socket.shutdown_input(), Err(InetError::SocketClosed)));
        assert!(matches!(socket.bind(&SocketAddress::wildcard(0)), Err(InetError::SocketClosed)));
        assert!(matches!(socket.connect(&remote(80), 0).await, Err(InetError::SocketClosed)));
    }

    #[tokio::test]
    async fn test_shutdown_halves() {
        let (socket, provider) = setup();
        socket.connect(&remote(80), 0).await.unwrap();
        provider.push_incoming(b"data", remote(80));

        socket.shutdown_input().unwrap();
        assert!(socket.is_input_shutdown());
        assert!(socket.shutdown_input().unwrap_err().is_state_error());

        // Reads report end of stream without consuming the queued data.
        let mut buf = [0u8; 8];
        assert_eq!(socket.receive(&mut buf).await.unwrap(), 0);

        socket.send(b"hi").await.unwrap();
        socket.shutdown_output().unwrap();
        assert!(socket.send(b"again").await.unwrap_err().is_state_error());
        assert_eq!(provider.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_receive_uses_timeout() {
        let (socket, provider) = setup();
        socket.connect(&remote(80), 0).await.unwrap();
        socket.set_receive_timeout(10).unwrap();
        assert_eq!(socket.receive_timeout(), Some(Duration::from_millis(10)));

        let mut buf = [0u8; 8];
        assert!(socket.receive(&mut buf).await.is_err());
        provider.push_incoming(b"ok", remote(80));
        assert_eq!(socket.receive(&mut buf).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_connects_only_one_wins() {
        let provider = Arc::new(MockIoProvider::new());
        provider.set_connect_delay(50);
        let socket = Arc::new(StreamSocket::new(provider.clone()).unwrap());

        let first = {
            let socket = socket.clone();
            tokio::spawn(async move { socket.connect(&remote(80), 0).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = socket.connect(&remote(81), 0).await;

        assert!(second.unwrap_err().is_state_error());
        first.await.unwrap().unwrap();
        assert_eq!(socket.remote_address(), Some(remote(80)));
        assert_eq!(provider.connect_attempts(), 1);
    }

    #[tokio::test]
    async fn test_close_interrupts_failing_connect() {
        let provider = Arc::new(MockIoProvider::new());
        provider.set_default_outcome(ConnectOutcome::TimeOut);
        provider.set_connect_delay(5000);
        let socket = Arc::new(StreamSocket::new(provider.clone()).unwrap());

        let pending = {
            let socket = socket.clone();
            tokio::spawn(async move { socket.connect(&remote(80), 5000).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let started = std::time::Instant::now();
        socket.close();

        let err = pending.await.unwrap().unwrap_err();
        assert!(matches!(err, InetError::SocketClosed));
        assert!(err.is_state_error());
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(socket.is_closed());
        assert!(!socket.is_connected());
    }

    #[tokio::test]
    async fn test_close_then_refused_connect_reports_closed() {
        let provider = Arc::new(MockIoProvider::new());
        provider.set_default_outcome(ConnectOutcome::Refuse);
        provider.set_connect_delay(50);
        let socket = Arc::new(StreamSocket::new(provider.clone()).unwrap());

        let pending = {
            let socket = socket.clone();
            tokio::spawn(async move { socket.connect(&remote(80), 0).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        socket.close();

        assert!(matches!(
            pending.await.unwrap(),
            Err(InetError::SocketClosed)
        ));
        assert_eq!(provider.closed_count(), 1);
    }

    #[tokio::test]
    async fn test_proxy_skips_implicit_bind() {
        let provider = Arc::new(MockIoProvider::new());
        let proxy = SocketAddress::new("198.51.100.1".parse().unwrap(), 1080);
        let socket = StreamSocket::with_proxy(provider.clone(), proxy.clone()).unwrap();
        socket.connect(&remote(443), 0).await.unwrap();

        let attempt = &provider.attempts()[0];
        assert_eq!(attempt.source, None);
        assert_eq!(attempt.proxy, Some(proxy));
        assert!(socket.is_connected());
    }

    #[test]
    fn test_drop_closes_handle() {
        let provider = Arc::new(MockIoProvider::new());
        let handle = {
            let socket = StreamSocket::new(provider.clone()).unwrap();
            socket.handle()
        };
        assert!(provider.is_closed(handle));
    }
}
