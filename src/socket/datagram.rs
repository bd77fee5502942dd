//! Datagram socket

use std::sync::Arc;
use std::time::Duration;

use super::provider::{IoProvider, SocketHandle, SocketKind};
use super::shared::SocketCore;
use crate::addr::SocketAddress;
use crate::error::{InetError, InetResult};

/// Datagram (UDP) socket guarded by the socket state machine
///
/// Connecting only fixes the default peer; `disconnect` returns the socket
/// to the bound state.
#[derive(Debug)]
pub struct DatagramSocket {
    core: SocketCore,
}

impl DatagramSocket {
    /// Create an unbound socket
    ///
    /// # Errors
    ///
    /// Returns the provider's error if no handle can be allocated.
    pub fn new(provider: Arc<dyn IoProvider>) -> InetResult<Self> {
        Ok(Self {
            core: SocketCore::open(SocketKind::Datagram, provider)?,
        })
    }

    #[must_use]
    pub fn handle(&self) -> SocketHandle {
        self.core.handle()
    }

    /// Bind to a local address
    ///
    /// # Errors
    ///
    /// `SocketClosed`, `SocketState` if already bound, or the provider's I/O
    /// error.
    pub fn bind(&self, local: &SocketAddress) -> InetResult<SocketAddress> {
        self.core.bind(local)
    }

    /// Fix the default peer, binding to the wildcard address if needed
    ///
    /// # Errors
    ///
    /// `SocketClosed`, `SocketState` if already connected, or the provider's
    /// I/O error.
    pub async fn connect(&self, remote: &SocketAddress) -> InetResult<()> {
        self.core.connect(remote, 0, None).await
    }

    /// Drop the default peer
    ///
    /// # Errors
    ///
    /// `SocketClosed` or the provider's I/O error.
    pub fn disconnect(&self) -> InetResult<()> {
        self.core.with_state(|state| {
            state.ensure_open()?;
            if state.is_connected() {
                self.core.provider().disconnect(self.core.handle())?;
            }
            state.disconnect()
        })
    }

    /// Close the socket; calling it again does nothing
    pub fn close(&self) {
        self.core.close();
    }

    /// Send to the connected peer
    ///
    /// # Errors
    ///
    /// `SocketClosed`, `SocketState` if not connected, or the provider's I/O
    /// error.
    pub async fn send(&self, buf: &[u8]) -> InetResult<usize> {
        self.core.with_state(|s| s.check_send())?;
        self.core.provider().send(self.handle(), buf).await
    }

    /// Receive from the connected peer
    ///
    /// # Errors
    ///
    /// `SocketClosed`, `SocketState` if not connected, or the provider's I/O
    /// error (including a timeout).
    pub async fn receive(&self, buf: &mut [u8]) -> InetResult<usize> {
        let timeout = self.core.with_state(|s| {
            s.check_receive()?;
            Ok(s.receive_timeout())
        })?;
        self.core
            .provider()
            .receive(self.handle(), buf, timeout)
            .await
    }

    /// Send one datagram to `target`
    ///
    /// An unbound socket is first bound to the wildcard address.
    ///
    /// # Errors
    ///
    /// `SocketClosed`, `InvalidArgument` if connected to a different peer, or
    /// the provider's I/O error.
    pub async fn send_to(&self, buf: &[u8], target: &SocketAddress) -> InetResult<usize> {
        self.core.with_state(|state| {
            state.ensure_open()?;
            if let Some(peer) = state.remote_address() {
                if peer != target {
                    return Err(InetError::invalid_argument(format!(
                        "connected to {peer}, can't send to {target}"
                    )));
                }
            }
            if !state.is_bound() {
                self.core.bind_wildcard_locked(state, target.ip())?;
            }
            Ok(())
        })?;
        self.core
            .provider()
            .send_to(self.handle(), buf, target)
            .await
    }

    /// Receive one datagram and its source
    ///
    /// # Errors
    ///
    /// `SocketClosed`, `SocketState` if unbound, or the provider's I/O error
    /// (including a timeout).
    pub async fn receive_from(&self, buf: &mut [u8]) -> InetResult<(usize, SocketAddress)> {
        let timeout = self.core.with_state(|state| {
            state.ensure_open()?;
            if !state.is_bound() {
                return Err(InetError::socket_state("not bound"));
            }
            Ok(state.receive_timeout())
        })?;
        self.core
            .provider()
            .receive_from(self.handle(), buf, timeout)
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

    /// Set the hop limit for outgoing datagrams
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
    pub fn local_address(&self) -> Option<SocketAddress> {
        self.core.state().local_address().cloned()
    }

    #[must_use]
    pub fn remote_address(&self) -> Option<SocketAddress> {
        self.core.state().remote_address().cloned()
    }
}
