//! Network I/O provider
//!
//! The socket state machine never touches the OS directly. Every bind,
//! connect, send and receive goes through an [`IoProvider`] keyed by an
//! opaque [`SocketHandle`]. Production code uses [`TokioIoProvider`]; tests
//! substitute [`MockIoProvider`](super::MockIoProvider).
//!
//! Provider methods that only issue a non-blocking syscall (`bind`,
//! `shutdown_*`, `set_ttl`, `close`) are synchronous so the state machine can
//! call them while holding its lock. Everything that waits on the network is
//! async and is always called with the lock released.

use std::fmt;
use std::future::Future;
use std::io;
use std::net::{Shutdown, SocketAddr};
use std::os::fd::{AsRawFd, BorrowedFd, RawFd};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use socket2::{Domain, Protocol, SockAddr, SockRef, Socket, Type};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpSocket, UdpSocket};
use tokio::sync::Mutex as AsyncMutex;
use tracing::trace;

use crate::addr::SocketAddress;
use crate::error::{InetError, InetResult};

/// Opaque identifier of a provider-level socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SocketHandle(u64);

impl SocketHandle {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SocketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of socket a handle refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketKind {
    /// Connection-oriented (TCP)
    Stream,
    /// Datagram (UDP)
    Datagram,
}

impl fmt::Display for SocketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream => write!(f, "stream"),
            Self::Datagram => write!(f, "datagram"),
        }
    }
}

/// Lower-level socket operations on opaque handles
#[async_trait]
pub trait IoProvider: Send + Sync + fmt::Debug {
    /// Allocate a handle; the OS socket is created on first bind or connect
    ///
    /// # Errors
    ///
    /// Returns `InetError::Io` if the provider cannot allocate a socket.
    fn create(&self, kind: SocketKind) -> InetResult<SocketHandle>;

    /// Bind to a local address, returning the address actually bound
    ///
    /// # Errors
    ///
    /// Returns `InetError::Io` on OS failure (address in use, etc.).
    fn bind(&self, handle: SocketHandle, local: &SocketAddress) -> InetResult<SocketAddress>;

    /// Connect to `remote`, returning the local address in use
    ///
    /// `None` timeout waits forever.
    ///
    /// # Errors
    ///
    /// Returns `InetError::Io` on refusal, unreachability, or timeout.
    async fn connect(
        &self,
        handle: SocketHandle,
        remote: &SocketAddress,
        timeout: Option<Duration>,
    ) -> InetResult<SocketAddress>;

    /// Connect to `remote` through a SOCKS-style proxy
    ///
    /// The provider binds as needed. Providers without proxy support keep the
    /// default, which fails with `Unsupported`.
    ///
    /// # Errors
    ///
    /// Returns `InetError::Io` on failure.
    async fn connect_via_proxy(
        &self,
        handle: SocketHandle,
        proxy: &SocketAddress,
        remote: &SocketAddress,
        timeout: Option<Duration>,
    ) -> InetResult<SocketAddress> {
        let _ = (handle, remote, timeout);
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("proxy {proxy} not supported by this provider"),
        )
        .into())
    }

    /// Dissolve a datagram socket's default peer
    ///
    /// # Errors
    ///
    /// Returns `InetError::Io` on OS failure.
    fn disconnect(&self, handle: SocketHandle) -> InetResult<()>;

    /// Release the handle; idempotent
    fn close(&self, handle: SocketHandle);

    /// Shut down the receive half
    ///
    /// # Errors
    ///
    /// Returns `InetError::Io` on OS failure.
    fn shutdown_input(&self, handle: SocketHandle) -> InetResult<()>;

    /// Shut down the send half
    ///
    /// # Errors
    ///
    /// Returns `InetError::Io` on OS failure.
    fn shutdown_output(&self, handle: SocketHandle) -> InetResult<()>;

    /// Set the unicast hop limit for outgoing packets
    ///
    /// # Errors
    ///
    /// Returns `InetError::Io` on OS failure.
    fn set_ttl(&self, handle: SocketHandle, ttl: u32) -> InetResult<()>;

    /// Send on a connected socket
    ///
    /// # Errors
    ///
    /// Returns `InetError::Io` on transport failure.
    async fn send(&self, handle: SocketHandle, buf: &[u8]) -> InetResult<usize>;

    /// Receive on a connected socket; `Ok(0)` is end of stream
    ///
    /// # Errors
    ///
    /// Returns `InetError::Io` on transport failure or timeout.
    async fn receive(
        &self,
        handle: SocketHandle,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> InetResult<usize>;

    /// Send a datagram to `target`
    ///
    /// # Errors
    ///
    /// Returns `InetError::Io` on transport failure.
    async fn send_to(
        &self,
        handle: SocketHandle,
        buf: &[u8],
        target: &SocketAddress,
    ) -> InetResult<usize>;

    /// Receive a datagram and its source
    ///
    /// # Errors
    ///
    /// Returns `InetError::Io` on transport failure or timeout.
    async fn receive_from(
        &self,
        handle: SocketHandle,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> InetResult<(usize, SocketAddress)>;
}

// =============================================================================
// Tokio provider
// =============================================================================

#[derive(Debug)]
enum Slot {
    /// Handle allocated, no OS socket yet
    Fresh { kind: SocketKind, ttl: Option<u32> },
    StreamBound { socket: TcpSocket },
    /// Socket moved into an in-flight connect
    StreamConnecting,
    StreamConnected {
        fd: RawFd,
        reader: Arc<AsyncMutex<OwnedReadHalf>>,
        writer: Arc<AsyncMutex<OwnedWriteHalf>>,
    },
    Datagram { socket: Arc<UdpSocket>, v6: bool },
}

enum Channel {
    Stream {
        reader: Arc<AsyncMutex<OwnedReadHalf>>,
        writer: Arc<AsyncMutex<OwnedWriteHalf>>,
    },
    Datagram(Arc<UdpSocket>),
}

fn not_connected() -> InetError {
    io::Error::new(io::ErrorKind::NotConnected, "socket is not connected").into()
}

fn bad_handle(handle: SocketHandle) -> InetError {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("socket handle {handle} is not open"),
    )
    .into()
}

fn set_hop_limit(sock: SockRef<'_>, v6: bool, ttl: u32) -> io::Result<()> {
    if v6 {
        sock.set_unicast_hops_v6(ttl)
    } else {
        sock.set_ttl(ttl)
    }
}

fn new_tcp(v6: bool, ttl: Option<u32>) -> io::Result<TcpSocket> {
    let socket = if v6 {
        TcpSocket::new_v6()?
    } else {
        TcpSocket::new_v4()?
    };
    if let Some(ttl) = ttl {
        set_hop_limit(SockRef::from(&socket), v6, ttl)?;
    }
    Ok(socket)
}

fn new_udp(addr: SocketAddr, ttl: Option<u32>) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    if let Some(ttl) = ttl {
        set_hop_limit(SockRef::from(&socket), addr.is_ipv6(), ttl)?;
    }
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    UdpSocket::from_std(socket.into())
}

/// Run a socket option call against a connected stream's descriptor
fn with_stream_fd<T>(fd: RawFd, f: impl FnOnce(SockRef<'_>) -> io::Result<T>) -> io::Result<T> {
    // SAFETY: every caller holds the slot that owns the stream halves, which
    // keeps `fd` open for the duration of this call.
    let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
    f(SockRef::from(&borrowed))
}

async fn with_timeout<T>(
    timeout: Option<Duration>,
    fut: impl Future<Output = io::Result<T>>,
) -> io::Result<T> {
    match timeout {
        None => fut.await,
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "operation timed out"))?,
    }
}

/// Provider backed by tokio sockets
///
/// Must be used from within a Tokio runtime: datagram sockets register with
/// the reactor when bound.
#[derive(Debug, Default)]
pub struct TokioIoProvider {
    slots: DashMap<u64, Slot>,
    next_id: AtomicU64,
}

impl TokioIoProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open handles
    #[must_use]
    pub fn open_handles(&self) -> usize {
        self.slots.len()
    }

    fn channel(&self, handle: SocketHandle) -> InetResult<Channel> {
        let slot = self.slots.get(&handle.id()).ok_or_else(|| bad_handle(handle))?;
        match &*slot {
            Slot::StreamConnected { reader, writer, .. } => Ok(Channel::Stream {
                reader: Arc::clone(reader),
                writer: Arc::clone(writer),
            }),
            Slot::Datagram { socket, .. } => Ok(Channel::Datagram(Arc::clone(socket))),
            _ => Err(not_connected()),
        }
    }

    fn datagram(&self, handle: SocketHandle) -> InetResult<Option<Arc<UdpSocket>>> {
        let slot = self.slots.get(&handle.id()).ok_or_else(|| bad_handle(handle))?;
        match &*slot {
            Slot::Datagram { socket, .. } => Ok(Some(Arc::clone(socket))),
            Slot::Fresh {
                kind: SocketKind::Datagram,
                ..
            } => Err(io::Error::new(io::ErrorKind::NotConnected, "datagram socket is not bound").into()),
            _ => Ok(None),
        }
    }

    /// Move the TCP socket out of its slot for the duration of a connect
    fn take_stream(&self, handle: SocketHandle, v6: bool) -> InetResult<TcpSocket> {
        let mut slot = self.slots.get_mut(&handle.id()).ok_or_else(|| bad_handle(handle))?;
        match std::mem::replace(&mut *slot, Slot::StreamConnecting) {
            Slot::StreamBound { socket } => Ok(socket),
            Slot::Fresh {
                kind: SocketKind::Stream,
                ttl,
            } => new_tcp(v6, ttl).map_err(|e| {
                *slot = Slot::Fresh {
                    kind: SocketKind::Stream,
                    ttl,
                };
                e.into()
            }),
            other => {
                *slot = other;
                Err(InetError::socket_state("stream socket cannot connect from this state"))
            }
        }
    }

    fn shutdown(&self, handle: SocketHandle, how: Shutdown) -> InetResult<()> {
        let slot = self.slots.get(&handle.id()).ok_or_else(|| bad_handle(handle))?;
        match &*slot {
            Slot::StreamConnected { fd, .. } => Ok(with_stream_fd(*fd, |s| s.shutdown(how))?),
            _ => Err(not_connected()),
        }
    }
}

#[async_trait]
impl IoProvider for TokioIoProvider {
    fn create(&self, kind: SocketKind) -> InetResult<SocketHandle> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.slots.insert(id, Slot::Fresh { kind, ttl: None });
        trace!("Allocated {} socket #{}", kind, id);
        Ok(SocketHandle::new(id))
    }

    fn bind(&self, handle: SocketHandle, local: &SocketAddress) -> InetResult<SocketAddress> {
        let mut slot = self.slots.get_mut(&handle.id()).ok_or_else(|| bad_handle(handle))?;
        let Slot::Fresh { kind, ttl } = &*slot else {
            return Err(InetError::socket_state("provider socket is already bound"));
        };
        let (kind, ttl) = (*kind, *ttl);
        let addr = local.to_std();

        let bound = match kind {
            SocketKind::Stream => {
                let socket = new_tcp(addr.is_ipv6(), ttl)?;
                socket.bind(addr)?;
                let bound = socket.local_addr()?;
                *slot = Slot::StreamBound { socket };
                bound
            }
            SocketKind::Datagram => {
                let socket = new_udp(addr, ttl)?;
                let bound = socket.local_addr()?;
                *slot = Slot::Datagram {
                    socket: Arc::new(socket),
                    v6: addr.is_ipv6(),
                };
                bound
            }
        };
        Ok(bound.into())
    }

    async fn connect(
        &self,
        handle: SocketHandle,
        remote: &SocketAddress,
        timeout: Option<Duration>,
    ) -> InetResult<SocketAddress> {
        let target = remote.to_std();

        if let Some(udp) = self.datagram(handle)? {
            SockRef::from(&*udp).connect(&SockAddr::from(target))?;
            return Ok(udp.local_addr()?.into());
        }

        let socket = self.take_stream(handle, target.is_ipv6())?;
        let stream = with_timeout(timeout, socket.connect(target)).await?;
        let local = stream.local_addr()?;
        let fd = stream.as_raw_fd();
        let (reader, writer) = stream.into_split();

        // A close while connecting removes the slot; the new stream is dropped.
        let Some(mut slot) = self.slots.get_mut(&handle.id()) else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "socket closed during connect").into());
        };
        *slot = Slot::StreamConnected {
            fd,
            reader: Arc::new(AsyncMutex::new(reader)),
            writer: Arc::new(AsyncMutex::new(writer)),
        };
        Ok(local.into())
    }

    fn disconnect(&self, handle: SocketHandle) -> InetResult<()> {
        let udp = self.datagram(handle)?.ok_or_else(not_connected)?;
        // SAFETY: an all-zero sockaddr is valid; AF_UNSPEC dissolves the
        // association of a datagram socket.
        let rc = unsafe {
            let mut addr: libc::sockaddr = std::mem::zeroed();
            addr.sa_family = libc::AF_UNSPEC as libc::sa_family_t;
            libc::connect(
                udp.as_raw_fd(),
                &addr,
                std::mem::size_of::<libc::sockaddr>() as libc::socklen_t,
            )
        };
        if rc != 0 {
            return Err(io::Error::last_os_error().into());
        }
        Ok(())
    }

    fn close(&self, handle: SocketHandle) {
        if let Some((_, slot)) = self.slots.remove(&handle.id()) {
            if let Slot::StreamConnected { fd, .. } = slot {
                // Wakes tasks still blocked in a read on a cloned half.
                let _ = with_stream_fd(fd, |s| s.shutdown(Shutdown::Both));
            }
            trace!("Closed socket {}", handle);
        }
    }

    fn shutdown_input(&self, handle: SocketHandle) -> InetResult<()> {
        self.shutdown(handle, Shutdown::Read)
    }

    fn shutdown_output(&self, handle: SocketHandle) -> InetResult<()> {
        self.shutdown(handle, Shutdown::Write)
    }

    fn set_ttl(&self, handle: SocketHandle, ttl: u32) -> InetResult<()> {
        let mut slot = self.slots.get_mut(&handle.id()).ok_or_else(|| bad_handle(handle))?;
        match &mut *slot {
            Slot::Fresh { ttl: pending, .. } => {
                *pending = Some(ttl);
                Ok(())
            }
            Slot::StreamBound { socket } => {
                let v6 = socket.local_addr()?.is_ipv6();
                Ok(set_hop_limit(SockRef::from(&*socket), v6, ttl)?)
            }
            Slot::StreamConnected { fd, .. } => Ok(with_stream_fd(*fd, |s| {
                let v6 = s.local_addr()?.as_socket().is_some_and(|a| a.is_ipv6());
                set_hop_limit(s, v6, ttl)
            })?),
            Slot::Datagram { socket, v6 } => Ok(set_hop_limit(SockRef::from(&**socket), *v6, ttl)?),
            Slot::StreamConnecting => Err(InetError::socket_state("connect in progress")),
        }
    }

    async fn send(&self, handle: SocketHandle, buf: &[u8]) -> InetResult<usize> {
        match self.channel(handle)? {
            Channel::Stream { writer, .. } => {
                let mut writer = writer.lock().await;
                writer.write_all(buf).await?;
                Ok(buf.len())
            }
            Channel::Datagram(udp) => Ok(udp.send(buf).await?),
        }
    }

    async fn receive(
        &self,
        handle: SocketHandle,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> InetResult<usize> {
        match self.channel(handle)? {
            Channel::Stream { reader, .. } => {
                let mut reader = reader.lock().await;
                Ok(with_timeout(timeout, reader.read(buf)).await?)
            }
            Channel::Datagram(udp) => Ok(with_timeout(timeout, udp.recv(buf)).await?),
        }
    }

    async fn send_to(
        &self,
        handle: SocketHandle,
        buf: &[u8],
        target: &SocketAddress,
    ) -> InetResult<usize> {
        let udp = self.datagram(handle)?.ok_or_else(|| {
            InetError::from(io::Error::new(
                io::ErrorKind::Unsupported,
                "send_to on a stream socket",
            ))
        })?;
        Ok(udp.send_to(buf, target.to_std()).await?)
    }

    async fn receive_from(
        &self,
        handle: SocketHandle,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> InetResult<(usize, SocketAddress)> {
        let udp = self.datagram(handle)?.ok_or_else(|| {
            InetError::from(io::Error::new(
                io::ErrorKind::Unsupported,
                "receive_from on a stream socket",
            ))
        })?;
        let (n, from) = with_timeout(timeout, udp.recv_from(buf)).await?;
        Ok((n, from.into()))
    }
}
