//! Socket state machine
//!
//! ```text
//! Unbound ──bind──▶ Bound ──connect──▶ Connected
//!    └───────────connect (implicit bind)──▲
//!
//! closed, input_shutdown, output_shutdown: orthogonal, set once, never reset
//! ```
//!
//! [`SocketState`] is a plain value: every guard is a pure check on it and
//! performs no I/O. The socket types keep one `SocketState` behind a single
//! mutex, take the lock to check a guard and record a transition, and release
//! it before awaiting the provider.

use std::fmt;
use std::time::Duration;

use crate::addr::SocketAddress;
use crate::error::{InetError, InetResult};

/// Binding/connection progress of a socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Unbound,
    Bound,
    Connected,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbound => write!(f, "UNBOUND"),
            Self::Bound => write!(f, "BOUND"),
            Self::Connected => write!(f, "CONNECTED"),
        }
    }
}

/// Convert a millisecond timeout; 0 means wait forever
///
/// # Errors
///
/// Returns `InetError::InvalidArgument` for negative values.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use rust_inet::socket::timeout_from_millis;
///
/// assert_eq!(timeout_from_millis(0).unwrap(), None);
/// assert_eq!(timeout_from_millis(250).unwrap(), Some(Duration::from_millis(250)));
/// assert!(timeout_from_millis(-1).is_err());
/// ```
pub fn timeout_from_millis(ms: i64) -> InetResult<Option<Duration>> {
    match ms {
        ms if ms < 0 => Err(InetError::invalid_argument(format!("timeout can't be negative: {ms}"))),
        0 => Ok(None),
        ms => Ok(Some(Duration::from_millis(ms.unsigned_abs()))),
    }
}

/// Full state of one socket
#[derive(Debug, Clone, Default)]
pub struct SocketState {
    phase: Phase,
    /// A connect is between its guard check and its provider result
    connecting: bool,
    closed: bool,
    input_shutdown: bool,
    output_shutdown: bool,
    local: Option<SocketAddress>,
    remote: Option<SocketAddress>,
    receive_timeout: Option<Duration>,
}

impl SocketState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.phase != Phase::Unbound
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.phase == Phase::Connected
    }

    #[must_use]
    pub fn is_connecting(&self) -> bool {
        self.connecting
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub fn is_input_shutdown(&self) -> bool {
        self.input_shutdown
    }

    #[must_use]
    pub fn is_output_shutdown(&self) -> bool {
        self.output_shutdown
    }

    #[must_use]
    pub fn local_address(&self) -> Option<&SocketAddress> {
        self.local.as_ref()
    }

    #[must_use]
    pub fn remote_address(&self) -> Option<&SocketAddress> {
        self.remote.as_ref()
    }

    #[must_use]
    pub fn receive_timeout(&self) -> Option<Duration> {
        self.receive_timeout
    }

    /// Fail with `SocketClosed` once closed
    ///
    /// # Errors
    ///
    /// Returns `InetError::SocketClosed` if the socket is closed.
    pub fn ensure_open(&self) -> InetResult<()> {
        if self.closed {
            return Err(InetError::SocketClosed);
        }
        Ok(())
    }

    /// Guard for an explicit bind
    ///
    /// # Errors
    ///
    /// Fails if closed, already bound, or a connect is in progress.
    pub fn check_bind(&self) -> InetResult<()> {
        self.ensure_open()?;
        if self.connecting {
            return Err(InetError::socket_state("connect in progress"));
        }
        if self.is_bound() {
            return Err(InetError::socket_state("already bound"));
        }
        Ok(())
    }

    /// Record a successful bind
    pub fn mark_bound(&mut self, local: SocketAddress) {
        if self.phase == Phase::Unbound {
            self.phase = Phase::Bound;
        }
        self.local = Some(local);
    }

    /// Guard and enter the connecting window
    ///
    /// Returns whether the socket is still unbound and needs an implicit bind.
    ///
    /// # Errors
    ///
    /// Fails if closed, already connected, or another connect is in progress.
    pub fn begin_connect(&mut self) -> InetResult<bool> {
        self.ensure_open()?;
        if self.connecting {
            return Err(InetError::socket_state("connect already in progress"));
        }
        if self.is_connected() {
            return Err(InetError::socket_state("already connected"));
        }
        self.connecting = true;
        Ok(!self.is_bound())
    }

    /// Leave the connecting window after a failed attempt
    pub fn abort_connect(&mut self) {
        self.connecting = false;
    }

    /// Leave the connecting window after a successful attempt
    pub fn complete_connect(&mut self, local: SocketAddress, remote: SocketAddress) {
        self.connecting = false;
        self.phase = Phase::Connected;
        self.local = Some(local);
        self.remote = Some(remote);
    }

    /// Drop a datagram socket's peer, returning to `Bound`
    ///
    /// # Errors
    ///
    /// Fails if closed.
    pub fn disconnect(&mut self) -> InetResult<()> {
        self.ensure_open()?;
        if self.phase == Phase::Connected {
            self.phase = Phase::Bound;
        }
        self.remote = None;
        Ok(())
    }

    /// Mark closed; returns `false` if it already was
    pub fn mark_closed(&mut self) -> bool {
        !std::mem::replace(&mut self.closed, true)
    }

    /// Guard for `shutdown_input`
    ///
    /// # Errors
    ///
    /// Fails if closed, not connected, or input is already shut down.
    pub fn check_shutdown_input(&self) -> InetResult<()> {
        self.ensure_open()?;
        if !self.is_connected() {
            return Err(InetError::socket_state("not connected"));
        }
        if self.input_shutdown {
            return Err(InetError::socket_state("input already shut down"));
        }
        Ok(())
    }

    /// Guard for `shutdown_output`
    ///
    /// # Errors
    ///
    /// Fails if closed, not connected, or output is already shut down.
    pub fn check_shutdown_output(&self) -> InetResult<()> {
        self.ensure_open()?;
        if !self.is_connected() {
            return Err(InetError::socket_state("not connected"));
        }
        if self.output_shutdown {
            return Err(InetError::socket_state("output already shut down"));
        }
        Ok(())
    }

    pub fn mark_input_shutdown(&mut self) {
        self.input_shutdown = true;
    }

    pub fn mark_output_shutdown(&mut self) {
        self.output_shutdown = true;
    }

    /// Guard for sending on the connected peer
    ///
    /// # Errors
    ///
    /// Fails if closed, not connected, or output is shut down.
    pub fn check_send(&self) -> InetResult<()> {
        self.ensure_open()?;
        if !self.is_connected() {
            return Err(InetError::socket_state("not connected"));
        }
        if self.output_shutdown {
            return Err(InetError::socket_state("output is shut down"));
        }
        Ok(())
    }

    /// Guard for receiving from the connected peer
    ///
    /// Returns `false` when input is shut down: the read reports end of
    /// stream without touching the provider.
    ///
    /// # Errors
    ///
    /// Fails if closed or not connected.
    pub fn check_receive(&self) -> InetResult<bool> {
        self.ensure_open()?;
        if !self.is_connected() {
            return Err(InetError::socket_state("not connected"));
        }
        Ok(!self.input_shutdown)
    }

    /// Set the receive timeout in milliseconds; 0 waits forever
    ///
    /// # Errors
    ///
    /// Fails if closed or `ms` is negative.
    pub fn set_receive_timeout(&mut self, ms: i64) -> InetResult<()> {
        self.ensure_open()?;
        self.receive_timeout = timeout_from_millis(ms)?;
        Ok(())
    }
}
