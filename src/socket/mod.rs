//! Socket lifecycle layer
//!
//! [`StreamSocket`] and [`DatagramSocket`] enforce the socket state machine
//! ([`SocketState`]) in front of an [`IoProvider`]:
//!
//! - `bind` fails once bound or closed
//! - `connect` fails once connected, while another connect is in flight, on
//!   a negative timeout, or when closed; an unbound socket binds to the
//!   wildcard address first unless a proxy is used
//! - `close` is idempotent and absorbing; every later operation fails with
//!   `SocketClosed`
//! - each half can be shut down once
//!
//! State errors are reported as `InetError::SocketClosed` /
//! `InetError::SocketState`, never as I/O errors, so callers can tell misuse
//! from transport failure.

mod datagram;
mod mock;
mod provider;
mod shared;
mod state;
mod stream;

pub use datagram::DatagramSocket;
pub use mock::{ConnectAttempt, ConnectOutcome, MockIoProvider};
pub use provider::{IoProvider, SocketHandle, SocketKind, TokioIoProvider};
pub use state::{timeout_from_millis, Phase, SocketState};
pub use stream::StreamSocket;
