//! Error types for rust-inet
//!
//! This module defines the error hierarchy for resolution, address handling,
//! and socket lifecycle operations.
//!
//! # Error Categories
//!
//! - **Resolution errors**: the host has no addresses ([`InetError::UnknownHost`])
//! - **Validation errors**: bad ports, timeouts, address lengths
//!   ([`InetError::InvalidArgument`]), always raised before any I/O
//! - **Socket misuse**: operations on a closed socket or from a state that
//!   forbids them ([`InetError::SocketClosed`], [`InetError::SocketState`])
//! - **Transport errors**: lower-layer I/O failures, propagated verbatim
//!   ([`InetError::Io`])
//!
//! # Example
//!
//! ```
//! use rust_inet::InetError;
//!
//! let err = InetError::unknown_host("nonexistent.invalid");
//! assert!(err.is_unknown_host());
//! assert!(err.to_string().contains("nonexistent.invalid"));
//! ```

use std::io;

use thiserror::Error;

/// Result alias used throughout the crate
pub type InetResult<T> = Result<T, InetError>;

/// Top-level error type for rust-inet
#[derive(Debug, Error)]
pub enum InetError {
    /// Resolution failed: the host has no addresses
    #[error("Unknown host: {host}")]
    UnknownHost {
        /// The hostname that could not be resolved
        host: String,
    },

    /// Local validation failure (port range, timeout sign, address length)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation attempted on a closed socket
    #[error("Socket is closed")]
    SocketClosed,

    /// Operation attempted from a state that forbids it
    #[error("Invalid socket state: {0}")]
    SocketState(String),

    /// Lower-layer I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl InetError {
    /// Create an unknown host error
    pub fn unknown_host(host: impl Into<String>) -> Self {
        Self::UnknownHost { host: host.into() }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }

    /// Create a socket state error
    ///
    /// # Example
    ///
    /// ```
    /// use rust_inet::InetError;
    ///
    /// let err = InetError::socket_state("already connected");
    /// assert!(err.is_state_error());
    /// ```
    pub fn socket_state(reason: impl Into<String>) -> Self {
        Self::SocketState(reason.into())
    }

    /// Check if this is an unknown host error
    #[must_use]
    pub fn is_unknown_host(&self) -> bool {
        matches!(self, Self::UnknownHost { .. })
    }

    /// Check if this error reports socket misuse rather than a transport failure
    #[must_use]
    pub fn is_state_error(&self) -> bool {
        matches!(self, Self::SocketClosed | Self::SocketState(_))
    }

    /// Check if this error wraps a "connection refused" I/O error
    #[must_use]
    pub fn is_connection_refused(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::ConnectionRefused)
    }

    /// Check if this error is recoverable (the operation may succeed on retry)
    ///
    /// Validation and state errors never are: retrying the same call from the
    /// same state fails the same way.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::UnknownHost { .. }
            | Self::InvalidArgument(_)
            | Self::SocketClosed
            | Self::SocketState(_) => false,
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::TimedOut
                    | io::ErrorKind::Interrupted
                    | io::ErrorKind::WouldBlock
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionRefused
            ),
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found or inaccessible
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Validation error (invalid values)
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// Environment variable error
    #[error("Environment variable error: {name}: {reason}")]
    EnvError { name: String, reason: String },

    /// I/O error while reading config
    #[error("I/O error reading configuration: {0}")]
    IoError(#[from] io::Error),
}

impl ConfigError {
    /// Create a validation error
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::ValidationError(reason.into())
    }
}
