//! Error handling for Turnkit
//!
//! Provides error types for the layers of the application:
//! - Connection errors (opening and enumerating serial ports)
//! - Transport errors (I/O on an established connection)
//! - Command errors (invalid user-facing input)
//!
//! All error types use `thiserror` for ergonomic error handling. Nothing in
//! this taxonomy is process-fatal: every failure is returned to the calling
//! context, which decides whether to retry.

use thiserror::Error;

/// Connection error type
///
/// Represents failures establishing a serial connection to the turntable.
/// Fatal to the requested operation, never to the process.
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    /// Port does not exist on this system
    #[error("Port not found: {port}")]
    PortNotFound {
        /// The name of the port that was not found.
        port: String,
    },

    /// Port exists but the process may not open it
    #[error("Permission denied opening {port}")]
    PermissionDenied {
        /// The name of the port that was denied.
        port: String,
    },

    /// Failed to open port for any other reason
    #[error("Failed to open port {port}: {reason}")]
    FailedToOpen {
        /// The name of the port that failed to open.
        port: String,
        /// The reason the port failed to open.
        reason: String,
    },

    /// Port enumeration failed
    #[error("Failed to enumerate serial ports: {reason}")]
    EnumerationFailed {
        /// The reason enumeration failed.
        reason: String,
    },
}

/// Transport error type
///
/// Represents I/O faults on an open (or required-but-missing) connection.
/// A fault mid-exchange aborts the exchange; the connection is left as-is
/// for the caller to decide whether to reconnect.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// Operation attempted with no open connection
    #[error("Not connected")]
    NotConnected,

    /// Write to the device failed
    #[error("Write failed: {reason}")]
    Write {
        /// The reason the write failed.
        reason: String,
    },

    /// Read from the device failed
    #[error("Read failed: {reason}")]
    Read {
        /// The reason the read failed.
        reason: String,
    },

    /// Response bytes could not be decoded as text
    ///
    /// Recovered locally by skipping the offending line; an exchange
    /// continues past it.
    #[error("Undecodable response bytes: {reason}")]
    Decode {
        /// The reason decoding failed.
        reason: String,
    },
}

/// Command error type
///
/// Represents invalid user-facing input, rejected before any wire traffic.
#[derive(Error, Debug, Clone)]
pub enum CommandError {
    /// A numeric argument did not parse or is out of the accepted domain
    #[error("Invalid {what}: {value}")]
    InvalidArgument {
        /// What the argument was supposed to be (speed, position, ...).
        what: String,
        /// The rejected value, verbatim.
        value: String,
    },

    /// Relative rotation of zero turns
    #[error("Rotation count must be non-zero")]
    ZeroTurns,
}

/// Main error type for Turnkit
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Transport error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Command error
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a missing-connection error
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Error::Transport(TransportError::NotConnected))
    }

    /// Check if this is a recoverable decode error
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Transport(TransportError::Decode { .. }))
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }

    /// Check if this is an invalid-input error
    pub fn is_command_error(&self) -> bool {
        matches!(self, Error::Command(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
