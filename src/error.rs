//! # Error Types
//!
//! Error handling for the connection core.
//!
//! This module defines every error a caller can observe, from socket failures
//! to a server refusing the handshake.
//!
//! ## Error Categories
//! - **I/O Errors**: socket failures and bounded waits that elapsed
//! - **State Errors**: an operation invoked in the wrong lifecycle state
//! - **Protocol Errors**: kicks and unexpected packets during the handshake
//! - **Auth Errors**: the login service was unreachable or refused the credentials
//! - **Codec Errors**: malformed or unsupported data on the wire
//!
//! ## Example Usage
//! ```rust
//! use mcbot_net::error::{ConnectionError, Result};
//! use tracing::{error, info};
//!
//! fn check(reason: Option<&str>) -> Result<()> {
//!     match reason {
//!         Some(reason) => Err(ConnectionError::Disconnected {
//!             reason: reason.to_string(),
//!         }),
//!         None => Ok(()),
//!     }
//! }
//!
//! fn main() {
//!     match check(Some("server full")) {
//!         Ok(()) => info!("Handshake accepted"),
//!         Err(e) => error!(error = %e, "Handshake refused"),
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Lifecycle errors
    pub const ERR_ALREADY_CONNECTED: &str = "Already connected to a server";
    pub const ERR_NOT_CONNECTED: &str = "Not connected to a server";
    pub const ERR_CONNECTION_USED: &str =
        "Connection has already been closed; create a new connection";
    pub const ERR_USERNAME_SET: &str = "Username has already been set for this connection";
    pub const ERR_USERNAME_MISSING: &str = "A username must be set before connecting";

    /// Auth errors
    pub const ERR_AUTH_UNREACHABLE: &str = "Can't connect to login server";
    pub const ERR_AUTH_BAD_LOGIN: &str = "Login failed";
    pub const ERR_AUTH_OLD_VERSION: &str = "Outdated launcher";
    pub const ERR_AUTH_MALFORMED: &str = "Malformed login response";

    /// Shutdown reasons
    pub const REASON_QUIT: &str = "Quit";
    pub const REASON_QUITTING: &str = "Quitting";
    pub const REASON_DROPPED: &str = "Connection dropped";
    pub const REASON_HANDSHAKE_TIMEOUT: &str = "Handshake timed out";
}

// ConnectionError is the primary error type for all connection operations
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    #[error("Disconnected by server: {reason}")]
    Disconnected { reason: String },

    #[error("Unexpected packet 0x{0:02X}")]
    UnexpectedPacket(u8),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout occurred")]
    Timeout,

    #[error("Unknown packet id 0x{0:02X}")]
    UnknownPacket(u8),

    #[error("String too long: {0} chars")]
    StringTooLong(usize),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ConnectionError {
    /// Whether the error originated from the transport (socket failures and elapsed waits).
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Timeout | Self::ConnectionClosed)
    }

    /// Whether the server refused the session during the handshake.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Disconnected { .. } | Self::UnexpectedPacket(_))
    }
}

/// Type alias for Results using ConnectionError
pub type Result<T> = std::result::Result<T, ConnectionError>;
