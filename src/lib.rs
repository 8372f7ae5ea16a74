//! # mcbot-net
//!
//! Connection core for bots speaking the legacy block-game protocol
//! (protocol version 29).
//!
//! A [`Connection`] opens a TCP socket, runs the two-step handshake/login
//! exchange, and then exchanges typed [`Packet`]s through two FIFO queues
//! serviced by background reader and writer tasks.
//!
//! ## Modules
//! - [`core`]: packet types and the wire codec
//! - [`protocol`]: handshake/login request building and response checks
//! - [`transport`]: socket setup and the reader/writer loops
//! - [`service`]: the connection state machine
//! - [`registry`]: injected collection of live connections
//! - [`auth`]: login service client
//! - [`config`], [`error`], [`utils`]: ambient support
//!
//! ## Example
//! ```no_run
//! use mcbot_net::{Connection, Registry};
//!
//! #[tokio::main]
//! async fn main() -> mcbot_net::error::Result<()> {
//!     let registry = Registry::new();
//!     let conn = Connection::new("localhost", 25565, &registry);
//!     conn.set_username("bot1")?;
//!     conn.connect().await?;
//!     conn.send_message("hello");
//!     conn.disconnect().await
//! }
//! ```

pub mod auth;
pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod service;
pub mod transport;
pub mod utils;

pub use auth::{Authenticator, Credential, HttpAuthenticator};
pub use config::ClientConfig;
pub use crate::core::packet::Packet;
pub use error::{ConnectionError, Result};
pub use registry::{ConnectionId, Registry};
pub use service::connection::Connection;
pub use service::session::{ConnectionEvent, Task};
