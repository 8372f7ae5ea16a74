//! Handshake and login packet construction and response checks.
//!
//! The exchange itself is driven by [`Connection::connect`]; this module holds
//! the pure parts so they can be tested without a socket.
//!
//! [`Connection::connect`]: crate::service::connection::Connection::connect

use crate::core::packet::{ids, Login, Packet};
use crate::error::{ConnectionError, Result};

use tracing::{debug, warn};

/// Connection hash sent by servers that do not verify sessions.
pub const OFFLINE_MODE_HASH: &str = "-";

/// Build the first request: `"username;host;port"` in a handshake packet.
pub fn handshake_request(username: &str, host: &str, port: u16) -> Packet {
    Packet::Handshake {
        data: format!("{username};{host};{port}"),
    }
}

/// Build the login request. World fields are placeholders the server ignores.
pub fn login_request(username: &str, protocol_version: i32) -> Packet {
    Packet::Login(Login::request(username, protocol_version))
}

/// Map a refusal to an error: kicks carry their reason, anything else is unexpected.
fn refusal(step: &'static str, expected: u8, response: &Packet) -> ConnectionError {
    let error = match response.kick_reason() {
        Some(reason) => ConnectionError::Disconnected {
            reason: reason.to_string(),
        },
        None => ConnectionError::UnexpectedPacket(response.id()),
    };

    warn!(
        step,
        expected,
        received = response.id(),
        error = %error,
        "Server refused session"
    );
    error
}

/// Validate the handshake acknowledgement, returning the connection hash.
///
/// # Errors
/// `Disconnected` if the server kicked us, `UnexpectedPacket` for any other kind.
pub fn check_handshake_response(response: &Packet) -> Result<&str> {
    match response {
        Packet::Handshake { data } => {
            debug!(connection_hash = %data, "Handshake acknowledged");
            Ok(data)
        }
        other => Err(refusal("handshake", ids::HANDSHAKE, other)),
    }
}

/// Validate the login reply, returning the server's login body.
///
/// # Errors
/// `Disconnected` if the server kicked us, `UnexpectedPacket` for any other kind.
pub fn check_login_response(response: &Packet) -> Result<&Login> {
    match response {
        Packet::Login(login) => {
            debug!(entity_id = login.entity_id, "Login accepted");
            Ok(login)
        }
        other => Err(refusal("login", ids::LOGIN, other)),
    }
}

/// Whether the server asked for session verification.
pub fn is_online_mode(connection_hash: &str) -> bool {
    connection_hash != OFFLINE_MODE_HASH
}
