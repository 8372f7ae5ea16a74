//! # Session Protocol
//!
//! The two-step handshake/login exchange that opens a session.
//!
//! ## Flow
//! ```text
//! client -> Handshake("user;host;port")
//! server -> Handshake(connection hash) | Kick(reason)
//! client -> Login(user, protocol version)
//! server -> Login(entity id, world) | Kick(reason)
//! ```

pub mod handshake;
