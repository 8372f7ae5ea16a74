//! # Client Service
//!
//! The application-facing [`Connection`](connection::Connection) and the state
//! it shares with its background tasks.

pub mod connection;
pub mod session;
