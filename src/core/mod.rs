//! # Core Protocol Components
//!
//! Typed packets and the codec that frames them over a byte stream.
//!
//! ## Components
//! - **Packet**: enum of packet kinds, each identified by a one-byte discriminant
//! - **Codec**: Tokio codec for framing over byte streams
//!
//! ## Wire Format
//! ```text
//! [Id(1)] [Fields(N)]
//! ```
//!
//! Field layout is fixed per packet kind; strings carry their own length.
//!
//! ## Security
//! - Strings longer than 256 UTF-16 units are rejected before allocation
//! - Unknown discriminants fail the stream instead of being skipped

pub mod codec;
pub mod packet;
