//! Typed packets of the legacy protocol.
//!
//! Every packet starts on the wire with a one-byte discriminant. Only the kinds
//! the connection core needs to reach and stay in a session are modelled here.

/// Packet discriminants
pub mod ids {
    pub const KEEP_ALIVE: u8 = 0x00;
    pub const LOGIN: u8 = 0x01;
    pub const HANDSHAKE: u8 = 0x02;
    pub const CHAT: u8 = 0x03;
    pub const TIME_UPDATE: u8 = 0x04;
    pub const SPAWN_POSITION: u8 = 0x06;
    pub const KICK_DISCONNECT: u8 = 0xFF;
}

/// Longest chat line the server accepts, in UTF-16 units; longer lines are cut.
pub const MAX_CHAT_LENGTH: usize = 119;

/// Login packet body.
///
/// The same layout travels in both directions: the client puts its protocol
/// version in `entity_id` and leaves the world fields zeroed, the server answers
/// with the player's entity id and the world parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Login {
    pub entity_id: i32,
    pub username: String,
    pub level_type: String,
    pub server_mode: i32,
    pub dimension: i32,
    pub difficulty: i8,
    pub world_height: u8,
    pub max_players: u8,
}

impl Login {
    /// Client-side login request with placeholder world fields.
    pub fn request(username: &str, protocol_version: i32) -> Self {
        Self {
            entity_id: protocol_version,
            username: username.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    KeepAlive { id: i32 },
    Login(Login),
    Handshake { data: String },
    Chat { message: String },
    TimeUpdate { time: i64 },
    SpawnPosition { x: i32, y: i32, z: i32 },
    KickDisconnect { reason: String },
}

impl Packet {
    /// Chat packet, cut to [`MAX_CHAT_LENGTH`] UTF-16 units.
    ///
    /// A character that would straddle the limit is dropped whole.
    pub fn chat(message: &str) -> Self {
        let mut units = 0;
        let end = message
            .char_indices()
            .find_map(|(offset, c)| {
                units += c.len_utf16();
                (units > MAX_CHAT_LENGTH).then_some(offset)
            })
            .unwrap_or(message.len());

        Packet::Chat {
            message: message[..end].to_string(),
        }
    }

    pub fn kick(reason: &str) -> Self {
        Packet::KickDisconnect {
            reason: reason.to_string(),
        }
    }

    /// Discriminant written in front of the packet body.
    #[inline]
    pub fn id(&self) -> u8 {
        match self {
            Packet::KeepAlive { .. } => ids::KEEP_ALIVE,
            Packet::Login(_) => ids::LOGIN,
            Packet::Handshake { .. } => ids::HANDSHAKE,
            Packet::Chat { .. } => ids::CHAT,
            Packet::TimeUpdate { .. } => ids::TIME_UPDATE,
            Packet::SpawnPosition { .. } => ids::SPAWN_POSITION,
            Packet::KickDisconnect { .. } => ids::KICK_DISCONNECT,
        }
    }

    /// Human-readable kind, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Packet::KeepAlive { .. } => "KeepAlive",
            Packet::Login(_) => "Login",
            Packet::Handshake { .. } => "Handshake",
            Packet::Chat { .. } => "Chat",
            Packet::TimeUpdate { .. } => "TimeUpdate",
            Packet::SpawnPosition { .. } => "SpawnPosition",
            Packet::KickDisconnect { .. } => "KickDisconnect",
        }
    }

    /// Reason carried by a kick, if this is one.
    pub fn kick_reason(&self) -> Option<&str> {
        match self {
            Packet::KickDisconnect { reason } => Some(reason),
            _ => None,
        }
    }
}
