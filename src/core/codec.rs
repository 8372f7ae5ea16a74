//! Tokio codec for the legacy packet stream.
//!
//! There is no length prefix on the wire: a frame is complete once every
//! field of the packet kind named by its discriminant has arrived. Integers are
//! big-endian, strings are a signed 16-bit UTF-16 unit count followed by the
//! UTF-16BE units.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::core::packet::{ids, Login, Packet};
use crate::error::{ConnectionError, Result};

/// Longest string accepted in either direction, in UTF-16 units.
pub const MAX_STRING_LENGTH: usize = 256;

#[derive(Debug, Clone, Copy, Default)]
pub struct PacketCodec;

enum WireError {
    /// More bytes are needed before the frame can be parsed.
    Incomplete,
    Fatal(ConnectionError),
}

impl From<ConnectionError> for WireError {
    fn from(e: ConnectionError) -> Self {
        WireError::Fatal(e)
    }
}

type WireResult<T> = std::result::Result<T, WireError>;

/// Bounds-checked reader over a borrowed buffer. Never consumes the source.
struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, len: usize) -> WireResult<&'a [u8]> {
        let end = self.pos + len;
        if end > self.buf.len() {
            return Err(WireError::Incomplete);
        }
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn u8(&mut self) -> WireResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn i8(&mut self) -> WireResult<i8> {
        Ok(self.u8()? as i8)
    }

    fn i16(&mut self) -> WireResult<i16> {
        let mut bytes = self.take(2)?;
        Ok(bytes.get_i16())
    }

    fn i32(&mut self) -> WireResult<i32> {
        let mut bytes = self.take(4)?;
        Ok(bytes.get_i32())
    }

    fn i64(&mut self) -> WireResult<i64> {
        let mut bytes = self.take(8)?;
        Ok(bytes.get_i64())
    }

    fn string(&mut self) -> WireResult<String> {
        let len = self.i16()?;
        if len < 0 {
            return Err(ConnectionError::Decode(format!("negative string length {len}")).into());
        }
        let len = len as usize;
        if len > MAX_STRING_LENGTH {
            return Err(ConnectionError::StringTooLong(len).into());
        }

        let mut raw = self.take(len * 2)?;
        let mut units = Vec::with_capacity(len);
        while raw.has_remaining() {
            units.push(raw.get_u16());
        }

        String::from_utf16(&units)
            .map_err(|e| ConnectionError::Decode(format!("invalid UTF-16 string: {e}")).into())
    }

    fn position(&self) -> usize {
        self.pos
    }
}

fn read_packet(r: &mut WireReader<'_>) -> WireResult<Packet> {
    let id = r.u8()?;
    let packet = match id {
        ids::KEEP_ALIVE => Packet::KeepAlive { id: r.i32()? },
        ids::LOGIN => Packet::Login(Login {
            entity_id: r.i32()?,
            username: r.string()?,
            level_type: r.string()?,
            server_mode: r.i32()?,
            dimension: r.i32()?,
            difficulty: r.i8()?,
            world_height: r.u8()?,
            max_players: r.u8()?,
        }),
        ids::HANDSHAKE => Packet::Handshake { data: r.string()? },
        ids::CHAT => Packet::Chat {
            message: r.string()?,
        },
        ids::TIME_UPDATE => Packet::TimeUpdate { time: r.i64()? },
        ids::SPAWN_POSITION => Packet::SpawnPosition {
            x: r.i32()?,
            y: r.i32()?,
            z: r.i32()?,
        },
        ids::KICK_DISCONNECT => Packet::KickDisconnect {
            reason: r.string()?,
        },
        other => return Err(ConnectionError::UnknownPacket(other).into()),
    };
    Ok(packet)
}

/// Check that `value` fits in a wire string.
///
/// # Errors
/// `StringTooLong` with the UTF-16 length if it exceeds [`MAX_STRING_LENGTH`].
pub fn check_string(value: &str) -> Result<()> {
    let len = value.encode_utf16().count();
    if len > MAX_STRING_LENGTH {
        return Err(ConnectionError::StringTooLong(len));
    }
    Ok(())
}

fn put_string(dst: &mut BytesMut, value: &str) -> Result<()> {
    check_string(value)?;
    let units: Vec<u16> = value.encode_utf16().collect();

    dst.reserve(2 + units.len() * 2);
    dst.put_i16(units.len() as i16);
    for unit in units {
        dst.put_u16(unit);
    }
    Ok(())
}

impl Decoder for PacketCodec {
    type Item = Packet;
    type Error = ConnectionError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut reader = WireReader::new(&src[..]);
        match read_packet(&mut reader) {
            Ok(packet) => {
                let consumed = reader.position();
                src.advance(consumed);
                Ok(Some(packet))
            }
            Err(WireError::Incomplete) => Ok(None),
            Err(WireError::Fatal(e)) => Err(e),
        }
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = ConnectionError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<()> {
        let start = dst.len();
        let encoded = encode_packet(item, dst);
        if encoded.is_err() {
            // Never leave a partial frame behind.
            dst.truncate(start);
        }
        encoded
    }
}

fn encode_packet(item: Packet, dst: &mut BytesMut) -> Result<()> {
    dst.put_u8(item.id());
    match item {
        Packet::KeepAlive { id } => dst.put_i32(id),
        Packet::Login(login) => {
            dst.put_i32(login.entity_id);
            put_string(dst, &login.username)?;
            put_string(dst, &login.level_type)?;
            dst.put_i32(login.server_mode);
            dst.put_i32(login.dimension);
            dst.put_i8(login.difficulty);
            dst.put_u8(login.world_height);
            dst.put_u8(login.max_players);
        }
        Packet::Handshake { data } => put_string(dst, &data)?,
        Packet::Chat { message } => put_string(dst, &message)?,
        Packet::TimeUpdate { time } => dst.put_i64(time),
        Packet::SpawnPosition { x, y, z } => {
            dst.put_i32(x);
            dst.put_i32(y);
            dst.put_i32(z);
        }
        Packet::KickDisconnect { reason } => put_string(dst, &reason)?,
    }
    Ok(())
}
