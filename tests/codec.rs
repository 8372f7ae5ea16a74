//! Wire codec behaviour: framing, strings and malformed input

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use bytes::BytesMut;
use mcbot_net::core::codec::{check_string, PacketCodec, MAX_STRING_LENGTH};
use mcbot_net::core::packet::{ids, Login, Packet, MAX_CHAT_LENGTH};
use mcbot_net::error::ConnectionError;
use tokio_util::codec::{Decoder, Encoder};

fn encode(packet: Packet) -> BytesMut {
    let mut buf = BytesMut::new();
    PacketCodec.encode(packet, &mut buf).unwrap();
    buf
}

#[test]
fn test_handshake_wire_layout() {
    let buf = encode(Packet::Handshake {
        data: "a;b;1".into(),
    });

    let mut expected = vec![ids::HANDSHAKE, 0x00, 0x05];
    for unit in "a;b;1".encode_utf16() {
        expected.extend_from_slice(&unit.to_be_bytes());
    }
    assert_eq!(&buf[..], &expected[..]);
}

#[test]
fn test_login_request_wire_layout() {
    let buf = encode(Packet::Login(Login::request("bot", 29)));

    assert_eq!(buf[0], ids::LOGIN);
    assert_eq!(&buf[1..5], &29i32.to_be_bytes());
    assert_eq!(&buf[5..7], &3i16.to_be_bytes());
    // id + version + name + empty level type + mode + dimension + 3 bytes
    assert_eq!(buf.len(), 1 + 4 + (2 + 6) + 2 + 4 + 4 + 3);
}

#[test]
fn test_partial_frame_waits_for_more_bytes() {
    let full = encode(Packet::Chat {
        message: "hello there".into(),
    });
    let mut codec = PacketCodec;

    for split in 0..full.len() {
        let mut buf = BytesMut::from(&full[..split]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), split, "partial frames must not be consumed");
    }

    let mut buf = full.clone();
    assert_eq!(
        codec.decode(&mut buf).unwrap(),
        Some(Packet::Chat {
            message: "hello there".into()
        })
    );
    assert!(buf.is_empty());
}

#[test]
fn test_back_to_back_frames() {
    let mut buf = encode(Packet::KeepAlive { id: 7 });
    buf.extend_from_slice(&encode(Packet::TimeUpdate { time: 24_000 }));
    buf.extend_from_slice(&encode(Packet::SpawnPosition { x: 1, y: 64, z: -3 }));

    let mut codec = PacketCodec;
    assert_eq!(
        codec.decode(&mut buf).unwrap(),
        Some(Packet::KeepAlive { id: 7 })
    );
    assert_eq!(
        codec.decode(&mut buf).unwrap(),
        Some(Packet::TimeUpdate { time: 24_000 })
    );
    assert_eq!(
        codec.decode(&mut buf).unwrap(),
        Some(Packet::SpawnPosition { x: 1, y: 64, z: -3 })
    );
    assert!(codec.decode(&mut buf).unwrap().is_none());
}

#[test]
fn test_server_login_reply_decodes() {
    let reply = Login {
        entity_id: 1234,
        username: String::new(),
        level_type: "default".into(),
        server_mode: 1,
        dimension: -1,
        difficulty: 2,
        world_height: 128,
        max_players: 20,
    };
    let mut buf = encode(Packet::Login(reply.clone()));

    assert_eq!(
        PacketCodec.decode(&mut buf).unwrap(),
        Some(Packet::Login(reply))
    );
}

#[test]
fn test_unknown_packet_id_rejected() {
    let mut buf = BytesMut::from(&[0x42u8, 0, 0, 0][..]);
    assert!(matches!(
        PacketCodec.decode(&mut buf),
        Err(ConnectionError::UnknownPacket(0x42))
    ));
}

#[test]
fn test_negative_string_length_rejected() {
    let mut buf = BytesMut::from(&[ids::CHAT, 0xFF, 0xFF][..]);
    assert!(matches!(
        PacketCodec.decode(&mut buf),
        Err(ConnectionError::Decode(_))
    ));
}

#[test]
fn test_oversized_string_rejected_before_payload_arrives() {
    let mut buf = BytesMut::from(&[ids::KICK_DISCONNECT][..]);
    buf.extend_from_slice(&300i16.to_be_bytes());

    assert!(matches!(
        PacketCodec.decode(&mut buf),
        Err(ConnectionError::StringTooLong(300))
    ));
}

#[test]
fn test_oversized_string_not_encoded() {
    let reason = "x".repeat(MAX_STRING_LENGTH + 1);
    let mut buf = BytesMut::new();

    let result = PacketCodec.encode(Packet::kick(&reason), &mut buf);
    assert!(matches!(result, Err(ConnectionError::StringTooLong(n)) if n == MAX_STRING_LENGTH + 1));
    assert!(buf.is_empty(), "partial frame left in buffer: {buf:?}");
}

#[test]
fn test_failed_encode_keeps_earlier_frames() {
    let mut buf = encode(Packet::KeepAlive { id: 3 });
    let before = buf.len();

    let login = Login {
        username: "u".repeat(MAX_STRING_LENGTH + 5),
        ..Login::default()
    };
    assert!(PacketCodec.encode(Packet::Login(login), &mut buf).is_err());
    assert_eq!(buf.len(), before);
    assert_eq!(
        PacketCodec.decode(&mut buf).unwrap(),
        Some(Packet::KeepAlive { id: 3 })
    );
}

#[test]
fn test_check_string_counts_utf16_units() {
    assert!(check_string(&"x".repeat(MAX_STRING_LENGTH)).is_ok());
    // 129 emoji are 258 UTF-16 units but only 129 chars.
    assert!(matches!(
        check_string(&"\u{1F600}".repeat(129)),
        Err(ConnectionError::StringTooLong(258))
    ));
}

#[test]
fn test_invalid_utf16_rejected() {
    // Lone high surrogate
    let mut buf = BytesMut::from(&[ids::CHAT, 0x00, 0x01, 0xD8, 0x00][..]);
    assert!(matches!(
        PacketCodec.decode(&mut buf),
        Err(ConnectionError::Decode(_))
    ));
}

#[test]
fn test_surrogate_pairs_survive() {
    let message = "caf\u{e9} \u{1F600}";
    let mut buf = encode(Packet::Chat {
        message: message.into(),
    });

    // The emoji takes two UTF-16 units.
    assert_eq!(&buf[1..3], &7i16.to_be_bytes());
    assert_eq!(
        PacketCodec.decode(&mut buf).unwrap(),
        Some(Packet::Chat {
            message: message.into()
        })
    );
}

#[test]
fn test_chat_constructor_truncates() {
    let long = "a".repeat(MAX_CHAT_LENGTH + 30);
    match Packet::chat(&long) {
        Packet::Chat { message } => assert_eq!(message.chars().count(), MAX_CHAT_LENGTH),
        other => panic!("expected chat, got {other:?}"),
    }
}

#[test]
fn test_chat_truncates_on_utf16_units() {
    let emoji = "\u{1F600}".repeat(124);
    match Packet::chat(&emoji) {
        Packet::Chat { message } => {
            // 59 pairs fit in 118 units; the 60th would straddle the limit.
            assert_eq!(message.encode_utf16().count(), 118);
            assert_eq!(message.chars().count(), 59);
        }
        other => panic!("expected chat, got {other:?}"),
    }

    let mixed = format!("{}\u{1F600}tail", "a".repeat(MAX_CHAT_LENGTH - 2));
    match Packet::chat(&mixed) {
        Packet::Chat { message } => {
            assert_eq!(message.encode_utf16().count(), MAX_CHAT_LENGTH);
            assert!(message.ends_with('\u{1F600}'));
        }
        other => panic!("expected chat, got {other:?}"),
    }

    let short = "hi \u{1F600}";
    assert_eq!(
        Packet::chat(short),
        Packet::Chat {
            message: short.to_string()
        }
    );
}

#[test]
fn test_packet_ids() {
    assert_eq!(Packet::kick("bye").id(), 0xFF);
    assert_eq!(Packet::chat("hi").id(), 0x03);
    assert_eq!(Packet::Handshake { data: "-".into() }.id(), 0x02);
    assert_eq!(Packet::Login(Login::default()).id(), 0x01);
    assert_eq!(Packet::kick("bye").kick_reason(), Some("bye"));
    assert_eq!(Packet::chat("hi").kick_reason(), None);
}
