//! Scripted in-process server used by the integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use mcbot_net::config::ClientConfig;
use mcbot_net::core::codec::PacketCodec;
use mcbot_net::core::packet::{Login, Packet};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

pub type ServerConn = Framed<TcpStream, PacketCodec>;

/// Upper bound for any single wait in a test.
pub const TEST_WAIT: Duration = Duration::from_secs(5);

pub async fn bind() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

pub async fn accept(listener: &TcpListener) -> ServerConn {
    let (stream, _) = tokio::time::timeout(TEST_WAIT, listener.accept())
        .await
        .expect("client never connected")
        .unwrap();
    Framed::new(stream, PacketCodec)
}

/// Next packet from the client; `None` once the client closed the socket.
pub async fn recv(server: &mut ServerConn) -> Option<Packet> {
    tokio::time::timeout(TEST_WAIT, server.next())
        .await
        .expect("client went quiet")
        .map(|packet| packet.expect("client sent a malformed packet"))
}

pub async fn send(server: &mut ServerConn, packet: Packet) {
    server.send(packet).await.unwrap();
}

/// Answer both handshake steps with acceptance, checking the requests.
pub async fn accept_session(server: &mut ServerConn, username: &str, port: u16) {
    let handshake = recv(server).await.expect("no handshake");
    assert_eq!(
        handshake,
        Packet::Handshake {
            data: format!("{username};127.0.0.1;{port}")
        }
    );
    send(server, Packet::Handshake { data: "-".into() }).await;

    match recv(server).await.expect("no login") {
        Packet::Login(login) => {
            assert_eq!(login.username, username);
            assert_eq!(login.entity_id, 29);
        }
        other => panic!("expected login request, got {other:?}"),
    }
    send(
        server,
        Packet::Login(Login {
            entity_id: 42,
            level_type: "default".into(),
            dimension: 0,
            max_players: 20,
            world_height: 128,
            ..Login::default()
        }),
    )
    .await;
}

pub fn fast_config() -> ClientConfig {
    ClientConfig::default_with_overrides(|config| {
        config.timeout = Duration::from_secs(5);
        config.shutdown_timeout = Duration::from_millis(500);
    })
}
