//! Registry bookkeeping and bulk shutdown

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{accept, accept_session, bind, fast_config, recv};
use mcbot_net::{Connection, Registry};

#[tokio::test]
async fn test_ids_are_unique_and_sorted() {
    let registry = Registry::new();
    let a = Connection::new("a.example", 25565, &registry);
    let b = Connection::new("b.example", 25565, &registry);
    let c = Connection::new("c.example", 25565, &registry);

    assert_ne!(a.id(), b.id());
    assert_eq!(registry.ids(), vec![a.id(), b.id(), c.id()]);
    assert_eq!(a.id().as_u64() + 1, b.id().as_u64());
    assert_eq!(c.id().to_string(), format!("conn-{}", c.id().as_u64()));
    assert_eq!(registry.len(), 3);

    drop(b);
    assert_eq!(registry.ids(), vec![a.id(), c.id()]);
}

#[tokio::test]
async fn test_registries_are_independent() {
    let first = Registry::new();
    let second = Registry::new();
    let conn = Connection::new("example.com", 25565, &first);

    assert!(first.contains(conn.id()));
    assert!(second.is_empty());
}

#[tokio::test]
async fn test_shutdown_all_closes_connected_entries() {
    let registry = Registry::new();
    let mut servers = Vec::new();
    let mut conns = Vec::new();

    for name in ["bot1", "bot2"] {
        let (listener, port) = bind().await;
        let conn = Connection::with_config("127.0.0.1", port, fast_config(), &registry);
        conn.set_username(name).unwrap();

        let server = tokio::spawn(async move {
            let mut server = accept(&listener).await;
            accept_session(&mut server, name, port).await;
            server
        });
        conn.connect().await.unwrap();
        servers.push(server.await.unwrap());
        conns.push(conn);
    }
    let idle = Connection::new("example.com", 25565, &registry);

    assert_eq!(registry.shutdown_all("Server restart"), 2);
    assert_eq!(registry.shutdown_all("Server restart"), 0);
    registry.metrics().log_metrics();

    for conn in &conns {
        assert!(!conn.is_connected());
        assert_eq!(conn.shutdown_reason(), Some("Server restart"));
    }
    assert_eq!(registry.ids(), vec![idle.id()]);

    for server in &mut servers {
        assert_eq!(recv(server).await, None, "socket should be closed");
    }
    assert_eq!(registry.metrics().snapshot().connections_active, 0);
}
