//! Login service client and credential handling

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use async_trait::async_trait;
use mcbot_net::auth::{parse_login_response, Authenticator, Credential, HttpAuthenticator};
use mcbot_net::error::{constants, ConnectionError, Result};
use mcbot_net::{ClientConfig, Connection, Registry};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serve one HTTP request, answering with `status` and `body`.
/// Resolves to the raw request text.
async fn one_shot_http(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 1024];

        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending a full request");
            request.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&request).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if request.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();
        String::from_utf8_lossy(&request).to_string()
    });

    (url, handle)
}

struct StaticAuthenticator(&'static str);

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, _user: &str, _password: &str) -> Result<Credential> {
        parse_login_response(self.0)
    }
}

#[test]
fn test_parse_success() {
    let credential = parse_login_response("1343825972000:deprecated:Notch:abc123def\n").unwrap();
    assert_eq!(credential.username, "Notch");
    assert_eq!(credential.session_id, "abc123def");
}

#[test]
fn test_parse_failure_markers() {
    for (body, message) in [
        ("Bad login", constants::ERR_AUTH_BAD_LOGIN),
        ("Old version\n", constants::ERR_AUTH_OLD_VERSION),
        ("Account migrated, use e-mail as username.", "Account migrated, use e-mail as username."),
    ] {
        match parse_login_response(body) {
            Err(ConnectionError::Auth(got)) => assert_eq!(got, message),
            other => panic!("expected auth error for {body:?}, got {other:?}"),
        }
    }
}

#[test]
fn test_parse_too_few_fields() {
    assert!(matches!(
        parse_login_response("13:ticket"),
        Err(ConnectionError::Auth(ref m)) if m == constants::ERR_AUTH_MALFORMED
    ));
}

#[test]
fn test_credential_debug_hides_session() {
    let credential = Credential {
        username: "bot".into(),
        session_id: "secret-token".into(),
    };
    let printed = format!("{credential:?}");
    assert!(printed.contains("bot"));
    assert!(!printed.contains("secret-token"));
}

#[tokio::test]
async fn test_http_login_rejected() {
    let (url, server) = one_shot_http("200 OK", "Bad login").await;
    let auth = HttpAuthenticator::new(url, 13);
    let registry = Registry::new();
    let conn = Connection::new("example.com", 25565, &registry);

    let err = conn
        .login(&auth, "user@example.com", "wrongpass")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ConnectionError::Auth(ref m) if m == constants::ERR_AUTH_BAD_LOGIN
    ));
    assert!(conn.username().is_none());
    assert!(conn.session_id().is_none());

    let request = server.await.unwrap();
    assert!(request.starts_with("POST / "));
    assert!(request.contains("user=user%40example.com"));
    assert!(request.contains("password=wrongpass"));
    assert!(request.contains("version=13"));
}

#[tokio::test]
async fn test_http_login_success_stores_credential() {
    let (url, server) = one_shot_http("200 OK", "1343825972000:deprecated:bot3:5f3c:9\n").await;
    let auth = HttpAuthenticator::new(url, 13);
    let registry = Registry::new();
    let conn = Connection::new("example.com", 25565, &registry);

    conn.login(&auth, "bot3@example.com", "hunter2").await.unwrap();

    assert_eq!(conn.username().as_deref(), Some("bot3"));
    assert_eq!(conn.session_id().as_deref(), Some("5f3c"));
    server.await.unwrap();

    // A logged-in username counts as set.
    assert!(matches!(
        conn.set_username("other"),
        Err(ConnectionError::InvalidState(constants::ERR_USERNAME_SET))
    ));
}

#[tokio::test]
async fn test_http_error_status_is_unreachable() {
    let (url, server) = one_shot_http("503 Service Unavailable", "down").await;
    let auth = HttpAuthenticator::new(url, 13);

    let err = auth.authenticate("user", "pass").await.unwrap_err();
    assert!(matches!(
        err,
        ConnectionError::Auth(ref m) if m == constants::ERR_AUTH_UNREACHABLE
    ));
    server.await.unwrap();
}

#[tokio::test]
async fn test_authenticator_from_config() {
    let (url, server) = one_shot_http("200 OK", "1:x:bot9:sess9").await;
    let config = ClientConfig::default_with_overrides(|c| {
        c.auth_url = url.clone();
        c.launcher_version = 14;
    });

    let auth = HttpAuthenticator::from_config(&config);
    assert_eq!(auth.url(), url);

    let credential = auth.authenticate("bot9", "pw").await.unwrap();
    assert_eq!(credential.session_id, "sess9");
    assert!(server.await.unwrap().contains("version=14"));
}

#[tokio::test]
async fn test_unreachable_service() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/", listener.local_addr().unwrap());
    drop(listener);

    let err = HttpAuthenticator::new(url, 13)
        .authenticate("user", "pass")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ConnectionError::Auth(ref m) if m == constants::ERR_AUTH_UNREACHABLE
    ));
}

#[tokio::test]
async fn test_login_overwrites_username_and_session() {
    let registry = Registry::new();
    let conn = Connection::new("example.com", 25565, &registry);
    conn.set_username("offline").unwrap();

    conn.login(&StaticAuthenticator("1:x:online:token"), "u", "p")
        .await
        .unwrap();

    assert_eq!(conn.username().as_deref(), Some("online"));
    assert_eq!(conn.session_id().as_deref(), Some("token"));
}

#[tokio::test]
async fn test_dyn_authenticator() {
    let registry = Registry::new();
    let conn = Connection::new("example.com", 25565, &registry);
    let auth: Box<dyn Authenticator> = Box::new(StaticAuthenticator("Old version"));

    let err = conn.login(auth.as_ref(), "u", "p").await.unwrap_err();
    assert!(matches!(
        err,
        ConnectionError::Auth(ref m) if m == constants::ERR_AUTH_OLD_VERSION
    ));
}
