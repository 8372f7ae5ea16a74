//! # Account Authentication
//!
//! Exchanges account credentials for a session id at the login service.
//!
//! The service answers a form POST (`user`, `password`, `version`) with a
//! plain-text body: either `version:ticket:username:session_id` or a short
//! failure string such as `Bad login` or `Old version`.
//!
//! [`Authenticator`] is the seam a [`Connection`](crate::service::connection::Connection)
//! logs in through; [`HttpAuthenticator`] is the real implementation.

use std::fmt;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{constants, ConnectionError, Result};

/// Username and session id returned by the login service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub session_id: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("session_id", &"<redacted>")
            .finish()
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Exchange `user`/`password` for a credential.
    ///
    /// # Errors
    /// `ConnectionError::Auth` when the service is unreachable or refuses the login.
    async fn authenticate(&self, user: &str, password: &str) -> Result<Credential>;
}

/// Parse the login service's response body.
pub fn parse_login_response(body: &str) -> Result<Credential> {
    let body = body.trim();

    if !body.contains(':') {
        return Err(ConnectionError::Auth(match body {
            "Bad login" => constants::ERR_AUTH_BAD_LOGIN.to_string(),
            "Old version" => constants::ERR_AUTH_OLD_VERSION.to_string(),
            other => other.to_string(),
        }));
    }

    let fields: Vec<&str> = body.split(':').collect();
    match fields.as_slice() {
        [_, _, username, session_id, ..] if !username.trim().is_empty() => Ok(Credential {
            username: username.trim().to_string(),
            session_id: session_id.trim().to_string(),
        }),
        _ => Err(ConnectionError::Auth(
            constants::ERR_AUTH_MALFORMED.to_string(),
        )),
    }
}

/// Login service client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAuthenticator {
    client: reqwest::Client,
    url: String,
    launcher_version: u32,
}

impl HttpAuthenticator {
    pub fn new(url: impl Into<String>, launcher_version: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            launcher_version,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.auth_url.clone(), config.launcher_version)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, user: &str, password: &str) -> reqwest::Result<String> {
        let version = self.launcher_version.to_string();
        self.client
            .post(&self.url)
            .form(&[("user", user), ("password", password), ("version", version.as_str())])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl Authenticator for HttpAuthenticator {
    #[instrument(skip(self, password), fields(url = %self.url))]
    async fn authenticate(&self, user: &str, password: &str) -> Result<Credential> {
        let body = self.post(user, password).await.map_err(|e| {
            warn!(error = %e, "Login service request failed");
            ConnectionError::Auth(constants::ERR_AUTH_UNREACHABLE.to_string())
        })?;

        let credential = parse_login_response(&body)?;
        debug!(username = %credential.username, "Login service accepted credentials");
        Ok(credential)
    }
}
