use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::auth::Authenticator;
use crate::config::ClientConfig;
use crate::core::codec::check_string;
use crate::core::packet::Packet;
use crate::error::{constants, ConnectionError, Result};
use crate::protocol::handshake::{
    check_handshake_response, check_login_response, handshake_request, is_online_mode,
    login_request,
};
use crate::registry::{ConnectionId, Registry};
use crate::service::session::{ConnectionEvent, SessionState};
use crate::transport::{self, reader::Reader, writer::Writer};
use crate::utils::timeout::with_timeout;

/// Extra time given to the loops on top of the configured shutdown timeout.
const JOIN_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Default)]
struct Identity {
    username: Option<String>,
    session_id: Option<String>,
}

// Poisoning only happens if a holder panicked; the guarded data stays valid.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A single session with a server.
///
/// A `Connection` is good for one connect/disconnect cycle. Packets are
/// exchanged through two unbounded FIFO queues serviced by a reader and a
/// writer task; the application only ever touches the queues.
///
/// # Example
/// ```no_run
/// use mcbot_net::{Connection, Registry};
///
/// # async fn run() -> mcbot_net::error::Result<()> {
/// let registry = Registry::new();
/// let conn = Connection::new("example.com", 25565, &registry);
/// conn.set_username("bot1")?;
/// conn.connect().await?;
/// conn.send_message("hello");
/// while let Some(packet) = conn.get_packet().await? {
///     println!("{packet:?}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct Connection {
    host: String,
    port: u16,
    config: ClientConfig,
    identity: RwLock<Identity>,
    session: Arc<SessionState>,
    outbound_tx: mpsc::UnboundedSender<Packet>,
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Packet>>>,
    inbound_tx: Mutex<Option<mpsc::UnboundedSender<Packet>>>,
    inbound_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Packet>>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<ConnectionEvent>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Connection {
    /// Prepare a session for `host:port` with the default configuration.
    ///
    /// Does not touch the network; see [`Connection::connect`].
    pub fn new(host: impl Into<String>, port: u16, registry: &Arc<Registry>) -> Self {
        Self::with_config(host, port, ClientConfig::default(), registry)
    }

    pub fn with_config(
        host: impl Into<String>,
        port: u16,
        config: ClientConfig,
        registry: &Arc<Registry>,
    ) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let session = Arc::new(SessionState::new(
            registry.next_id(),
            Arc::clone(registry),
            events_tx,
        ));
        registry.register(&session);

        Self {
            host: host.into(),
            port,
            config,
            identity: RwLock::new(Identity::default()),
            session,
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            inbound_tx: Mutex::new(Some(inbound_tx)),
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            events_rx: Mutex::new(Some(events_rx)),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.session.id()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    pub fn username(&self) -> Option<String> {
        self.identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .username
            .clone()
    }

    pub fn session_id(&self) -> Option<String> {
        self.identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .session_id
            .clone()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Reason given to the teardown, once the connection has been shut down.
    pub fn shutdown_reason(&self) -> Option<&str> {
        self.session.shutdown_reason()
    }

    /// Receiver for loop failures and teardown notices. Handed out once.
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<ConnectionEvent>> {
        lock(&self.events_rx).take()
    }

    /// Log in at the account service, storing the returned username and session id.
    ///
    /// Both values are replaced together, even if a username was set before.
    ///
    /// # Errors
    /// `ConnectionError::Auth` if the service is unreachable or refuses the
    /// credentials; nothing is stored in that case.
    #[instrument(skip(self, authenticator, password), fields(connection = %self.id()))]
    pub async fn login<A>(&self, authenticator: &A, user: &str, password: &str) -> Result<()>
    where
        A: Authenticator + ?Sized,
    {
        let credential = authenticator.authenticate(user, password).await?;

        let mut identity = self.identity.write().unwrap_or_else(PoisonError::into_inner);
        identity.username = Some(credential.username);
        identity.session_id = Some(credential.session_id);
        info!(username = ?identity.username, "Logged in");
        Ok(())
    }

    /// Set the username for an offline-mode session.
    ///
    /// # Errors
    /// `ConnectionError::InvalidState` if a username is already set.
    pub fn set_username(&self, username: impl Into<String>) -> Result<&Self> {
        let mut identity = self.identity.write().unwrap_or_else(PoisonError::into_inner);
        if identity.username.is_some() {
            return Err(ConnectionError::InvalidState(constants::ERR_USERNAME_SET));
        }
        identity.username = Some(username.into());
        Ok(self)
    }

    /// Open the socket, start the I/O loops and complete the handshake.
    ///
    /// Returns once the server has accepted the login. Every wait on the server
    /// is bounded by the configured timeout.
    ///
    /// # Errors
    /// - `InvalidState` if already connected, previously closed, or no username is set
    /// - `StringTooLong` if the username and host do not fit in a handshake request;
    ///   nothing is sent and the connection can still be used
    /// - `Io`/`Timeout` if the socket cannot be opened or the server goes quiet
    /// - `Disconnected`/`UnexpectedPacket` if the server refuses the session;
    ///   the connection is shut down before returning
    #[instrument(skip(self), fields(connection = %self.id(), host = %self.host, port = self.port))]
    pub async fn connect(&self) -> Result<()> {
        self.session.begin_connect()?;

        let Some(username) = self.username() else {
            self.session.abort_connect();
            return Err(ConnectionError::InvalidState(
                constants::ERR_USERNAME_MISSING,
            ));
        };

        // Refuse up front what the writer could never encode.
        let request = handshake_request(&username, &self.host, self.port);
        if let Packet::Handshake { data } = &request {
            if let Err(e) = check_string(data) {
                self.session.abort_connect();
                warn!(error = %e, "Handshake request too long");
                return Err(e);
            }
        }

        let stream = match transport::open(&self.host, self.port, &self.config).await {
            Ok(stream) => stream,
            Err(e) => {
                self.session.abort_connect();
                self.session.metrics().connection_error();
                warn!(error = %e, "Failed to open socket");
                return Err(e);
            }
        };

        self.session.mark_connected();
        self.start_loops(stream);

        let metrics = self.session.metrics();
        metrics.handshake_attempt();
        match self.handshake(&username, request).await {
            Ok(()) => {
                metrics.handshake_success();
                info!(username = %username, "Session established");
                Ok(())
            }
            Err(e) => {
                metrics.handshake_failed();
                if e.is_protocol() {
                    metrics.protocol_error();
                }
                let reason = match &e {
                    ConnectionError::Timeout => constants::REASON_HANDSHAKE_TIMEOUT.to_string(),
                    e if e.is_protocol() => e.to_string(),
                    e => format!("Handshake failed: {e}"),
                };
                self.session.shutdown(&reason);
                Err(e)
            }
        }
    }

    fn start_loops(&self, stream: TcpStream) {
        let (read_half, write_half) = stream.into_split();
        let mut tasks = lock(&self.tasks);

        if let Some(inbound) = lock(&self.inbound_tx).take() {
            let reader = Reader::new(
                read_half,
                inbound,
                Arc::clone(&self.session),
                self.config.timeout,
            );
            tasks.push(tokio::spawn(reader.run()));
        }

        if let Some(outbound) = lock(&self.outbound_rx).take() {
            let writer = Writer::new(
                write_half,
                outbound,
                Arc::clone(&self.session),
                self.config.shutdown_timeout,
            );
            tasks.push(tokio::spawn(writer.run()));
        }
        debug!(tasks = tasks.len(), "I/O loops started");
    }

    async fn handshake(&self, username: &str, request: Packet) -> Result<()> {
        self.send_packet(request);
        let response = self.next_handshake_packet().await?;
        let connection_hash = check_handshake_response(&response)?;

        if is_online_mode(connection_hash) {
            // Session verification against the account service is not performed.
            warn!(
                connection_hash,
                has_session = self.session_id().is_some(),
                "Server is in online mode; it may reject the login"
            );
        }

        self.send_packet(login_request(username, self.config.protocol_version));
        let response = self.next_handshake_packet().await?;
        check_login_response(&response)?;
        Ok(())
    }

    async fn next_handshake_packet(&self) -> Result<Packet> {
        let mut inbound = self.inbound_rx.lock().await;
        with_timeout(inbound.recv(), self.config.timeout)
            .await?
            .ok_or(ConnectionError::ConnectionClosed)
    }

    /// Queue `packet` for the writer. Never blocks.
    ///
    /// Packets queued before [`Connection::connect`] are sent once the socket is
    /// open; packets queued after shutdown are dropped.
    pub fn send_packet(&self, packet: Packet) {
        if self.outbound_tx.send(packet).is_err() {
            debug!(connection = %self.id(), "Outbound queue closed, packet dropped");
        }
    }

    /// Queue a chat message.
    pub fn send_message(&self, message: &str) {
        self.send_packet(Packet::chat(message));
    }

    /// Wait for the next packet from the server.
    ///
    /// Returns `Ok(None)` if the connection is shut down while this call is
    /// waiting. Once shut down, later calls fail instead, so packets still
    /// queued at teardown (such as a server kick) only reach a caller that was
    /// already waiting.
    ///
    /// # Errors
    /// `ConnectionError::InvalidState` if not connected.
    pub async fn get_packet(&self) -> Result<Option<Packet>> {
        if !self.is_connected() {
            return Err(ConnectionError::InvalidState(constants::ERR_NOT_CONNECTED));
        }

        let mut inbound = self.inbound_rx.lock().await;
        tokio::select! {
            biased;
            packet = inbound.recv() => Ok(packet),
            _ = self.session.cancelled() => Ok(None),
        }
    }

    /// Tear the connection down with `reason`. Idempotent; never fails.
    pub fn shutdown(&self, reason: &str) {
        self.session.shutdown(reason);
    }

    /// Leave the server gracefully.
    ///
    /// Queues a kick with reason "Quitting", then shuts down with reason "Quit"
    /// and waits for the writer to flush and close the socket.
    ///
    /// # Errors
    /// `ConnectionError::InvalidState` if not connected.
    #[instrument(skip(self), fields(connection = %self.id()))]
    pub async fn disconnect(&self) -> Result<()> {
        if !self.is_connected() {
            return Err(ConnectionError::InvalidState(constants::ERR_NOT_CONNECTED));
        }

        self.send_packet(Packet::kick(constants::REASON_QUITTING));
        self.session.shutdown(constants::REASON_QUIT);
        self.join_loops().await;
        Ok(())
    }

    /// Wait for both loops to finish, aborting any that overrun the shutdown timeout.
    async fn join_loops(&self) {
        let tasks = std::mem::take(&mut *lock(&self.tasks));
        let limit = self.config.shutdown_timeout + JOIN_GRACE;

        for mut task in tasks {
            if tokio::time::timeout(limit, &mut task).await.is_err() {
                warn!(connection = %self.id(), "I/O loop did not stop in time, aborting");
                task.abort();
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if !self.session.shutdown(constants::REASON_DROPPED) {
            self.session.registry().deregister(self.session.id());
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id())
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username())
            .field("connected", &self.is_connected())
            .field("shutdown_reason", &self.shutdown_reason())
            .finish()
    }
}
