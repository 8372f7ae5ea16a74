//! State shared between a connection and its reader/writer tasks.
//!
//! The lifecycle only ever moves forward:
//!
//! ```text
//! New -> Connecting -> Connected -> Closed
//!          |
//!          +-> New   (socket could not be opened)
//! ```
//!
//! `Connected -> Closed` happens exactly once, in [`SessionState::shutdown`],
//! which is the single teardown path for every trigger.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, info, warn};

use crate::error::{constants, ConnectionError, Result};
use crate::registry::{ConnectionId, Registry};
use crate::utils::metrics::Metrics;

const STATE_NEW: u8 = 0;
const STATE_CONNECTING: u8 = 1;
const STATE_CONNECTED: u8 = 2;
const STATE_CLOSED: u8 = 3;

/// Background task owned by a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Reader,
    Writer,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Reader => f.write_str("reader"),
            Task::Writer => f.write_str("writer"),
        }
    }
}

/// Out-of-band notifications for the owning application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A background task hit an error while the connection was open.
    LoopFailed { task: Task, error: String },
    /// The connection was torn down.
    Shutdown { reason: String },
}

#[derive(Debug)]
pub struct SessionState {
    id: ConnectionId,
    state: AtomicU8,
    shutdown_reason: OnceLock<String>,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    registry: Arc<Registry>,
}

impl SessionState {
    pub(crate) fn new(
        id: ConnectionId,
        registry: Arc<Registry>,
        events: mpsc::UnboundedSender<ConnectionEvent>,
    ) -> Self {
        Self {
            id,
            state: AtomicU8::new(STATE_NEW),
            shutdown_reason: OnceLock::new(),
            cancel: CancellationToken::new(),
            events,
            registry,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_connected(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_CONNECTED
    }

    pub fn is_closed(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_CLOSED
    }

    /// Reason recorded by the first teardown, if any.
    pub fn shutdown_reason(&self) -> Option<&str> {
        self.shutdown_reason.get().map(String::as_str)
    }

    pub fn metrics(&self) -> &Metrics {
        self.registry.metrics()
    }

    pub(crate) fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Resolves once teardown has started.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// Claim the connection for a connect attempt.
    pub(crate) fn begin_connect(&self) -> Result<()> {
        match self.state.compare_exchange(
            STATE_NEW,
            STATE_CONNECTING,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(()),
            Err(STATE_CLOSED) => Err(ConnectionError::InvalidState(
                constants::ERR_CONNECTION_USED,
            )),
            Err(_) => Err(ConnectionError::InvalidState(
                constants::ERR_ALREADY_CONNECTED,
            )),
        }
    }

    /// Give the claim back after the socket could not be opened.
    pub(crate) fn abort_connect(&self) {
        let _ = self.state.compare_exchange(
            STATE_CONNECTING,
            STATE_NEW,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub(crate) fn mark_connected(&self) {
        if self
            .state
            .compare_exchange(
                STATE_CONNECTING,
                STATE_CONNECTED,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            self.metrics().connection_established();
        }
    }

    /// Tear the connection down. Idempotent and infallible.
    ///
    /// Returns true for the call that performed the teardown, false when the
    /// connection was not connected.
    pub fn shutdown(&self, reason: &str) -> bool {
        if self
            .state
            .compare_exchange(
                STATE_CONNECTED,
                STATE_CLOSED,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return false;
        }

        let _ = self.shutdown_reason.set(reason.to_string());
        info!(connection = %self.id, reason, "Shutting down with reason");

        // Both loops drop their socket halves once they observe this.
        self.cancel.cancel();

        let _ = self.events.send(ConnectionEvent::Shutdown {
            reason: reason.to_string(),
        });
        self.metrics().connection_closed();
        self.registry.deregister(self.id);
        true
    }

    /// Report a loop failure. Errors after teardown are expected and dropped.
    pub(crate) fn loop_failed(&self, task: Task, error: &ConnectionError) {
        if !self.is_connected() {
            debug!(connection = %self.id, %task, error = %error, "Loop stopped after shutdown");
            return;
        }

        warn!(connection = %self.id, %task, error = %error, "Connection loop failed");
        self.metrics().connection_error();
        let _ = self.events.send(ConnectionEvent::LoopFailed {
            task,
            error: error.to_string(),
        });
        self.shutdown(&format!("{task} error: {error}"));
    }
}
