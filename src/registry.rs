//! Collection of live connections.
//!
//! A [`Registry`] is created by the application and handed to every
//! [`Connection`](crate::service::connection::Connection) it builds. Connections
//! register on construction and deregister during teardown. The registry only
//! holds weak references, so it never keeps a connection alive.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, info};

use crate::service::session::SessionState;
use crate::utils::metrics::Metrics;

/// Identifier assigned by the registry at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    entries: Mutex<HashMap<ConnectionId, Weak<SessionState>>>,
    next_id: AtomicU64,
    metrics: Metrics,
}

impl Registry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    // A panic while holding the lock cannot leave the map half-updated.
    fn entries(&self) -> MutexGuard<'_, HashMap<ConnectionId, Weak<SessionState>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn next_id(&self) -> ConnectionId {
        ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub(crate) fn register(&self, session: &Arc<SessionState>) {
        self.entries().insert(session.id(), Arc::downgrade(session));
        debug!(connection = %session.id(), "Connection registered");
    }

    /// Remove `id`. Returns false if it was not registered.
    pub(crate) fn deregister(&self, id: ConnectionId) -> bool {
        let removed = self.entries().remove(&id).is_some();
        if removed {
            debug!(connection = %id, "Connection deregistered");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.entries().contains_key(&id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<_> = self.entries().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Shut down every connected entry with `reason`.
    ///
    /// Returns how many connections were actually torn down; entries that never
    /// connected stay registered.
    pub fn shutdown_all(&self, reason: &str) -> usize {
        // Teardown deregisters, so the lock must be released first.
        let live: Vec<Arc<SessionState>> = self.entries().values().filter_map(Weak::upgrade).collect();

        let closed = live.iter().filter(|session| session.shutdown(reason)).count();
        info!(closed, reason, "Shut down registered connections");
        self.metrics.log_metrics();
        closed
    }

    /// Counters shared by every connection in this registry.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}
