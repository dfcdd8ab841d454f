//! Registry of open push connections.
//!
//! Tracks every browser tab subscribed to reload notifications and fans a
//! message out to all of them. Each connection owns a small outbound queue;
//! broadcasting only enqueues, the socket task performs the actual write.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

/// Outbound queue depth per connection.
const OUTBOUND_CAPACITY: usize = 16;

/// Message pushed to browser clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReloadMessage {
    /// Reload the current page.
    Reload,
}

impl ReloadMessage {
    /// Wire representation, sent verbatim as a text frame.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reload => "reload",
        }
    }
}

/// Unique identity of a push connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Outcome of a single broadcast.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the message was queued for.
    pub delivered: usize,
    /// Connections that were already closed when their turn came.
    pub skipped: usize,
    /// Connections whose outbound queue rejected the message.
    pub failed: usize,
}

/// Registry-side view of a connection.
#[derive(Clone)]
struct Peer {
    open: Arc<AtomicBool>,
    outbound: mpsc::Sender<ReloadMessage>,
}

/// Set of open push connections.
///
/// Created at server start and shared through `Arc` with the upgrade handler
/// and the reload coordinator. Membership changes only through
/// [`accept`](Self::accept) and [`remove`](Self::remove); broadcasts iterate a
/// snapshot so concurrent joins and leaves never corrupt an in-flight fan-out.
#[derive(Default)]
pub struct ConnectionRegistry {
    peers: Mutex<HashMap<ConnectionId, Peer>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection.
    ///
    /// Called once the upgrade handshake has completed. The returned
    /// [`Connection`] removes itself from the registry when dropped.
    #[must_use]
    pub fn accept(self: &Arc<Self>) -> Connection {
        let id = ConnectionId::new();
        let open = Arc::new(AtomicBool::new(true));
        let (outbound, inbox) = mpsc::channel(OUTBOUND_CAPACITY);

        self.lock().insert(
            id,
            Peer {
                open: Arc::clone(&open),
                outbound,
            },
        );
        tracing::debug!(connection = %id, "Live reload client connected");

        Connection {
            id,
            open,
            inbox,
            registry: Arc::clone(self),
        }
    }

    /// Remove a connection and mark it closed. Idempotent.
    ///
    /// Returns `true` if the connection was still registered.
    pub fn remove(&self, id: ConnectionId) -> bool {
        let Some(peer) = self.lock().remove(&id) else {
            return false;
        };
        peer.open.store(false, Ordering::Release);
        tracing::debug!(connection = %id, "Live reload client disconnected");
        true
    }

    /// Send `message` to every open connection.
    ///
    /// Iterates a snapshot taken at call time: connections accepted afterwards
    /// are not included, connections closed before their turn are skipped. A
    /// failure on one connection never affects the others.
    pub fn broadcast(&self, message: ReloadMessage) -> BroadcastReport {
        let snapshot: Vec<(ConnectionId, Peer)> = self
            .lock()
            .iter()
            .map(|(id, peer)| (*id, peer.clone()))
            .collect();

        let mut report = BroadcastReport::default();
        for (id, peer) in snapshot {
            // Close can race with the fan-out, so check right before sending
            if !peer.open.load(Ordering::Acquire) {
                report.skipped += 1;
                continue;
            }

            match peer.outbound.try_send(message) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Closed(_)) => {
                    peer.open.store(false, Ordering::Release);
                    report.skipped += 1;
                }
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(connection = %id, "Outbound queue full, dropping message");
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Close every connection and empty the registry.
    ///
    /// Socket tasks observe their queue closing and shut down the transport.
    pub fn close_all(&self) {
        let peers: Vec<Peer> = self.lock().drain().map(|(_, peer)| peer).collect();
        for peer in &peers {
            peer.open.store(false, Ordering::Release);
        }
        if !peers.is_empty() {
            tracing::info!(connections = peers.len(), "Closed live reload connections");
        }
    }

    /// Number of registered connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no connection is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Check whether `id` is registered.
    #[must_use]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.lock().contains_key(&id)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, Peer>> {
        // The map is never left half-updated, so a poisoned lock is still usable
        self.peers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One open push channel to a browser tab.
///
/// Owned by the socket task. Dropping it removes the connection from the
/// registry, so no connection outlives its transport.
pub struct Connection {
    id: ConnectionId,
    open: Arc<AtomicBool>,
    inbox: mpsc::Receiver<ReloadMessage>,
    registry: Arc<ConnectionRegistry>,
}

impl Connection {
    /// Connection identity.
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Whether the connection is still open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Wait for the next message to push.
    ///
    /// Returns `None` once the connection has been removed from the registry.
    pub async fn recv(&mut self) -> Option<ReloadMessage> {
        self.inbox.recv().await
    }

    /// Take a queued message without waiting.
    pub fn try_recv(&mut self) -> Option<ReloadMessage> {
        self.inbox.try_recv().ok()
    }

    /// Mark the connection closed and remove it from the registry.
    pub fn close(&mut self) {
        self.open.store(false, Ordering::Release);
        self.registry.remove(self.id);
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}
