//! Connection registry for coordinated shutdown.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Track every admitted socket until its close notification fires
//! - Hand out termination handles to the lifecycle controller
//! - Signal when the registry drains to empty

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{watch, Notify};
use tokio::task::AbortHandle;

use crate::observability::metrics;

/// Global atomic counter for connection IDs.
/// Relaxed ordering is enough: IDs only need to be unique and increasing.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection. IDs grow in accept order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug)]
struct TrackedConnection {
    peer: SocketAddr,
    terminate: Arc<Notify>,
    closed: watch::Receiver<bool>,
    abort: Option<AbortHandle>,
}

/// Snapshot entry for one open connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    peer: SocketAddr,
    terminate: Arc<Notify>,
    closed: watch::Receiver<bool>,
}

impl ConnectionHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Ask the session to end gracefully.
    ///
    /// The request is remembered if the session is not currently waiting, and
    /// it is harmless when the socket has already closed on its own.
    pub fn terminate(&self) {
        self.terminate.notify_one();
    }

    /// Wait for the connection's close notification.
    pub async fn closed(&self) {
        let mut closed = self.closed.clone();
        // An error means the guard is gone, which only happens after close.
        let _ = closed.wait_for(|closed| *closed).await;
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

/// Tracks open sockets for the lifetime of a listener.
///
/// Cloning is cheap; clones share the same set.
#[derive(Debug, Clone)]
pub struct ConnectionRegistry {
    inner: Arc<DashMap<ConnectionId, TrackedConnection>>,
    /// Current size, published for waiters.
    len_tx: Arc<watch::Sender<usize>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        let (len_tx, _) = watch::channel(0);
        Self {
            inner: Arc::new(DashMap::new()),
            len_tx: Arc::new(len_tx),
        }
    }

    /// Register a newly admitted socket.
    ///
    /// The returned guard is the socket's close notification: dropping it
    /// untracks the connection.
    pub fn track(&self, peer: SocketAddr) -> ConnectionGuard {
        let id = ConnectionId::new();
        let terminate = Arc::new(Notify::new());
        let (closed_tx, closed_rx) = watch::channel(false);

        self.inner.insert(
            id,
            TrackedConnection {
                peer,
                terminate: Arc::clone(&terminate),
                closed: closed_rx,
                abort: None,
            },
        );
        self.len_tx.send_modify(|len| *len += 1);
        metrics::set_active_sessions(self.inner.len());

        tracing::trace!(connection_id = %id, peer_addr = %peer, "Connection tracked");

        ConnectionGuard {
            id,
            registry: self.clone(),
            terminate,
            closed_tx,
        }
    }

    /// Remove a connection. Unknown IDs are ignored.
    pub fn untrack(&self, id: ConnectionId) -> bool {
        if self.inner.remove(&id).is_none() {
            return false;
        }
        self.len_tx.send_modify(|len| *len = len.saturating_sub(1));
        metrics::set_active_sessions(self.inner.len());
        tracing::trace!(connection_id = %id, "Connection untracked");
        true
    }

    /// Attach the task driving a connection so it can be force-stopped.
    pub fn attach_task(&self, id: ConnectionId, abort: AbortHandle) {
        if let Some(mut entry) = self.inner.get_mut(&id) {
            entry.abort = Some(abort);
        }
    }

    /// Abort every tracked session task. Returns how many were aborted.
    pub fn abort_all(&self) -> usize {
        let mut aborted = 0;
        for entry in self.inner.iter() {
            if let Some(abort) = &entry.abort {
                abort.abort();
                aborted += 1;
            }
        }
        aborted
    }

    /// Open connections in accept order.
    pub fn snapshot(&self) -> Vec<ConnectionHandle> {
        let mut handles: Vec<ConnectionHandle> = self
            .inner
            .iter()
            .map(|entry| ConnectionHandle {
                id: *entry.key(),
                peer: entry.peer,
                terminate: Arc::clone(&entry.terminate),
                closed: entry.closed.clone(),
            })
            .collect();
        handles.sort_by_key(ConnectionHandle::id);
        handles
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.inner.contains_key(&id)
    }

    /// Resolve once no connection is tracked.
    pub async fn wait_until_empty(&self) {
        let mut len = self.len_tx.subscribe();
        // The sender lives in `self`, so this cannot fail while we wait.
        let _ = len.wait_for(|len| *len == 0).await;
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Ownership token of a tracked connection.
///
/// Held by the session task; dropping it fires the close notification.
#[derive(Debug)]
pub struct ConnectionGuard {
    id: ConnectionId,
    registry: ConnectionRegistry,
    terminate: Arc<Notify>,
    closed_tx: watch::Sender<bool>,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Signal the session waits on for graceful termination.
    pub fn terminate_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.terminate)
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.registry.untrack(self.id);
        self.closed_tx.send_replace(true);
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn peer(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
        assert!(id2 > id1);
    }

    #[test]
    fn registry_counts() {
        let registry = ConnectionRegistry::new();
        assert!(registry.is_empty());

        let guard1 = registry.track(peer(1));
        assert_eq!(registry.len(), 1);

        let guard2 = registry.track(peer(2));
        assert_eq!(registry.len(), 2);

        drop(guard1);
        assert_eq!(registry.len(), 1);

        drop(guard2);
        assert!(registry.is_empty());
    }

    #[test]
    fn untrack_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let guard = registry.track(peer(1));
        let id = guard.id();

        assert!(registry.untrack(id));
        assert!(!registry.untrack(id));
        drop(guard);
        assert!(registry.is_empty());
        assert!(!registry.contains(id));
    }

    #[test]
    fn snapshot_is_in_accept_order() {
        let registry = ConnectionRegistry::new();
        let guards: Vec<_> = (1..=5).map(|port| registry.track(peer(port))).collect();

        let ports: Vec<u16> = registry
            .snapshot()
            .iter()
            .map(|handle| handle.peer().port())
            .collect();
        assert_eq!(ports, vec![1, 2, 3, 4, 5]);
        drop(guards);
    }

    #[tokio::test]
    async fn closed_fires_when_guard_drops() {
        let registry = ConnectionRegistry::new();
        let guard = registry.track(peer(1));
        let handle = registry.snapshot().remove(0);
        assert!(!handle.is_closed());

        let signal = guard.terminate_signal();
        let session = tokio::spawn(async move {
            signal.notified().await;
            drop(guard);
        });

        handle.terminate();
        tokio::time::timeout(Duration::from_secs(1), handle.closed())
            .await
            .expect("close notification");
        assert!(handle.is_closed());
        session.await.unwrap();

        // Terminating an already closed connection is not an error.
        handle.terminate();
    }

    #[tokio::test]
    async fn wait_until_empty_resolves_after_last_close() {
        let registry = ConnectionRegistry::new();
        let guards: Vec<_> = (1..=3).map(|port| registry.track(peer(port))).collect();

        let waiter = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.wait_until_empty().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guards);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("registry drained")
            .unwrap();
    }

    #[tokio::test]
    async fn abort_all_stops_attached_tasks() {
        let registry = ConnectionRegistry::new();
        let guard = registry.track(peer(1));
        let id = guard.id();

        let task = tokio::spawn(async move {
            let _guard = guard;
            std::future::pending::<()>().await;
        });
        registry.attach_task(id, task.abort_handle());

        assert_eq!(registry.abort_all(), 1);
        assert!(task.await.unwrap_err().is_cancelled());
        assert!(registry.is_empty());
    }
}
