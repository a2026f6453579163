//! TCP listener for REPL sessions.
//!
//! # Responsibilities
//! - Bind to the configured port (readiness means "listening")
//! - Accept incoming TCP connections
//! - Gate every peer through the address filter
//! - Track admitted sockets and spawn their sessions
//! - Stop accepting on request, leaving open sessions alone

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::Settings;
use crate::lifecycle::Shutdown;
use crate::net::connection::ConnectionRegistry;
use crate::observability::metrics;
use crate::security::access_control;
use crate::session::{SessionEnd, SessionFactory};

/// Maps the address reported by `accept` to the peer address used for
/// filtering and logging.
pub type PeerResolver = Arc<dyn Fn(SocketAddr) -> SocketAddr + Send + Sync>;

/// Back-off after a failed accept (e.g. file descriptor exhaustion).
const ACCEPT_ERROR_DELAY: Duration = Duration::from_millis(100);

/// The configured port could not be bound.
#[derive(Debug, Error)]
#[error("failed to bind REPL listener on {address}: {source}")]
pub struct BindError {
    pub address: String,
    #[source]
    pub source: std::io::Error,
}

/// A bound listener that has not started accepting yet.
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
    local_only: bool,
    registry: ConnectionRegistry,
    peer_resolver: Option<PeerResolver>,
}

impl Listener {
    /// Bind to the configured address. Returns once the socket listens.
    pub async fn bind(settings: &Settings, registry: ConnectionRegistry) -> Result<Self, BindError> {
        let address = settings.bind_address();
        let bind_error = |source| BindError {
            address: address.clone(),
            source,
        };

        let inner = TcpListener::bind(&address).await.map_err(bind_error)?;
        let local_addr = inner.local_addr().map_err(bind_error)?;

        tracing::info!(
            address = %local_addr,
            local_only = settings.local_only,
            "REPL listener bound"
        );

        Ok(Self {
            inner,
            local_addr,
            local_only: settings.local_only,
            registry,
            peer_resolver: None,
        })
    }

    /// Install a peer address resolver.
    pub fn with_peer_resolver(mut self, resolver: Option<PeerResolver>) -> Self {
        self.peer_resolver = resolver;
        self
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Start the accept loop.
    pub fn spawn(self, factory: SessionFactory) -> ListenerHandle {
        let shutdown = Shutdown::new();
        let stop = shutdown.subscribe();
        let local_addr = self.local_addr;
        let task = tokio::spawn(self.run(Arc::new(factory), stop));

        ListenerHandle {
            local_addr,
            shutdown,
            task: Some(task),
        }
    }

    async fn run(self, factory: Arc<SessionFactory>, mut stop: broadcast::Receiver<()>) {
        loop {
            let accepted = tokio::select! {
                _ = stop.recv() => break,
                accepted = self.inner.accept() => accepted,
            };

            match accepted {
                Ok((stream, reported)) => self.handle_connection(stream, reported, &factory),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(ACCEPT_ERROR_DELAY).await;
                }
            }
        }

        tracing::info!(address = %self.local_addr, "REPL listener stopped");
    }

    fn handle_connection(&self, stream: TcpStream, reported: SocketAddr, factory: &SessionFactory) {
        let peer = match &self.peer_resolver {
            Some(resolve) => resolve(reported),
            None => reported,
        };

        if !access_control::allow_peer(&peer, self.local_only) {
            metrics::record_connection_rejected();
            tracing::debug!(peer_addr = %peer, "Rejected non-loopback connection");
            drop(stream);
            return;
        }
        metrics::record_connection_accepted();

        let guard = self.registry.track(peer);
        let id = guard.id();
        let session = factory.create_session(stream, peer, &guard);

        tracing::info!(connection_id = %id, peer_addr = %peer, "Session opened");

        let task = tokio::spawn(async move {
            let _guard = guard;
            match session.run().await {
                Ok(end) => {
                    let reason = match end {
                        SessionEnd::Exit => "exit",
                        SessionEnd::ClientClosed => "client closed",
                        SessionEnd::Terminated => "terminated",
                    };
                    tracing::info!(connection_id = %id, reason, "Session closed");
                }
                Err(e) => {
                    tracing::debug!(connection_id = %id, error = %e, "Session ended with I/O error");
                }
            }
        });
        self.registry.attach_task(id, task.abort_handle());
    }
}

/// Running accept loop.
pub struct ListenerHandle {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    task: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether the accept loop is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop accepting and close the listening socket. Open sessions are
    /// left to the lifecycle controller. Resolves once the socket is closed.
    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        self.shutdown.trigger();
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "REPL accept loop ended abnormally");
        }
    }
}
