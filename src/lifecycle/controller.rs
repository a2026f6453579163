//! Shutdown coordination for the REPL listener and its sessions.

use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::Mutex;

use crate::net::connection::ConnectionRegistry;
use crate::net::listener::ListenerHandle;
use crate::observability::metrics;

/// Bound on the wait for aborted sessions to release their sockets.
const ABORT_GRACE: Duration = Duration::from_secs(1);

/// Result of a drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    /// Sessions that were open when the drain started.
    pub sessions: usize,
    /// Sessions aborted because they did not close within the drain timeout.
    pub forced: usize,
}

/// Stops the listener, then drains every tracked session.
///
/// Installed into the host's stop sequence. Only the first call does any
/// work; later calls return an empty report.
pub struct LifecycleController {
    listener: Mutex<Option<ListenerHandle>>,
    registry: ConnectionRegistry,
    drain_timeout: Duration,
}

impl LifecycleController {
    pub fn new(listener: ListenerHandle, registry: ConnectionRegistry, drain_timeout: Duration) -> Self {
        Self {
            listener: Mutex::new(Some(listener)),
            registry,
            drain_timeout,
        }
    }

    /// Whether the listener is still accepting connections.
    pub async fn is_accepting(&self) -> bool {
        self.listener
            .lock()
            .await
            .as_ref()
            .is_some_and(ListenerHandle::is_running)
    }

    pub async fn shutdown(&self) -> DrainReport {
        // Holding the lock for the whole drain serializes concurrent callers.
        let mut listener = self.listener.lock().await;
        let Some(mut handle) = listener.take() else {
            return DrainReport::default();
        };

        handle.stop().await;

        let sessions = self.registry.snapshot();
        let mut report = DrainReport {
            sessions: sessions.len(),
            forced: 0,
        };
        if sessions.is_empty() {
            return report;
        }

        tracing::info!(sessions = sessions.len(), "Draining REPL sessions");

        let drain = join_all(sessions.iter().map(|session| async move {
            session.terminate();
            session.closed().await;
        }));

        if tokio::time::timeout(self.drain_timeout, drain).await.is_err() {
            let remaining = self.registry.len();
            tracing::warn!(
                remaining,
                timeout_secs = self.drain_timeout.as_secs_f64(),
                "REPL sessions did not close in time, aborting"
            );
            report.forced = self.registry.abort_all();
            metrics::record_forced_terminations(report.forced);

            if tokio::time::timeout(ABORT_GRACE, self.registry.wait_until_empty())
                .await
                .is_err()
            {
                tracing::warn!(remaining = self.registry.len(), "REPL sessions still open after abort");
            }
        }

        tracing::info!("REPL sessions drained");
        report
    }
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("sessions", &self.registry.len())
            .field("drain_timeout", &self.drain_timeout)
            .finish()
    }
}
