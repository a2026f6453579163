//! Registration entry point.
//!
//! ```text
//! Reptile::new(host, settings)
//!     → validate settings
//!     → bind listener (resolves once listening, or BindError)
//!     → spawn accept loop
//!     → install LifecycleController into the configured stop phase
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::validation::{join_errors, validate_settings, ValidationError};
use crate::config::Settings;
use crate::eval::{EvaluatorFactory, InterpreterFactory};
use crate::host::{Host, LifecycleHooks};
use crate::lifecycle::{DrainReport, LifecycleController};
use crate::net::connection::ConnectionRegistry;
use crate::net::listener::{BindError, Listener, PeerResolver};
use crate::session::SessionFactory;

/// Registration failed; the host decides whether that is fatal.
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("invalid REPL settings: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),

    #[error(transparent)]
    Bind(#[from] BindError),
}

/// Builder for the REPL listener of a host process.
pub struct Reptile {
    host: Arc<dyn Host>,
    settings: Settings,
    evaluators: Arc<dyn EvaluatorFactory>,
    peer_resolver: Option<PeerResolver>,
}

impl Reptile {
    pub fn new(host: Arc<dyn Host>, settings: Settings) -> Self {
        Self {
            host,
            settings,
            evaluators: Arc::new(InterpreterFactory::new()),
            peer_resolver: None,
        }
    }

    /// Use a custom evaluator instead of the built-in interpreter.
    pub fn with_evaluator(mut self, evaluators: Arc<dyn EvaluatorFactory>) -> Self {
        self.evaluators = evaluators;
        self
    }

    /// Rewrite peer addresses before filtering, e.g. behind a local relay.
    pub fn with_peer_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(SocketAddr) -> SocketAddr + Send + Sync + 'static,
    {
        self.peer_resolver = Some(Arc::new(resolver));
        self
    }

    /// Start listening and install the lifecycle controller into `hooks`.
    ///
    /// Resolves once the listening socket is ready.
    pub async fn register(self, hooks: &mut LifecycleHooks) -> Result<Registration, RegisterError> {
        validate_settings(&self.settings).map_err(RegisterError::Invalid)?;

        let settings = Arc::new(self.settings);
        let registry = ConnectionRegistry::new();

        let listener = Listener::bind(&settings, registry.clone())
            .await?
            .with_peer_resolver(self.peer_resolver);
        let local_addr = listener.local_addr();

        let factory = SessionFactory::new(
            Arc::clone(&settings),
            Arc::clone(&self.host),
            self.evaluators,
            registry.clone(),
            local_addr,
        );
        let handle = listener.spawn(factory);

        let controller = Arc::new(LifecycleController::new(
            handle,
            registry.clone(),
            Duration::from_secs(settings.shutdown.drain_timeout_secs),
        ));

        let phase = settings.shutdown.phase;
        let hook = Arc::clone(&controller);
        hooks.on(phase, move || async move {
            hook.shutdown().await;
        });

        tracing::info!(
            host = self.host.name(),
            address = %local_addr,
            phase = ?phase,
            "REPL registered"
        );

        Ok(Registration {
            local_addr,
            registry,
            controller,
        })
    }
}

/// A running REPL listener.
#[derive(Debug, Clone)]
pub struct Registration {
    local_addr: SocketAddr,
    registry: ConnectionRegistry,
    controller: Arc<LifecycleController>,
}

impl Registration {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of open sessions.
    pub fn active_sessions(&self) -> usize {
        self.registry.len()
    }

    /// Open-connection registry of this listener.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub async fn is_accepting(&self) -> bool {
        self.controller.is_accepting().await
    }

    /// Run the lifecycle controller now, outside the host's stop sequence.
    pub async fn shutdown(&self) -> DrainReport {
        self.controller.shutdown().await
    }
}
