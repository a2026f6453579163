//! Session factory: binds an admitted socket to a fresh evaluator.

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::json;
use tokio::net::TcpStream;

use crate::config::Settings;
use crate::eval::EvaluatorFactory;
use crate::host::Host;
use crate::net::connection::{ConnectionGuard, ConnectionId, ConnectionRegistry};
use crate::session::context::{static_layer, ContextValue, SessionContext};
use crate::session::Session;

/// Everything a new session needs besides its socket.
pub struct SessionFactory {
    settings: Arc<Settings>,
    host: Arc<dyn Host>,
    evaluators: Arc<dyn EvaluatorFactory>,
    registry: ConnectionRegistry,
    listener_addr: SocketAddr,
}

impl SessionFactory {
    pub fn new(
        settings: Arc<Settings>,
        host: Arc<dyn Host>,
        evaluators: Arc<dyn EvaluatorFactory>,
        registry: ConnectionRegistry,
        listener_addr: SocketAddr,
    ) -> Self {
        Self {
            settings,
            host,
            evaluators,
            registry,
            listener_addr,
        }
    }

    /// Context seen by a session: `socket`, `listener`, `server`, then the
    /// configured extras on top.
    pub fn session_context(&self, id: ConnectionId, peer: SocketAddr) -> SessionContext {
        let socket = json!({
            "id": id.to_string(),
            "peer": peer.to_string(),
            "local": self.listener_addr.to_string(),
        });

        let listener = {
            let registry = self.registry.clone();
            let address = self.listener_addr.to_string();
            let local_only = self.settings.local_only;
            ContextValue::live(move || {
                json!({
                    "address": address,
                    "local_only": local_only,
                    "sessions": registry.len(),
                })
            })
        };

        let server = {
            let host = Arc::clone(&self.host);
            ContextValue::live(move || host.inspect())
        };

        let seed = vec![
            ("socket".to_string(), ContextValue::Static(socket)),
            ("listener".to_string(), listener),
            ("server".to_string(), server),
        ];

        SessionContext::merge([seed, static_layer(&self.settings.context)])
    }

    /// Build the session for an admitted, already tracked socket.
    pub fn create_session(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        guard: &ConnectionGuard,
    ) -> Session {
        let context = self.session_context(guard.id(), peer);
        let options = &self.settings.evaluator_options;
        let evaluator = self.evaluators.create(&context, options);

        Session::new(
            guard.id(),
            peer,
            stream,
            evaluator,
            options.clone(),
            guard.terminate_signal(),
        )
    }
}
