//! HTTP server of the demo host process.
//!
//! # Responsibilities
//! - Serve a small JSON API (`/`, `/health`)
//! - Expose its live state to REPL sessions through [`Host`]
//! - Run the host's stop hooks around axum's graceful shutdown

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use crate::host::{Host, LifecycleHooks, StopPhase};

/// Live state of the demo host, visible in REPL sessions as `server`.
#[derive(Debug)]
pub struct HttpHost {
    name: String,
    started_at: Instant,
    http_address: OnceLock<SocketAddr>,
    repl_address: OnceLock<SocketAddr>,
    requests: AtomicU64,
}

impl HttpHost {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started_at: Instant::now(),
            http_address: OnceLock::new(),
            repl_address: OnceLock::new(),
            requests: AtomicU64::new(0),
        }
    }

    /// Record where the REPL listener ended up.
    pub fn set_repl_address(&self, addr: SocketAddr) {
        let _ = self.repl_address.set(addr);
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }
}

impl Host for HttpHost {
    fn name(&self) -> &str {
        &self.name
    }

    fn inspect(&self) -> serde_json::Value {
        json!({
            "name": self.name,
            "version": env!("CARGO_PKG_VERSION"),
            "http_address": self.http_address.get().map(ToString::to_string),
            "repl_address": self.repl_address.get().map(ToString::to_string),
            "uptime_secs": self.started_at.elapsed().as_secs(),
            "requests": self.requests(),
        })
    }
}

/// HTTP server for the demo host.
pub struct HttpServer {
    router: Router,
    host: Arc<HttpHost>,
}

impl HttpServer {
    pub fn new(host: Arc<HttpHost>) -> Self {
        let router = Router::new()
            .route("/", get(info_handler))
            .route("/health", get(health_handler))
            .with_state(Arc::clone(&host))
            .layer(TraceLayer::new_for_http());

        Self { router, host }
    }

    /// Serve until `stop` resolves.
    ///
    /// `BeforeStop` hooks run before axum stops accepting and drains its own
    /// connections, `AfterStop` hooks once it has finished.
    pub async fn run<F>(
        self,
        listener: TcpListener,
        hooks: LifecycleHooks,
        stop: F,
    ) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        let _ = self.host.http_address.set(addr);
        tracing::info!(address = %addr, "HTTP server starting");

        let hooks = Arc::new(Mutex::new(hooks));
        let before_stop = Arc::clone(&hooks);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                stop.await;
                before_stop.lock().await.run(StopPhase::BeforeStop).await;
            })
            .await?;

        hooks.lock().await.run(StopPhase::AfterStop).await;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn info_handler(State(host): State<Arc<HttpHost>>) -> Json<serde_json::Value> {
    host.record_request();
    Json(host.inspect())
}

async fn health_handler(State(host): State<Arc<HttpHost>>) -> &'static str {
    host.record_request();
    "ok"
}
