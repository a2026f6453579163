//! Demo host process.
//!
//! ```text
//!                   ┌──────────────────────────────────────────┐
//!                   │               reptile host               │
//!   HTTP client ───▶│  http::HttpServer (axum)                 │
//!                   │        │ HttpHost state                  │
//!                   │        ▼                                 │
//!   nc / cli   ────▶│  net::Listener → session::Session → eval │
//!                   │                                          │
//!   SIGTERM    ────▶│  BeforeStop hooks → axum drain → After   │
//!                   └──────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use reptile::config::{load_config, HostConfig};
use reptile::http::{HttpHost, HttpServer};
use reptile::lifecycle::signals::shutdown_signal;
use reptile::observability::{logging, metrics};
use reptile::{LifecycleHooks, Reptile};

#[derive(Parser)]
#[command(name = "reptile")]
#[command(about = "Demo service with an attached REPL backdoor", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the REPL port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the HTTP bind address
    #[arg(long)]
    http: Option<String>,

    /// Admit non-loopback REPL clients
    #[arg(long)]
    allow_remote: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => HostConfig::default(),
    };
    if let Some(port) = cli.port {
        config.repl.port = port;
    }
    if let Some(http) = cli.http {
        config.http.bind_address = http;
    }
    if cli.allow_remote {
        config.repl.local_only = false;
    }

    logging::init(&config.observability.log_filter);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "reptile starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to install metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let host = Arc::new(HttpHost::new("reptile-demo"));
    let mut hooks = LifecycleHooks::new();

    // The service keeps running without its backdoor when the port is taken.
    match Reptile::new(host.clone(), config.repl.clone())
        .register(&mut hooks)
        .await
    {
        Ok(registration) => {
            host.set_repl_address(registration.local_addr());
            tracing::info!(address = %registration.local_addr(), "REPL ready");
        }
        Err(e) => tracing::error!(error = %e, "REPL disabled"),
    }

    let listener = TcpListener::bind(&config.http.bind_address).await?;
    HttpServer::new(host)
        .run(listener, hooks, shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
