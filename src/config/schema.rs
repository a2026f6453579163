//! Configuration schema definitions.
//!
//! `Settings` configures the REPL listener itself; `HostConfig` wraps it for
//! the demo host binary. All types derive Serde traits for deserialization
//! from TOML files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::host::StopPhase;

/// REPL listener settings. Immutable once the listener starts.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// TCP port to listen on (1-65535).
    pub port: u16,

    /// Interface to bind. The default `::` is dual-stack where the OS allows
    /// it, so IPv4 peers appear as `::ffff:a.b.c.d`. Access is restricted by
    /// `local_only`, not by this.
    pub host: String,

    /// Only accept loopback peers.
    pub local_only: bool,

    /// Extra names made visible to every session, layered over the
    /// built-in `socket`, `listener` and `server` entries.
    pub context: BTreeMap<String, serde_json::Value>,

    /// Options handed to the evaluator of each session.
    pub evaluator_options: EvaluatorOptions,

    /// Shutdown coordination.
    pub shutdown: ShutdownSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: 9000,
            host: "::".to_string(),
            local_only: true,
            context: BTreeMap::new(),
            evaluator_options: EvaluatorOptions::default(),
            shutdown: ShutdownSettings::default(),
        }
    }
}

impl Settings {
    /// Settings for `port` with everything else defaulted.
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    /// Address string passed to `bind`.
    pub fn bind_address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Interactive evaluator options.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EvaluatorOptions {
    /// Share `def` bindings between all sessions of the listener.
    pub use_global: bool,

    /// Apply line editing (backspace, DEL) to incoming lines.
    pub terminal: bool,

    /// Prompt written before each new input.
    pub prompt: String,

    /// Prompt written while a multi-line form is still open.
    pub continuation_prompt: String,

    /// Print nothing for `nil` results.
    pub ignore_undefined: bool,

    /// Report evaluation time with each result.
    pub show_timing: bool,

    /// Longest input line accepted; longer lines are discarded.
    pub max_line_bytes: usize,

    /// Most input buffered for an unfinished multi-line form.
    pub max_pending_bytes: usize,

    /// Options not understood by the built-in interpreter, passed through
    /// untouched to custom evaluator factories.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self {
            use_global: false,
            terminal: true,
            prompt: "> ".to_string(),
            continuation_prompt: "... ".to_string(),
            ignore_undefined: false,
            show_timing: false,
            max_line_bytes: 64 * 1024,
            max_pending_bytes: 256 * 1024,
            extra: BTreeMap::new(),
        }
    }
}

/// When and how long the lifecycle controller drains sessions.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ShutdownSettings {
    /// Host stop phase the controller is installed into.
    pub phase: StopPhase,

    /// Seconds to wait for sessions to close before aborting them.
    pub drain_timeout_secs: u64,
}

impl Default for ShutdownSettings {
    fn default() -> Self {
        Self {
            phase: StopPhase::BeforeStop,
            drain_timeout_secs: 5,
        }
    }
}

/// Root configuration for the demo host process.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HostConfig {
    /// HTTP server of the host.
    pub http: HttpConfig,

    /// REPL listener settings.
    pub repl: Settings,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// HTTP listener of the demo host.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_filter: String,

    /// Expose a Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Address of the scrape endpoint.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "reptile=info,tower_http=info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9091".to_string(),
        }
    }
}
