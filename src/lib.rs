//! Reptile: a REPL backdoor for long-running Rust services.
//!
//! A host process registers [`Reptile`] during startup. It binds a TCP port,
//! admits loopback clients (unless configured otherwise), and gives each
//! client an interactive evaluator seeded with the host's live state. The
//! host's stop sequence drains every open session before the process exits.

pub mod config;
pub mod eval;
pub mod host;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod plugin;
pub mod security;
pub mod session;

pub use config::{EvaluatorOptions, HostConfig, Settings};
pub use eval::{Evaluator, EvaluatorFactory, InterpreterFactory, Reply};
pub use host::{Host, LifecycleHooks, StopPhase};
pub use lifecycle::{DrainReport, LifecycleController};
pub use plugin::{RegisterError, Registration, Reptile};
