//! Host process integration.
//!
//! # Data Flow
//! ```text
//! host process
//!     → Host (live handle exposed to sessions as `server`)
//!     → LifecycleHooks (before_stop / after_stop extension points)
//!
//! Reptile::register installs the lifecycle controller into one phase.
//! ```

pub mod hooks;

pub use hooks::{HookFuture, LifecycleHooks, StopPhase};

/// Handle of the running host server, visible to sessions as `server`.
///
/// `inspect` is called on every lookup, so sessions always see live state.
pub trait Host: Send + Sync + 'static {
    /// Short name of the host, used in logs.
    fn name(&self) -> &str;

    /// Current state of the host as a JSON document.
    fn inspect(&self) -> serde_json::Value;
}
