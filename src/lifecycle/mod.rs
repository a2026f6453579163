//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (plugin.rs):
//!     Validate settings → Bind listener → Spawn accept loop → Install controller
//!
//! Shutdown (controller.rs):
//!     Host stop hook → Stop accepting → Terminate sessions concurrently
//!                    → Wait for every close → (timeout: abort stragglers)
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → host begins its stop sequence
//! ```
//!
//! # Design Decisions
//! - Stopping the listener never touches open sessions; draining is the
//!   controller's job, so in-flight sessions are never dropped silently
//! - Drain has a timeout: the host's shutdown is never held indefinitely

pub mod controller;
pub mod shutdown;
pub mod signals;

pub use controller::{DrainReport, LifecycleController};
pub use shutdown::Shutdown;
