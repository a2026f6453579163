//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop)
//!     → security::access_control (loopback gate)
//!     → connection.rs (registry: tracked until close notification)
//!     → session::SessionFactory (evaluator bound to the socket)
//!
//! Connection lifecycle:
//!     Accepted → Tracked → (Terminating) → Closed/Untracked
//! ```
//!
//! # Design Decisions
//! - Only admitted sockets are tracked; rejected ones never enter the registry
//! - The registry is the only state shared between connection tasks
//! - Each connection runs on its own task

pub mod connection;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionHandle, ConnectionId, ConnectionRegistry};
pub use listener::{BindError, Listener, ListenerHandle, PeerResolver};
