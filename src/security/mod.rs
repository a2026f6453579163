//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted TCP connection
//!     → access_control.rs (loopback check when local_only)
//!     → admitted: handed to the session factory
//!     → rejected: socket dropped, nothing written
//! ```
//!
//! # Design Decisions
//! - Filtering is by network origin only; there is no authentication
//! - The filter is a pure function so it can be tested exhaustively

pub mod access_control;

pub use access_control::{allow, allow_peer, PeerFamily};
