//! HTTP front of the demo host process.
//!
//! # Data Flow
//! ```text
//! HTTP request
//!     → server.rs (axum router, trace layer)
//!     → handler updates HttpHost counters
//!     → JSON response
//!
//! Stop signal
//!     → BeforeStop hooks (REPL drains) → axum graceful shutdown → AfterStop hooks
//! ```

pub mod server;

pub use server::{HttpHost, HttpServer};
