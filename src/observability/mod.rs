//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! listener, registry, sessions, lifecycle produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout via tracing-subscriber fmt layer
//!     → Prometheus scrape endpoint (demo host, optional)
//! ```
//!
//! # Design Decisions
//! - Connection IDs flow through every event of a session
//! - Metrics are cheap and no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
