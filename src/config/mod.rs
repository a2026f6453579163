//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → HostConfig / Settings (validated, immutable)
//!     → Settings shared via Arc with the listener and session factory
//! ```
//!
//! # Design Decisions
//! - Settings are immutable once the listener starts
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{EvaluatorOptions, HostConfig, Settings, ShutdownSettings};
pub use validation::ValidationError;
