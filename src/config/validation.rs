//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (port, timeouts)
//! - Check that context names can be looked up by the interpreter
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: Settings → Result<(), Vec<ValidationError>>
//! - Runs before the listener binds

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

use crate::config::schema::{HostConfig, Settings};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("port must be between 1 and 65535")]
    PortOutOfRange,

    #[error("host '{0}' is not an IP address")]
    InvalidHost(String),

    #[error("shutdown.drain_timeout_secs must be greater than zero")]
    ZeroDrainTimeout,

    #[error("evaluator_options.prompt must not be empty")]
    EmptyPrompt,

    #[error("evaluator_options.{0} must be greater than zero")]
    ZeroInputLimit(&'static str),

    #[error("context name '{0}' is not a valid identifier")]
    InvalidContextName(String),

    #[error("http.bind_address '{0}' is not a socket address")]
    InvalidBindAddress(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate REPL listener settings.
pub fn validate_settings(settings: &Settings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.port == 0 {
        errors.push(ValidationError::PortOutOfRange);
    }
    if settings.host.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::InvalidHost(settings.host.clone()));
    }
    if settings.shutdown.drain_timeout_secs == 0 {
        errors.push(ValidationError::ZeroDrainTimeout);
    }
    if settings.evaluator_options.prompt.is_empty() {
        errors.push(ValidationError::EmptyPrompt);
    }
    if settings.evaluator_options.max_line_bytes == 0 {
        errors.push(ValidationError::ZeroInputLimit("max_line_bytes"));
    }
    if settings.evaluator_options.max_pending_bytes == 0 {
        errors.push(ValidationError::ZeroInputLimit("max_pending_bytes"));
    }
    for name in settings.context.keys() {
        if !is_identifier(name) {
            errors.push(ValidationError::InvalidContextName(name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the full host configuration.
pub fn validate_config(config: &HostConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = match validate_settings(&config.repl) {
        Ok(()) => Vec::new(),
        Err(errors) => errors,
    };

    if config.http.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.http.bind_address.clone(),
        ));
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Render a list of errors as one line.
pub fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// Context names are looked up as interpreter symbols, and dots are reserved
// for path lookup.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '?' | '!'))
}
