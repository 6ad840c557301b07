//! Configuration validation.
//!
//! Serde handles the syntax; this checks value ranges. Validation is a pure
//! function that reports every problem rather than stopping at the first.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ManagerConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a configuration, returning all problems found.
pub fn validate_config(config: &ManagerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push(ValidationError::new("server.host", "must not be empty"));
    }
    if config.server.max_connections == 0 {
        errors.push(ValidationError::new("server.max_connections", "must be greater than 0"));
    }
    if config.server.drain_timeout_secs == 0 {
        errors.push(ValidationError::new("server.drain_timeout_secs", "must be greater than 0"));
    }
    if config.expiration.interval_secs == 0 {
        errors.push(ValidationError::new("expiration.interval_secs", "must be greater than 0"));
    }
    if config.expiration.default_lease_secs == 0 {
        errors.push(ValidationError::new("expiration.default_lease_secs", "must be greater than 0"));
    }
    if !LOG_LEVELS.contains(&config.observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level {:?}", config.observability.log_level),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("not a socket address: {:?}", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
