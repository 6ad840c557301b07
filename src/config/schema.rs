//! Configuration schema definitions.
//!
//! The environment the manager runs in. Resolved once at startup and never
//! mutated afterwards; every field has a default so an absent config file is
//! a valid configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the traffic manager.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ManagerConfig {
    /// Listener settings for the HTTP/gRPC port.
    pub server: ServerConfig,

    /// Intercept lease expiration settings.
    pub expiration: ExpirationConfig,

    /// Task supervision settings.
    pub supervisor: SupervisorConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host or IP to bind.
    pub host: String,

    /// Port to bind. Zero picks an ephemeral port.
    pub port: u16,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// How long in-flight requests may take to finish once draining starts.
    pub drain_timeout_secs: u64,
}

impl ServerConfig {
    /// `host:port` as handed to the socket layer.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            max_connections: 10_000,
            drain_timeout_secs: 10,
        }
    }
}

/// Expiration driver configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExpirationConfig {
    /// Seconds between calls to the store's expire routine.
    pub interval_secs: u64,

    /// Lease granted to newly created intercepts, in seconds.
    pub default_lease_secs: u64,
}

impl ExpirationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn default_lease(&self) -> Duration {
        Duration::from_secs(self.default_lease_secs)
    }
}

impl Default for ExpirationConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            default_lease_secs: 60,
        }
    }
}

/// Supervisor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Seconds tasks get to exit after cancellation before they are aborted.
    /// Zero waits forever.
    pub shutdown_timeout_secs: u64,
}

impl SupervisorConfig {
    pub fn shutdown_timeout(&self) -> Option<Duration> {
        (self.shutdown_timeout_secs > 0).then(|| Duration::from_secs(self.shutdown_timeout_secs))
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: 15,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, for development.
    #[default]
    Pretty,
    /// One JSON object per line, for log aggregation.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
