//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Operators see pipeline failures only through logs, so every deletion
//!   log line carries the intercept id as a field
//! - Metrics are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
