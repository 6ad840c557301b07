//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Supervision (supervisor.rs):
//!     go("httpd"), go("intercept-gc"), go("systema-gc")
//!     → any task error or panic → trigger shutdown → wait for all → first error
//!
//! Shutdown (shutdown.rs):
//!     trigger → every task token cancelled → tasks drain and return
//!     force   → supervisor aborts whatever is left
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//!     second SIGTERM/SIGINT → force
//! ```
//!
//! # Design Decisions
//! - Cancellation is the only coordination signal between tasks
//! - Shutdown has an optional deadline: forced abort after it elapses

pub mod shutdown;
pub mod signals;
pub mod supervisor;

pub use shutdown::Shutdown;
pub use supervisor::{GroupConfig, SupervisorError, TaskGroup};
