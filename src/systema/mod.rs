//! System A (system-of-record) connectivity.
//!
//! # Data Flow
//! ```text
//! intercept creation (api key present)
//!     → pool.acquire()            proxy reference, held for the intercept's life
//! intercept deletion (deletion pipeline)
//!     → pool.acquire()            management reference
//!     → delete_preview_domain / report_intercept_removed
//!     → pool.release() x2         management + proxy reference
//!     → refs == 0 → connector.disconnect()
//! ```

pub mod client;
pub mod logging;
pub mod pool;

pub use client::{Connector, SystemA, SystemAError};
pub use logging::LoggingConnector;
pub use pool::{ConnectionPool, Handle, PoolError};
