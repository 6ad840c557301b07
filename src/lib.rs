//! Traffic manager runtime core.
//!
//! One process serving the manager's gRPC API and plain HTTP on a single
//! port, expiring intercepts on a timer, and telling System A about every
//! expired intercept that was created with an API key.

pub mod config;
pub mod http;
pub mod intercept;
pub mod lifecycle;
pub mod manager;
pub mod net;
pub mod observability;
pub mod reaper;
pub mod systema;

pub use config::ManagerConfig;
pub use http::{Multiplexer, MuxState, RpcServices};
pub use lifecycle::{Shutdown, TaskGroup};
pub use manager::{InterceptError, Manager};
