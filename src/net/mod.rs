//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (id, active count)
//!     → Hand off to the protocol multiplexer (http/server.rs)
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents resource exhaustion
//! - No TLS: RPC clients speak cleartext HTTP/2

pub mod connection;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{ConnectionPermit, Listener, ListenerError};
