//! Protocol multiplexing subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (net::Listener)
//!     → server.rs (HTTP/1.1 or h2c negotiation, drain)
//!     → dispatch.rs (HTTP/2 + application/grpc?)
//!         yes → rpc.rs (health + registered gRPC services)
//!         no  → fallback.rs ("Hello World from: <path>")
//! ```

pub mod dispatch;
pub mod fallback;
pub mod rpc;
pub mod server;

pub use dispatch::{classify, Dispatcher, Protocol};
pub use rpc::RpcServices;
pub use server::{Multiplexer, MuxState};
