//! Background reaping of intercept state.
//!
//! # Data Flow
//! ```text
//! expiration.rs ("intercept-gc"):
//!     timer tick → store.expire() → deletions published on the watch stream
//!
//! deletion.rs ("systema-gc"):
//!     watch stream → filter (delete && api key)
//!     → acquire → delete preview domain → report removal → release x2
//! ```

pub mod deletion;
pub mod expiration;

pub use deletion::{DeletionPipeline, Disposition};
pub use expiration::ExpirationDriver;
