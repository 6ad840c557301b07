//! Intercept state.
//!
//! # Data Flow
//! ```text
//! Manager::create_intercept / remove_intercept
//!     → store.rs (records + lease deadlines)
//!     → watch stream: InterceptSnapshot { updates: [InterceptUpdate] }
//!     → consumers (deletion pipeline, ...)
//!
//! Expiration driver tick
//!     → store.expire() → deletions published on the same stream
//! ```

pub mod store;
pub mod types;

pub use store::{InterceptStore, InterceptWatch, MemoryStore, StoreError};
pub use types::{InterceptRecord, InterceptSnapshot, InterceptUpdate};
