//! The System A (system-of-record) interface the manager consumes.

use async_trait::async_trait;
use thiserror::Error;

use crate::intercept::InterceptRecord;

/// Errors returned by System A calls.
#[derive(Debug, Error)]
pub enum SystemAError {
    /// The session could not be established.
    #[error("connect failed: {0}")]
    Connect(String),

    /// System A answered and refused the call.
    #[error("{call} rejected: {message}")]
    Rejected { call: &'static str, message: String },

    /// The call did not get an answer.
    #[error("transport error: {0}")]
    Transport(String),
}

/// One session with System A.
#[async_trait]
pub trait SystemA: Send + Sync + 'static {
    /// Remove the preview domain provisioned for `intercept`.
    async fn delete_preview_domain(&self, intercept: &InterceptRecord) -> Result<(), SystemAError>;

    /// Tell System A that the intercept with `id` no longer exists.
    async fn report_intercept_removed(&self, id: &str) -> Result<(), SystemAError>;
}

/// Establishes and tears down System A sessions for the pool.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Connection: SystemA;

    async fn connect(&self) -> Result<Self::Connection, SystemAError>;

    async fn disconnect(&self, connection: &Self::Connection) -> Result<(), SystemAError>;
}
