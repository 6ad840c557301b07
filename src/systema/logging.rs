//! A System A stand-in that records calls in the log.
//!
//! Used by the shipped binary when no real System A client is wired in.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::intercept::InterceptRecord;
use crate::systema::client::{Connector, SystemA, SystemAError};

/// Connector whose sessions only log what they are asked to do.
#[derive(Debug, Default)]
pub struct LoggingConnector {
    sessions: AtomicU64,
}

/// A logging session.
#[derive(Debug)]
pub struct LoggingSession {
    session: u64,
}

#[async_trait]
impl Connector for LoggingConnector {
    type Connection = LoggingSession;

    async fn connect(&self) -> Result<LoggingSession, SystemAError> {
        let session = self.sessions.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(session, "System A logging session opened");
        Ok(LoggingSession { session })
    }

    async fn disconnect(&self, connection: &LoggingSession) -> Result<(), SystemAError> {
        tracing::debug!(session = connection.session, "System A logging session closed");
        Ok(())
    }
}

#[async_trait]
impl SystemA for LoggingSession {
    async fn delete_preview_domain(&self, intercept: &InterceptRecord) -> Result<(), SystemAError> {
        tracing::info!(
            session = self.session,
            intercept_id = %intercept.id,
            domain = %intercept.preview_domain,
            "System A: preview domain removed"
        );
        Ok(())
    }

    async fn report_intercept_removed(&self, id: &str) -> Result<(), SystemAError> {
        tracing::info!(session = self.session, intercept_id = %id, "System A: intercept removed");
        Ok(())
    }
}
