//! Reference-counted System A connection.
//!
//! # Responsibilities
//! - Establish the session lazily on the first `acquire`
//! - Share one session among all owners
//! - Tear the session down when the last owner releases it
//! - Surface unbalanced releases as errors
//!
//! # Design Decisions
//! - An async mutex guards the count and the session; `acquire` holds it
//!   while connecting, so concurrent first acquires connect once
//! - Releases never underflow: a release at zero is refused

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::observability::metrics;
use crate::systema::client::{Connector, SystemAError};

/// Errors from pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("acquire connection: {0}")]
    Acquire(#[source] SystemAError),

    /// A release with no outstanding reference. Always a bookkeeping defect.
    #[error("release without a matching acquire")]
    Unbalanced,

    #[error("close connection: {0}")]
    Disconnect(#[source] SystemAError),
}

/// A shared handle to the live session.
pub type Handle<C> = Arc<<C as Connector>::Connection>;

struct PoolState<T> {
    connection: Option<Arc<T>>,
    refs: usize,
}

/// The single, lazily established, reference-counted System A session.
pub struct ConnectionPool<C: Connector> {
    connector: C,
    state: Mutex<PoolState<C::Connection>>,
}

impl<C: Connector> ConnectionPool<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            state: Mutex::new(PoolState {
                connection: None,
                refs: 0,
            }),
        }
    }

    /// Take one reference, connecting first if nobody holds one.
    pub async fn acquire(&self) -> Result<Handle<C>, PoolError> {
        let mut state = self.state.lock().await;

        let connection = match &state.connection {
            Some(connection) => Arc::clone(connection),
            None => {
                let connection = Arc::new(self.connector.connect().await.map_err(PoolError::Acquire)?);
                tracing::info!("System A session established");
                state.connection = Some(Arc::clone(&connection));
                connection
            }
        };

        state.refs += 1;
        metrics::set_systema_refs(state.refs);
        tracing::trace!(refs = state.refs, "System A reference acquired");
        Ok(connection)
    }

    /// Give back one reference, closing the session when it was the last.
    pub async fn release(&self) -> Result<(), PoolError> {
        let mut state = self.state.lock().await;

        if state.refs == 0 {
            return Err(PoolError::Unbalanced);
        }
        state.refs -= 1;
        metrics::set_systema_refs(state.refs);
        tracing::trace!(refs = state.refs, "System A reference released");

        if state.refs > 0 {
            return Ok(());
        }
        let Some(connection) = state.connection.take() else {
            return Ok(());
        };
        self.connector
            .disconnect(&connection)
            .await
            .map_err(PoolError::Disconnect)?;
        tracing::info!("System A session closed");
        Ok(())
    }

    /// Outstanding references.
    pub async fn ref_count(&self) -> usize {
        self.state.lock().await.refs
    }

    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.connection.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intercept::InterceptRecord;
    use crate::systema::client::SystemA;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingConnector {
        connects: AtomicUsize,
        disconnects: AtomicUsize,
        refuse: AtomicBool,
    }

    struct Session;

    #[async_trait]
    impl SystemA for Session {
        async fn delete_preview_domain(&self, _: &InterceptRecord) -> Result<(), SystemAError> {
            Ok(())
        }

        async fn report_intercept_removed(&self, _: &str) -> Result<(), SystemAError> {
            Ok(())
        }
    }

    #[async_trait]
    impl Connector for CountingConnector {
        type Connection = Session;

        async fn connect(&self) -> Result<Session, SystemAError> {
            if self.refuse.load(Ordering::SeqCst) {
                return Err(SystemAError::Connect("refused".into()));
            }
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Session)
        }

        async fn disconnect(&self, _: &Session) -> Result<(), SystemAError> {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn session_is_lazy_and_shared() {
        let pool = ConnectionPool::new(CountingConnector::default());
        assert!(!pool.is_connected().await);

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(pool.connector.connects.load(Ordering::SeqCst), 1);
        assert_eq!(pool.ref_count().await, 2);
    }

    #[tokio::test]
    async fn last_release_tears_down() {
        let pool = ConnectionPool::new(CountingConnector::default());
        pool.acquire().await.unwrap();
        pool.acquire().await.unwrap();

        pool.release().await.unwrap();
        assert!(pool.is_connected().await);
        assert_eq!(pool.connector.disconnects.load(Ordering::SeqCst), 0);

        pool.release().await.unwrap();
        assert!(!pool.is_connected().await);
        assert_eq!(pool.connector.disconnects.load(Ordering::SeqCst), 1);

        pool.acquire().await.unwrap();
        assert_eq!(pool.connector.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unbalanced_release_is_an_error() {
        let pool = ConnectionPool::new(CountingConnector::default());
        assert!(matches!(pool.release().await, Err(PoolError::Unbalanced)));

        pool.acquire().await.unwrap();
        pool.release().await.unwrap();
        assert!(matches!(pool.release().await, Err(PoolError::Unbalanced)));
        assert_eq!(pool.ref_count().await, 0);
    }

    #[tokio::test]
    async fn failed_connect_takes_no_reference() {
        let pool = ConnectionPool::new(CountingConnector::default());
        pool.connector.refuse.store(true, Ordering::SeqCst);

        assert!(matches!(pool.acquire().await, Err(PoolError::Acquire(_))));
        assert_eq!(pool.ref_count().await, 0);
        assert!(!pool.is_connected().await);
    }

    #[tokio::test]
    async fn concurrent_acquires_connect_once() {
        let pool = Arc::new(ConnectionPool::new(CountingConnector::default()));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let pool = Arc::clone(&pool);
                tokio::spawn(async move { pool.acquire().await.map(|_| ()) })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(pool.connector.connects.load(Ordering::SeqCst), 1);
        assert_eq!(pool.ref_count().await, 16);
    }
}
