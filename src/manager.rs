//! The traffic manager itself: shared state plus the three supervised tasks.
//!
//! ```text
//! "httpd"        Multiplexer::run        gRPC + plain HTTP on one port
//! "intercept-gc" ExpirationDriver::run   store.expire() every interval
//! "systema-gc"   DeletionPipeline::run   expired intercepts → System A
//! ```

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::ManagerConfig;
use crate::http::{Multiplexer, RpcServices};
use crate::intercept::{InterceptRecord, InterceptStore, MemoryStore, StoreError};
use crate::lifecycle::{GroupConfig, SupervisorError, TaskGroup};
use crate::reaper::{DeletionPipeline, ExpirationDriver};
use crate::systema::{ConnectionPool, Connector, PoolError};

#[derive(Debug, Error)]
pub enum InterceptError {
    #[error("intercept store rejected the intercept: {0}")]
    Store(#[from] StoreError),

    #[error("System A unavailable: {0}")]
    SystemA(#[from] PoolError),
}

/// Built once at startup and shared by every task.
pub struct Manager<C: Connector> {
    config: ManagerConfig,
    store: Arc<MemoryStore>,
    systema: Arc<ConnectionPool<C>>,
}

impl<C: Connector> Manager<C> {
    pub fn new(config: ManagerConfig, connector: C) -> Self {
        Self {
            config,
            store: Arc::new(MemoryStore::new()),
            systema: Arc::new(ConnectionPool::new(connector)),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    pub fn systema(&self) -> &Arc<ConnectionPool<C>> {
        &self.systema
    }

    /// Store an intercept with the configured default lease.
    pub async fn create_intercept(&self, record: InterceptRecord) -> Result<(), InterceptError> {
        self.create_intercept_with_lease(record, self.config.expiration.default_lease())
            .await
    }

    /// Store an intercept. One that carries an API key takes a System A
    /// reference first; the deletion pipeline gives it back when the
    /// intercept goes away.
    pub async fn create_intercept_with_lease(
        &self,
        record: InterceptRecord,
        lease: Duration,
    ) -> Result<(), InterceptError> {
        let login = record.requires_login();
        if login {
            self.systema.acquire().await?;
        }

        let id = record.id.clone();
        if let Err(e) = self.store.add_intercept(record, lease) {
            if login {
                if let Err(release) = self.systema.release().await {
                    tracing::error!(intercept_id = %id, error = %release, "Failed to return System A reference");
                }
            }
            return Err(e.into());
        }

        tracing::info!(intercept_id = %id, lease = ?lease, login, "Intercept created");
        Ok(())
    }

    pub fn remove_intercept(&self, id: &str) -> Option<InterceptRecord> {
        let removed = self.store.remove_intercept(id);
        if removed.is_some() {
            tracing::info!(intercept_id = %id, "Intercept removed");
        }
        removed
    }

    /// Register the manager's tasks on a group.
    pub fn spawn_tasks(&self, group: &mut TaskGroup, mux: Multiplexer) {
        group.go("httpd", move |token| async move {
            mux.run(token).await?;
            Ok(())
        });

        let driver = ExpirationDriver::new(Arc::clone(&self.store), self.config.expiration.interval());
        group.go("intercept-gc", move |token| async move {
            driver.run(token).await;
            Ok(())
        });

        let pipeline = DeletionPipeline::new(Arc::clone(&self.systema));
        let watch = self.store.watch_intercepts();
        group.go("systema-gc", move |token| async move {
            pipeline.run(watch, token).await;
            Ok(())
        });
    }

    /// Serve until a termination signal, the shutdown deadline, or the first
    /// task failure.
    pub async fn run(&self, rpc: RpcServices) -> Result<(), SupervisorError> {
        let mut group = TaskGroup::new(GroupConfig::from_config(&self.config.supervisor));
        let mux = Multiplexer::new(self.config.server.clone(), rpc);
        self.spawn_tasks(&mut group, mux);
        group.wait().await
    }
}
