//! Deletion propagation to System A.
//!
//! Watches the intercept stream and, for every deleted intercept that was
//! created with an API key, tells System A to drop the preview domain (if
//! any) and then the intercept itself. Delivery is best effort: failures
//! are logged with the intercept id and never retried.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::intercept::{InterceptRecord, InterceptUpdate, InterceptWatch};
use crate::observability::metrics;
use crate::systema::{ConnectionPool, Connector, SystemA};

/// What the pipeline did with one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Not a deletion, or System A never knew the intercept.
    Ignored,
    /// No connection to System A; nothing was reported or released.
    AcquireFailed,
    /// Calls were issued and both references released. Individual calls may
    /// still have failed.
    Reported,
}

impl Disposition {
    fn as_str(self) -> &'static str {
        match self {
            Disposition::Ignored => "ignored",
            Disposition::AcquireFailed => "acquire_failed",
            Disposition::Reported => "reported",
        }
    }
}

/// Consumer of intercept deletions that reconciles them with System A.
pub struct DeletionPipeline<C: Connector> {
    pool: Arc<ConnectionPool<C>>,
}

impl<C: Connector> DeletionPipeline<C> {
    pub fn new(pool: Arc<ConnectionPool<C>>) -> Self {
        Self { pool }
    }

    /// Process snapshots in delivery order until the stream closes or
    /// `shutdown` fires. A snapshot already being processed is finished.
    pub async fn run(&self, mut watch: InterceptWatch, shutdown: CancellationToken) {
        tracing::info!("Deletion pipeline starting");

        loop {
            let snapshot = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                snapshot = watch.recv() => match snapshot {
                    Some(snapshot) => snapshot,
                    None => {
                        tracing::info!("Intercept stream closed");
                        break;
                    }
                },
            };

            for update in &snapshot.updates {
                self.handle_update(update).await;
            }
        }

        tracing::info!("Deletion pipeline stopped");
    }

    /// Reconcile one update with System A.
    pub async fn handle_update(&self, update: &InterceptUpdate) -> Disposition {
        // Every intercept with a preview domain required a login, so the API
        // key alone decides whether System A knows about it.
        if !update.delete || !update.value.requires_login() {
            return Disposition::Ignored;
        }

        let disposition = self.reap(&update.value).await;
        metrics::record_deletion(disposition.as_str());
        disposition
    }

    async fn reap(&self, intercept: &InterceptRecord) -> Disposition {
        let id = intercept.id.as_str();

        let connection = match self.pool.acquire().await {
            Ok(connection) => connection,
            Err(e) => {
                tracing::error!(intercept_id = %id, error = %e, "systema: acquire connection");
                return Disposition::AcquireFailed;
            }
        };

        // The domain goes first; it only means something while the
        // intercept exists upstream.
        if intercept.has_preview_domain() {
            let result = connection.delete_preview_domain(intercept).await;
            metrics::record_systema_call("delete_preview_domain", result.is_ok());
            if let Err(e) = result {
                tracing::error!(
                    intercept_id = %id,
                    domain = %intercept.preview_domain,
                    error = %e,
                    "systema: remove domain"
                );
            }
        }

        tracing::debug!(intercept_id = %id, "systema: remove intercept");
        let result = connection.report_intercept_removed(id).await;
        metrics::record_systema_call("report_intercept_removed", result.is_ok());
        if let Err(e) = result {
            tracing::error!(intercept_id = %id, error = %e, "systema: remove intercept");
        }
        drop(connection);

        if let Err(e) = self.pool.release().await {
            tracing::error!(intercept_id = %id, error = %e, "systema: release management connection");
        }
        // Matches the acquire taken when the intercept was created.
        if let Err(e) = self.pool.release().await {
            tracing::error!(intercept_id = %id, error = %e, "systema: release proxy connection");
        }

        Disposition::Reported
    }
}
