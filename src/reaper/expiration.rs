//! Periodic lease expiration.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::intercept::InterceptStore;

/// Calls the store's `expire` once per period until cancelled.
pub struct ExpirationDriver<S: InterceptStore + ?Sized> {
    store: Arc<S>,
    period: Duration,
}

impl<S: InterceptStore + ?Sized> ExpirationDriver<S> {
    pub fn new(store: Arc<S>, period: Duration) -> Self {
        Self { store, period }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(interval = ?self.period, "Expiration driver starting");

        // First tick one full period from now, not immediately.
        let mut ticker = time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => self.store.expire(),
            }
        }

        tracing::info!("Expiration driver stopped");
    }
}
