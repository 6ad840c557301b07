//! Shutdown coordination for the manager.

use tokio_util::sync::CancellationToken;

/// Coordinator for graceful and forced shutdown.
///
/// Two levels: `trigger` asks every task to stop (soft), `force` tells the
/// supervisor to abort whatever is still running (hard). Clones share state.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    soft: CancellationToken,
    hard: CancellationToken,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token for one task. Cancelled when shutdown is triggered; cancelling
    /// it does not affect other tasks.
    pub fn token(&self) -> CancellationToken {
        self.soft.child_token()
    }

    /// Trigger graceful shutdown.
    pub fn trigger(&self) {
        self.soft.cancel();
    }

    /// Trigger forced shutdown. Implies graceful shutdown.
    pub fn force(&self) {
        self.soft.cancel();
        self.hard.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.soft.is_cancelled()
    }

    pub fn is_forced(&self) -> bool {
        self.hard.is_cancelled()
    }

    /// Resolves once graceful shutdown has been triggered.
    pub async fn triggered(&self) {
        self.soft.cancelled().await;
    }

    /// Resolves once forced shutdown has been triggered.
    pub async fn forced(&self) {
        self.hard.cancelled().await;
    }
}
