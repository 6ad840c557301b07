//! Intercept state store.
//!
//! # Responsibilities
//! - Hold live intercepts with their lease deadlines
//! - Evict intercepts whose lease has lapsed (`expire`)
//! - Publish every change to watchers, in the order it was applied
//!
//! # Design Decisions
//! - One mutex guards records and watchers so publication order matches
//!   application order
//! - Watch channels are unbounded; publishing never blocks under the lock
//! - A watcher whose receiver is gone is pruned on the next publish

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::intercept::types::{InterceptRecord, InterceptSnapshot, InterceptUpdate};
use crate::observability::metrics;

/// Receiving end of a watch on intercept changes. Yields `None` once the
/// store is closed.
pub type InterceptWatch = mpsc::UnboundedReceiver<InterceptSnapshot>;

/// What the runtime needs from an intercept state store.
pub trait InterceptStore: Send + Sync + 'static {
    /// Evict intercepts whose lease has lapsed. Failures are the store's own
    /// business; nothing is reported back.
    fn expire(&self);

    /// Subscribe to intercept changes. The stream starts with a snapshot of
    /// the current state and never completes while the store is open.
    fn watch_intercepts(&self) -> InterceptWatch;
}

/// Errors from store mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("intercept {0:?} already exists")]
    AlreadyExists(String),

    #[error("intercept store is closed")]
    Closed,
}

struct Entry {
    record: InterceptRecord,
    expires_at: Instant,
}

#[derive(Default)]
struct StoreState {
    intercepts: HashMap<String, Entry>,
    watchers: Vec<mpsc::UnboundedSender<InterceptSnapshot>>,
    closed: bool,
}

impl StoreState {
    fn publish(&mut self, updates: Vec<InterceptUpdate>) {
        if updates.is_empty() {
            return;
        }
        let snapshot = InterceptSnapshot::from(updates);
        self.watchers.retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}

/// In-memory intercept store with lease-based expiry.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an intercept that lives for `lease` unless renewed.
    pub fn add_intercept(&self, record: InterceptRecord, lease: Duration) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(StoreError::Closed);
        }
        if state.intercepts.contains_key(&record.id) {
            return Err(StoreError::AlreadyExists(record.id));
        }

        tracing::debug!(intercept_id = %record.id, lease = ?lease, "Intercept added");
        state.intercepts.insert(
            record.id.clone(),
            Entry {
                record: record.clone(),
                expires_at: Instant::now() + lease,
            },
        );
        state.publish(vec![InterceptUpdate::upsert(record)]);
        Ok(())
    }

    /// Extend an intercept's lease. Returns false if it is unknown.
    pub fn renew(&self, id: &str, lease: Duration) -> bool {
        let mut state = self.state.lock();
        match state.intercepts.get_mut(id) {
            Some(entry) => {
                entry.expires_at = Instant::now() + lease;
                true
            }
            None => false,
        }
    }

    /// Remove an intercept, returning its last state.
    pub fn remove_intercept(&self, id: &str) -> Option<InterceptRecord> {
        let mut state = self.state.lock();
        let entry = state.intercepts.remove(id)?;

        tracing::debug!(intercept_id = %id, "Intercept removed");
        state.publish(vec![InterceptUpdate::deletion(entry.record.clone())]);
        Some(entry.record)
    }

    pub fn get(&self, id: &str) -> Option<InterceptRecord> {
        self.state.lock().intercepts.get(id).map(|e| e.record.clone())
    }

    pub fn len(&self) -> usize {
        self.state.lock().intercepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close the store, ending every watch stream.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.watchers.clear();
    }
}

impl InterceptStore for MemoryStore {
    fn expire(&self) {
        let now = Instant::now();
        let mut state = self.state.lock();

        let lapsed: Vec<String> = state
            .intercepts
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(id, _)| id.clone())
            .collect();

        let mut updates = Vec::with_capacity(lapsed.len());
        for id in lapsed {
            if let Some(entry) = state.intercepts.remove(&id) {
                tracing::info!(intercept_id = %id, "Intercept lease expired");
                updates.push(InterceptUpdate::deletion(entry.record));
            }
        }

        if !updates.is_empty() {
            metrics::record_expired(updates.len());
        }
        state.publish(updates);
    }

    fn watch_intercepts(&self) -> InterceptWatch {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        if state.closed {
            return rx;
        }

        let mut current: Vec<InterceptUpdate> = state
            .intercepts
            .values()
            .map(|entry| InterceptUpdate::upsert(entry.record.clone()))
            .collect();
        current.sort_by(|a, b| a.value.id.cmp(&b.value.id));

        if tx.send(InterceptSnapshot::from(current)).is_ok() {
            state.watchers.push(tx);
        }
        rx
    }
}
