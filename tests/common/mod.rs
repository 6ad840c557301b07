//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use traffic_manager::config::ManagerConfig;
use traffic_manager::intercept::InterceptRecord;
use traffic_manager::systema::{Connector, SystemA, SystemAError};
use traffic_manager::MuxState;

/// One interaction with System A, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connect,
    DeleteDomain(String),
    ReportRemoved(String),
    Disconnect,
}

#[derive(Default)]
struct Shared {
    events: Mutex<Vec<Event>>,
    fail_connect: AtomicBool,
    fail_delete_domain: AtomicBool,
    fail_report: AtomicBool,
}

/// A System A connector that records every call and can be told to fail.
#[derive(Clone, Default)]
pub struct RecordingConnector {
    shared: Arc<Shared>,
}

impl RecordingConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.shared.events.lock().clone()
    }

    pub fn clear(&self) {
        self.shared.events.lock().clear();
    }

    pub fn fail_connect(&self, fail: bool) {
        self.shared.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete_domain(&self, fail: bool) {
        self.shared.fail_delete_domain.store(fail, Ordering::SeqCst);
    }

    pub fn fail_report(&self, fail: bool) {
        self.shared.fail_report.store(fail, Ordering::SeqCst);
    }

    fn record(&self, event: Event) {
        self.shared.events.lock().push(event);
    }
}

pub struct RecordingSession {
    connector: RecordingConnector,
}

#[async_trait]
impl SystemA for RecordingSession {
    async fn delete_preview_domain(&self, intercept: &InterceptRecord) -> Result<(), SystemAError> {
        self.connector
            .record(Event::DeleteDomain(intercept.preview_domain.clone()));
        if self.connector.shared.fail_delete_domain.load(Ordering::SeqCst) {
            return Err(SystemAError::Rejected {
                call: "delete_preview_domain",
                message: "injected".into(),
            });
        }
        Ok(())
    }

    async fn report_intercept_removed(&self, id: &str) -> Result<(), SystemAError> {
        self.connector.record(Event::ReportRemoved(id.to_string()));
        if self.connector.shared.fail_report.load(Ordering::SeqCst) {
            return Err(SystemAError::Transport("injected".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Connector for RecordingConnector {
    type Connection = RecordingSession;

    async fn connect(&self) -> Result<RecordingSession, SystemAError> {
        if self.shared.fail_connect.load(Ordering::SeqCst) {
            return Err(SystemAError::Connect("injected".into()));
        }
        self.record(Event::Connect);
        Ok(RecordingSession {
            connector: self.clone(),
        })
    }

    async fn disconnect(&self, _connection: &RecordingSession) -> Result<(), SystemAError> {
        self.record(Event::Disconnect);
        Ok(())
    }
}

/// Defaults, bound to an ephemeral loopback port, without signal handling
/// or a hard deadline getting in the way.
pub fn local_config() -> ManagerConfig {
    let mut config = ManagerConfig::default();
    config.server.host = "127.0.0.1".into();
    config.server.port = 0;
    config.server.drain_timeout_secs = 2;
    config.expiration.interval_secs = 1;
    config.supervisor.shutdown_timeout_secs = 0;
    config
}

/// Wait until the multiplexer reports its bound address.
pub async fn serving_addr(mut state: watch::Receiver<MuxState>) -> SocketAddr {
    let state = tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| matches!(s, MuxState::Serving(_))),
    )
    .await
    .expect("multiplexer did not start")
    .expect("multiplexer dropped");

    match *state {
        MuxState::Serving(addr) => addr,
        other => panic!("unexpected state {other:?}"),
    }
}

/// Poll `condition` until it holds or five seconds pass.
pub async fn eventually<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 5s"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
