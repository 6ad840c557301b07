//! OS signal handling.
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Signal streams are registered once, when the handler is spawned
//! - First SIGTERM/SIGINT triggers graceful shutdown
//! - A second one forces shutdown

use std::io;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::Shutdown;

/// Something that yields termination requests, by name.
#[async_trait]
pub trait SignalSource: Send + 'static {
    async fn next_signal(&mut self) -> io::Result<&'static str>;
}

/// The process's termination signals.
#[cfg(unix)]
pub struct TerminationSignals {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignals {
    pub fn install() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }
}

#[cfg(unix)]
#[async_trait]
impl SignalSource for TerminationSignals {
    async fn next_signal(&mut self) -> io::Result<&'static str> {
        tokio::select! {
            _ = self.sigterm.recv() => Ok("SIGTERM"),
            _ = self.sigint.recv() => Ok("SIGINT"),
        }
    }
}

/// The process's termination signals.
#[cfg(not(unix))]
pub struct TerminationSignals;

#[cfg(not(unix))]
impl TerminationSignals {
    pub fn install() -> io::Result<Self> {
        Ok(Self)
    }
}

#[cfg(not(unix))]
#[async_trait]
impl SignalSource for TerminationSignals {
    async fn next_signal(&mut self) -> io::Result<&'static str> {
        tokio::signal::ctrl_c().await?;
        Ok("ctrl-c")
    }
}

/// Register the process's termination signals and translate them into
/// shutdown requests until shutdown is forced.
pub fn spawn_signal_handler(shutdown: Shutdown) -> JoinHandle<()> {
    match TerminationSignals::install() {
        Ok(signals) => tokio::spawn(forward_signals(signals, shutdown)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handler");
            tokio::spawn(async {})
        }
    }
}

/// First request triggers, the second forces.
pub async fn forward_signals<S: SignalSource>(mut source: S, shutdown: Shutdown) {
    loop {
        let received = tokio::select! {
            received = source.next_signal() => received,
            () = shutdown.forced() => return,
        };

        match received {
            Ok(signal) if !shutdown.is_triggered() => {
                tracing::info!(signal, "Shutdown signal received");
                shutdown.trigger();
            }
            Ok(signal) => {
                tracing::warn!(signal, "Second shutdown signal received, forcing shutdown");
                shutdown.force();
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "Signal stream failed");
                return;
            }
        }
    }
}
