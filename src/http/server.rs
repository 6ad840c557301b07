//! The protocol multiplexer: one TCP port serving gRPC over cleartext HTTP/2
//! and plain HTTP/1.1 or HTTP/2.
//!
//! # Responsibilities
//! - Accept connections from the bounded listener
//! - Negotiate HTTP/1.1 or HTTP/2 prior-knowledge per connection; an
//!   `Upgrade: h2c` request is answered over HTTP/1.1
//! - Dispatch each request to the gRPC services or the plain handler
//! - Drain in-flight connections on cancellation, up to a deadline
//!
//! # Lifecycle
//! ```text
//! Created → Serving(addr) → Draining → Stopped
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;

use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tonic_health::server::HealthReporter;
use tonic_health::ServingStatus;

use super::dispatch::Dispatcher;
use super::fallback;
use super::rpc::{self, RpcServices};
use crate::config::ServerConfig;
use crate::net::{ConnectionTracker, Listener, ListenerError};

/// Observable multiplexer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuxState {
    Created,
    Serving(SocketAddr),
    Draining,
    Stopped,
}

pub struct Multiplexer {
    config: ServerConfig,
    dispatcher: Dispatcher,
    health: HealthReporter,
    tracker: ConnectionTracker,
    state: watch::Sender<MuxState>,
}

impl Multiplexer {
    pub fn new(config: ServerConfig, rpc: RpcServices) -> Self {
        let (routes, health) = rpc.into_parts();
        let (state, _) = watch::channel(MuxState::Created);
        Self {
            config,
            dispatcher: Dispatcher::new(routes, fallback::router()),
            health,
            tracker: ConnectionTracker::new(),
            state,
        }
    }

    /// Subscribe to state transitions. The bound address shows up in
    /// `Serving`, which is how callers learn an ephemeral port.
    pub fn state(&self) -> watch::Receiver<MuxState> {
        self.state.subscribe()
    }

    /// Bind the configured address and serve until `shutdown` fires.
    ///
    /// A bind failure is returned; everything after that is handled inside.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), ListenerError> {
        let listener = Listener::bind(&self.config).await?;
        self.serve(listener, shutdown).await;
        Ok(())
    }

    /// Serve on an already bound listener until `shutdown` fires, then drain.
    pub async fn serve(self, listener: Listener, shutdown: CancellationToken) {
        let local_addr = listener.local_addr();
        let builder = auto::Builder::new(TokioExecutor::new());
        let graceful = GracefulShutdown::new();
        let force_close = CancellationToken::new();

        self.state.send_replace(MuxState::Serving(local_addr));
        tracing::info!(address = %local_addr, "Multiplexer serving gRPC and HTTP");

        loop {
            let accepted = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            let (stream, peer_addr, permit) = match accepted {
                Ok(accepted) => accepted,
                Err(ListenerError::Closed) => {
                    tracing::error!("Connection limiter closed, stopping accept loop");
                    break;
                }
                Err(e) => {
                    // Usually fd exhaustion; back off briefly instead of spinning.
                    tracing::warn!(error = %e, "Accept failed");
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                    continue;
                }
            };

            let guard = self.tracker.track();
            let dispatcher = self.dispatcher.clone();
            let service = service_fn(move |request: Request<Incoming>| {
                let dispatcher = dispatcher.clone();
                async move { Ok::<_, Infallible>(dispatcher.dispatch(request).await) }
            });

            let connection = builder
                .serve_connection_with_upgrades(TokioIo::new(stream), service)
                .into_owned();
            let connection = graceful.watch(connection);
            let force_close = force_close.clone();

            tokio::spawn(async move {
                let _permit = permit;
                tokio::select! {
                    result = connection => {
                        if let Err(e) = result {
                            tracing::debug!(
                                connection_id = %guard.id(),
                                peer_addr = %peer_addr,
                                error = %e,
                                "Connection ended with error"
                            );
                        }
                    }
                    () = force_close.cancelled() => {
                        tracing::debug!(connection_id = %guard.id(), "Connection closed at drain deadline");
                    }
                }
            });
        }

        drop(listener);
        self.state.send_replace(MuxState::Draining);
        rpc::set_overall_status(&self.health, ServingStatus::NotServing).await;

        let drain_timeout = self.config.drain_timeout();
        tracing::info!(
            active_connections = self.tracker.active_count(),
            timeout = ?drain_timeout,
            "Draining connections"
        );

        tokio::select! {
            () = graceful.shutdown() => {
                tracing::info!("All connections drained");
            }
            () = tokio::time::sleep(drain_timeout) => {
                tracing::warn!(
                    remaining = self.tracker.active_count(),
                    "Drain deadline elapsed, closing remaining connections"
                );
                force_close.cancel();
            }
        }

        self.state.send_replace(MuxState::Stopped);
        tracing::info!("Multiplexer stopped");
    }
}
