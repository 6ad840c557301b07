//! gRPC services served on the shared port.

use std::convert::Infallible;

use axum::http::Request;
use axum::response::IntoResponse;
use tonic::body::Body;
use tonic::server::NamedService;
use tonic::service::Routes;
use tonic_health::server::{health_reporter, HealthReporter};
use tonic_health::ServingStatus;

/// The gRPC dispatcher: the health service plus whatever the embedder adds
/// (normally the manager service).
#[derive(Clone)]
pub struct RpcServices {
    routes: Routes,
    health: HealthReporter,
}

impl RpcServices {
    /// Only `grpc.health.v1.Health`, reporting SERVING.
    pub fn new() -> Self {
        let (health, health_service) = health_reporter();
        Self {
            routes: Routes::new(health_service),
            health,
        }
    }

    /// Register another service on the same dispatcher.
    pub fn add_service<S>(mut self, service: S) -> Self
    where
        S: tower::Service<Request<Body>, Error = Infallible>
            + NamedService
            + Clone
            + Send
            + Sync
            + 'static,
        S::Response: IntoResponse,
        S::Future: Send + 'static,
    {
        self.routes = self.routes.add_service(service);
        self
    }

    pub(crate) fn into_parts(self) -> (Routes, HealthReporter) {
        (self.routes, self.health)
    }
}

impl Default for RpcServices {
    fn default() -> Self {
        Self::new()
    }
}

/// Flip the overall health status seen by `Check("")`.
pub(crate) async fn set_overall_status(health: &HealthReporter, status: ServingStatus) {
    health.set_service_status("", status).await;
}
