//! Per-request protocol classification.
//!
//! A request goes to the gRPC services iff it arrived over HTTP/2 and its
//! `content-type` starts with `application/grpc`. Anything else, including
//! a gRPC content type over HTTP/1.1, is plain HTTP.

use axum::body::{Body, Bytes, HttpBody};
use axum::http::{header, Request, Response, StatusCode, Version};
use axum::{BoxError, Router};
use tonic::service::Routes;
use tower::ServiceExt;

use crate::observability::metrics;

const GRPC_CONTENT_TYPE: &str = "application/grpc";

/// Which handler a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Rpc,
    Http,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Rpc => "rpc",
            Protocol::Http => "http",
        }
    }
}

pub fn classify<B>(request: &Request<B>) -> Protocol {
    let grpc_content = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with(GRPC_CONTENT_TYPE));

    if request.version() == Version::HTTP_2 && grpc_content {
        Protocol::Rpc
    } else {
        Protocol::Http
    }
}

/// Routes each request to exactly one of the two handlers.
#[derive(Clone)]
pub struct Dispatcher {
    rpc: Routes,
    http: Router,
}

impl Dispatcher {
    pub fn new(rpc: Routes, http: Router) -> Self {
        Self { rpc, http }
    }

    pub async fn dispatch<B>(self, request: Request<B>) -> Response<Body>
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let protocol = classify(&request);
        metrics::record_request(protocol.as_str());

        let result: Result<Response<Body>, BoxError> = match protocol {
            Protocol::Rpc => self
                .rpc
                .oneshot(request)
                .await
                .map(|response| response.map(Body::new))
                .map_err(Into::into),
            Protocol::Http => self.http.oneshot(request).await.map_err(Into::into),
        };

        match result {
            Ok(response) => response,
            Err(error) => {
                tracing::error!(protocol = protocol.as_str(), error = %error, "Handler failed");
                let mut response = Response::new(Body::empty());
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
        }
    }
}
