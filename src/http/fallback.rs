//! Plain HTTP handling for everything that is not gRPC.
//!
//! Every path answers 200 with `Hello World from: <path>\n`. Request IDs are
//! assigned as early as possible and echoed back so log lines can be matched
//! to client reports.

use axum::http::Uri;
use axum::Router;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// Build the plain HTTP router.
pub fn router() -> Router {
    Router::new()
        .fallback(hello)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn hello(uri: Uri) -> String {
    format!("Hello World from: {}\n", uri.path())
}
