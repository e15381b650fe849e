//! Per-request metrics

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use rkive_common::metrics::RequestMetrics;

/// Count and time every routed request, labelled by route template
pub async fn track_requests(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    let metrics = RequestMetrics::start(request.method().as_str(), &endpoint);
    let response = next.run(request).await;
    metrics.finish(response.status().as_u16());

    response
}
