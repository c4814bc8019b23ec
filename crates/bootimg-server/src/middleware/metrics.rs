//! # Request Metrics
//!
//! Records HTTP metrics through the `metrics` facade. The binary installs a
//! Prometheus recorder; without one (tests, `--no-metrics`) recording is a
//! no-op.
//!
//! | Metric                                    | Kind      | Labels                   |
//! |-------------------------------------------|-----------|--------------------------|
//! | `bootimg_http_requests_total`             | counter   | method, route, status    |
//! | `bootimg_http_errors_total`               | counter   | method, route, status    |
//! | `bootimg_http_request_duration_seconds`   | histogram | method, route            |
//!
//! `route` is the matched route pattern, never the raw path, so image
//! tokens do not become label values.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;

/// Middleware that records request counts, errors and latency.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().as_str().to_owned();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let response = next.run(request).await;

    let status = response.status();
    let labels = [
        ("method", method.clone()),
        ("route", route.clone()),
        ("status", status.as_u16().to_string()),
    ];
    metrics::counter!("bootimg_http_requests_total", &labels).increment(1);
    if status.is_client_error() || status.is_server_error() {
        metrics::counter!("bootimg_http_errors_total", &labels).increment(1);
    }
    metrics::histogram!(
        "bootimg_http_request_duration_seconds",
        "method" => method,
        "route" => route
    )
    .record(started.elapsed().as_secs_f64());

    response
}
