//! Request logging.
//!
//! Each request runs inside an `http_request` span. The trace id of that
//! span is what ties the request's log lines together, so no separate
//! request id is generated.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use opentelemetry::trace::TraceContextExt;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::observability::metrics;
use crate::observability::tracing::extract_remote_context;

/// Span factory for `TraceLayer::make_span_with`.
///
/// A valid `traceparent` header makes the span a child of the caller's trace.
pub fn make_request_span(request: &Request) -> Span {
    let span = tracing::info_span!(
        "http_request",
        method = %request.method(),
        path = %request.uri().path(),
    );

    let remote = extract_remote_context(request.headers());
    if remote.span().span_context().is_valid() {
        span.set_parent(remote);
    }
    span
}

pub async fn log_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    tracing::info!(method = %method, path = %path, "Request started");
    let response = next.run(request).await;

    let status = response.status().as_u16();
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    tracing::info!(
        method = %method,
        path = %path,
        status,
        elapsed_ms,
        "Request completed"
    );
    metrics::record_request(method.as_str(), status, start);

    response
}
