//! Audit trail for state-changing API calls

use std::time::Instant;

use axum::{body::Body, extract::Request, http::Method, middleware::Next, response::Response};

use super::request_id::RequestId;

/// Log every POST, PUT and DELETE under the `audit` target. Clinical
/// payloads are never logged, only the route and outcome.
pub async fn audit_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    if !matches!(method, Method::POST | Method::PUT | Method::DELETE) {
        return next.run(request).await;
    }

    let path = request.uri().path().to_string();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_else(|| "unknown".to_string());

    let start = Instant::now();
    let response = next.run(request).await;
    let status = response.status();

    tracing::info!(
        target: "audit",
        request_id = %request_id,
        method = %method,
        path = %path,
        status = status.as_u16(),
        outcome = if status.is_success() { "success" } else { "failure" },
        elapsed_ms = start.elapsed().as_millis() as u64,
        "API mutation"
    );

    response
}
