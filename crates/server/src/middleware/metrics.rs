//! Prometheus metrics collection middleware
//!
//! Records `http_requests_total` and `http_request_duration_seconds` for
//! every request, labelled by method, route and status.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Route label for a request path. Patient ids collapse to `:id` and
/// client-side UI routes collapse to `/*`, keeping label cardinality bounded.
fn route_label(path: &str) -> String {
    let known = path == "/"
        || path == "/metrics"
        || path.starts_with("/api/")
        || path.starts_with("/static/");
    if !known {
        return "/*".to_string();
    }
    if path.starts_with("/static/") {
        return "/static/*".to_string();
    }

    path.split('/')
        .map(|seg| {
            if uuid::Uuid::try_parse(seg).is_ok() {
                ":id"
            } else {
                seg
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Middleware that records request count and duration metrics.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let route = route_label(request.uri().path());

    let start = Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed().as_secs_f64();

    let status = response.status().as_u16().to_string();

    metrics::counter!(
        "http_requests_total",
        "method" => method.clone(),
        "path" => route.clone(),
        "status" => status
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method,
        "path" => route
    )
    .record(duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patient_ids_collapse() {
        assert_eq!(
            route_label("/api/patients/006c29d1-d868-3a9e-ceab-31f23e398f45"),
            "/api/patients/:id"
        );
        assert_eq!(route_label("/api/text-query"), "/api/text-query");
    }

    #[test]
    fn ui_routes_collapse() {
        assert_eq!(route_label("/dashboard/patients/7"), "/*");
        assert_eq!(route_label("/static/app.js"), "/static/*");
        assert_eq!(route_label("/"), "/");
    }
}
