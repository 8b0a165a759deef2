//! Optional API key authentication for `/api/*`

use axum::{
    Json,
    body::Body,
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use docpilot_core::Failure;

/// Header carrying the client's key
pub const API_KEY_HEADER: &str = "X-API-Key";

/// API Key authentication state
#[derive(Clone)]
pub struct ApiKeyAuth {
    api_key: Option<String>,
}

impl ApiKeyAuth {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }

    /// Every request passes when no key is configured.
    pub fn allows(&self, headers: &HeaderMap) -> bool {
        match &self.api_key {
            None => true,
            Some(expected) => headers
                .get(API_KEY_HEADER)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|given| given == expected),
        }
    }
}

/// Reject requests without the configured API key
pub async fn auth_middleware(request: Request<Body>, next: Next) -> Response {
    let auth = request.extensions().get::<ApiKeyAuth>().cloned();

    if let Some(auth) = auth {
        if !auth.allows(request.headers()) {
            tracing::warn!(path = %request.uri().path(), "Rejected request without valid API key");
            return (
                StatusCode::UNAUTHORIZED,
                Json(Failure::new("Missing or invalid API key")),
            )
                .into_response();
        }
    }

    next.run(request).await
}
