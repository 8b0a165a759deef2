//! Single-page UI and the catch-all fallback

use std::path::Path;

use axum::{
    Json,
    extract::State,
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};
use docpilot_core::{RouteNotFound, ServiceInfo};

use crate::state::AppState;

async fn index_html(path: &Path) -> Option<Html<String>> {
    tokio::fs::read_to_string(path).await.ok().map(Html)
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(RouteNotFound::default())).into_response()
}

/// GET / - The UI if installed, otherwise a description of the API
pub async fn root(State(state): State<AppState>) -> Response {
    match index_html(&state.index_file).await {
        Some(page) => page.into_response(),
        None => Json(ServiceInfo::new(&state.index_file.display().to_string())).into_response(),
    }
}

/// Unknown API paths are 404; anything else is a client-side route.
pub async fn fallback(State(state): State<AppState>, uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');
    if path == "api" || path.starts_with("api/") || path.starts_with("static/") {
        tracing::debug!(path, "Unknown route");
        return not_found();
    }

    match index_html(&state.index_file).await {
        Some(page) => page.into_response(),
        None => not_found(),
    }
}
