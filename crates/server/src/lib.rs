//! docpilot-server library crate
//!
//! Exposes `build_app`, the application state and the pipeline pieces for
//! integration tests. The binary entrypoint is in `main.rs`.

pub mod ai;
pub mod config;
mod error;
mod middleware;
mod routes;
pub mod search;
pub mod services;
pub mod state;
pub mod storage;

use axum::{Extension, Router, middleware as axum_mw, routing::get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use error::AppError;
pub use state::AppState;

use middleware::ApiKeyAuth;

/// Build the full application router with all routes and middleware.
///
/// Extracted from `main()` so integration tests can construct the app
/// without binding to a TCP port.
pub fn build_app(state: AppState, config: &Config) -> Router {
    let auth = ApiKeyAuth::new(config.api_key.clone());
    let rate_limiter = middleware::create_rate_limiter(config.rate_limit_rps);

    let api_routes = routes::api_routes()
        .layer(axum_mw::from_fn(middleware::auth_middleware))
        .layer(Extension(auth))
        .layer(axum_mw::from_fn(middleware::rate_limit_middleware))
        .layer(Extension(rate_limiter));

    // build_recorder() + set_global_recorder() so repeated calls (as in the
    // integration tests) still get a valid handle for /metrics.
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let prometheus_handle = recorder.handle();
    let _ = metrics::set_global_recorder(recorder);

    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/", get(routes::ui::root))
        .route("/api/health", get(routes::health::check))
        .route(
            "/metrics",
            get(routes::metrics::get).layer(Extension(prometheus_handle)),
        )
        .nest("/api", api_routes)
        .nest_service("/static", ServeDir::new(&state.static_dir))
        .fallback(routes::ui::fallback)
        .with_state(state)
        .layer(axum_mw::from_fn(middleware::audit_middleware))
        .layer(axum_mw::from_fn(middleware::request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum_mw::from_fn(middleware::metrics_middleware))
}
