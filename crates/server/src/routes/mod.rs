pub mod clinical;
pub mod health;
pub mod metrics;
pub mod patients;
pub mod sessions;
pub mod ui;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Build the `/api` routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/text-query", post(clinical::text_query))
        .route("/summarize", post(clinical::summarize))
        .route("/add-patient", post(patients::add))
        .route("/patients/{id}", get(patients::read))
        .route("/list-patients", get(patients::list))
        .route("/new-session", post(sessions::create))
}
