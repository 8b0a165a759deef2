//! Health check endpoint

use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;

use crate::services::timestamp;
use crate::state::AppState;

const OPERATIONAL: &str = "operational";
const UNAVAILABLE: &str = "unavailable";

/// Per-service status
#[derive(Serialize)]
pub struct ServiceStatus {
    rag_system: &'static str,
    treatment_recommendations: &'static str,
    ai_summarization: &'static str,
    patient_management: &'static str,
    session_management: &'static str,
    storage: &'static str,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: String,
    version: &'static str,
    services: ServiceStatus,
}

/// GET /api/health - Report which collaborators are configured
pub async fn check(State(state): State<AppState>) -> impl IntoResponse {
    let ai = state.model.is_some();
    let storage = state.store.as_ref().map(|s| s.backend());
    let when = |ready: bool| if ready { OPERATIONAL } else { UNAVAILABLE };

    Json(HealthResponse {
        status: "healthy",
        timestamp: timestamp(),
        version: env!("CARGO_PKG_VERSION"),
        services: ServiceStatus {
            rag_system: when(ai && storage.is_some()),
            treatment_recommendations: when(ai),
            ai_summarization: when(ai),
            patient_management: if ai {
                "operational with AI"
            } else {
                "operational without AI"
            },
            session_management: OPERATIONAL,
            storage: storage.unwrap_or("not configured"),
        },
    })
}
