use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;

use crate::services::Session;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub success: bool,
    pub session_id: String,
    pub message: &'static str,
    pub session_data: Session,
}

/// POST /api/new-session - Start a new clinical session
pub async fn create(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.sessions.create().await;
    Json(SessionCreated {
        success: true,
        session_id: session.session_id.clone(),
        message: "New session created successfully",
        session_data: session,
    })
}
