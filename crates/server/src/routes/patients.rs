//! Patient endpoints

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use docpilot_core::{PatientData, PatientFolder};
use serde::Serialize;

use crate::error::AppError;
use crate::services::timestamp;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PatientListing {
    pub success: bool,
    pub patient_folders: Vec<PatientFolder>,
    pub total_patients: usize,
    pub source: &'static str,
    pub timestamp: String,
}

/// POST /api/add-patient - Analyse a patient case
pub async fn add(
    State(state): State<AppState>,
    Json(patient): Json<PatientData>,
) -> Result<impl IntoResponse, AppError> {
    let intake = state
        .patients
        .admit(state.model.as_deref(), patient)
        .await
        .map_err(|e| AppError::failed("Patient processing failed", e))?;

    Ok(Json(intake))
}

/// GET /api/patients/{id} - A patient added through this server
pub async fn read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state
        .patients
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Patient {id} not found")))
}

/// GET /api/list-patients - Patient folders in object storage
pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let store = state.store()?;
    let folders = store.list_patient_folders().await?;

    Ok(Json(PatientListing {
        success: true,
        total_patients: folders.len(),
        patient_folders: folders,
        source: store.backend(),
        timestamp: timestamp(),
    }))
}
