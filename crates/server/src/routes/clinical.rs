//! Clinical question and summarization endpoints

use axum::{Json, extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::ai::summarizer;
use crate::error::AppError;
use crate::services::timestamp;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TextQueryRequest {
    pub query: String,
    #[serde(default)]
    pub patient_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub table_data: JsonValue,
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct DataSource {
    pub total_records: u64,
    pub search_type: String,
}

#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    pub success: bool,
    pub summary: JsonValue,
    pub original_data: JsonValue,
    pub query: String,
    pub analysis_depth: &'static str,
    pub timestamp: String,
    pub data_source: DataSource,
}

/// POST /api/text-query - Retrieve, summarize and recommend for a question
pub async fn text_query(
    State(state): State<AppState>,
    Json(request): Json<TextQueryRequest>,
) -> Result<impl IntoResponse, AppError> {
    if request.query.trim().is_empty() {
        return Err(AppError::BadRequest("Query must not be empty".to_string()));
    }
    let assistant = state.assistant()?;
    let patient_id = request.patient_id.as_deref().filter(|id| !id.trim().is_empty());

    let response = assistant
        .process(&request.query, patient_id)
        .await
        .map_err(|e| AppError::failed("Clinical query failed", e))?;

    Ok(Json(response))
}

/// POST /api/summarize - Summarize a retrieval result
pub async fn summarize(
    State(state): State<AppState>,
    Json(request): Json<SummarizeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let model = state.model()?;

    let report = summarizer::summarize(model.as_ref(), &request.table_data, &request.query)
        .await
        .map_err(|e| AppError::failed("Summarization failed", e))?;

    let data_source = DataSource {
        total_records: request.table_data["total_records"].as_u64().unwrap_or(0),
        search_type: request.table_data["search_type"]
            .as_str()
            .unwrap_or("unknown")
            .to_string(),
    };

    Ok(Json(SummarizeResponse {
        success: true,
        summary: report.summary,
        original_data: request.table_data,
        query: request.query,
        analysis_depth: "comprehensive",
        timestamp: timestamp(),
        data_source,
    }))
}
