//! Application error handling

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use docpilot_core::{ClinicalError, Failure};

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Bad request whose message is `"{context}: {error}"`.
    pub fn failed(context: &str, err: ClinicalError) -> Self {
        tracing::warn!(context, kind = err.kind(), error = %err, "Pipeline failed");
        match err {
            ClinicalError::Unavailable(msg) => AppError::Unavailable(msg),
            other => AppError::BadRequest(format!("{context}: {other}")),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, Json(Failure::new(self.to_string()))).into_response()
    }
}

impl From<ClinicalError> for AppError {
    fn from(err: ClinicalError) -> Self {
        tracing::debug!(kind = err.kind(), error = %err, "Pipeline error");
        match err {
            ClinicalError::Unavailable(msg) => AppError::Unavailable(msg),
            ClinicalError::Invalid(msg) => AppError::BadRequest(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}
