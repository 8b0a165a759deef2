//! Request-level workflows behind the HTTP routes

pub mod clinical;
pub mod patients;
pub mod sessions;

pub use clinical::{ClinicalAssistant, ClinicalResponse};
pub use patients::{PatientIntake, PatientRegistry, StoredPatient};
pub use sessions::{Session, SessionRegistry};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// Current UTC time as RFC 3339 with microseconds
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Treatment block of a response: either recommendations or the reason
/// there are none.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TreatmentSection<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treatment_recommendations: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> TreatmentSection<T> {
    pub fn ready(recommendations: T) -> Self {
        Self {
            success: true,
            treatment_recommendations: Some(recommendations),
            search_query: None,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            treatment_recommendations: None,
            search_query: None,
            error: Some(error.into()),
        }
    }

    pub fn with_search_query(mut self, query: String) -> Self {
        self.search_query = Some(query);
        self
    }
}
