//! docpilot-core: shared types for the DocPilot clinical assistant
//!
//! Request/response shapes, the pipeline error enum and the failure
//! envelope used by the HTTP layer.

pub mod analysis;
pub mod envelope;
pub mod error;
pub mod patient;
pub mod search;
pub mod service;

pub use analysis::{ClinicalAnalysis, DEFAULT_REFERENCES, TreatmentPlan};
pub use envelope::{Failure, RouteNotFound};
pub use error::ClinicalError;
pub use patient::{PatientData, PatientRow, PersonalDetails};
pub use search::{PatientFolder, Record, SearchResult, SearchType, SqlPlan};
pub use service::{EndpointInfo, ServiceInfo};
