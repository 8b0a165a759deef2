//! Patient intake with optional AI analysis

use std::collections::HashMap;
use std::sync::Arc;

use docpilot_core::{ClinicalAnalysis, ClinicalError, PatientData, PatientRow, TreatmentPlan};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{TreatmentSection, timestamp};
use crate::ai::ChatModel;
use crate::ai::analyzer::analyze_patient;

/// A patient accepted by the intake endpoint
#[derive(Debug, Clone, Serialize)]
pub struct StoredPatient {
    pub patient_id: String,
    pub created_at: String,
    pub original_data: PatientData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<ClinicalAnalysis>,
}

/// Single-row table shown for a newly added patient
#[derive(Debug, Clone, Serialize)]
pub struct IntakeData {
    pub total_records: usize,
    pub search_type: &'static str,
    pub patients_searched: usize,
    pub raw_data: Vec<PatientRow>,
    pub sql_query: String,
    pub explanation: String,
}

/// Response to adding a patient, shaped like a clinical query response
#[derive(Debug, Clone, Serialize)]
pub struct PatientIntake {
    pub success: bool,
    pub patient_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub rag_data: IntakeData,
    pub treatment_recommendations: TreatmentSection<TreatmentPlan>,
    pub timestamp: String,
}

/// In-process store of analysed patients
#[derive(Clone, Default)]
pub struct PatientRegistry {
    patients: Arc<RwLock<HashMap<String, StoredPatient>>>,
}

impl PatientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, patient_id: &str) -> Option<StoredPatient> {
        self.patients.read().await.get(patient_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.patients.read().await.len()
    }

    /// Analyse and store a patient. Without a model the patient is echoed
    /// back unanalysed and not stored.
    pub async fn admit(
        &self,
        model: Option<&dyn ChatModel>,
        patient: PatientData,
    ) -> Result<PatientIntake, ClinicalError> {
        let patient_id = Uuid::new_v4().to_string();
        let row = PatientRow::from(&patient);

        let Some(model) = model else {
            tracing::warn!(patient_id = %patient_id, "Adding patient without AI analysis");
            return Ok(PatientIntake {
                success: true,
                patient_id,
                message: Some("Patient added without AI analysis (service unavailable)".to_string()),
                query: None,
                rag_data: IntakeData {
                    total_records: 1,
                    search_type: "patient_add",
                    patients_searched: 1,
                    sql_query: format!("Patient added: {}", row.name),
                    raw_data: vec![row],
                    explanation: "Patient data stored successfully without AI analysis".to_string(),
                },
                treatment_recommendations: TreatmentSection::failed("AI analysis service unavailable"),
                timestamp: timestamp(),
            });
        };

        let analysis = analyze_patient(model, &patient).await?;
        let complaint = patient.complaint_or("Medical assessment").to_string();
        let focus = if analysis.problem.is_empty() {
            "clinical assessment"
        } else {
            analysis.problem.as_str()
        };

        let intake = PatientIntake {
            success: true,
            patient_id: patient_id.clone(),
            message: None,
            query: Some(format!("AI analysis for patient: {complaint}")),
            rag_data: IntakeData {
                total_records: 1,
                search_type: "ai_patient_analysis",
                patients_searched: 1,
                raw_data: vec![row],
                sql_query: format!("AI Analysis: {}", patient.complaint_or("N/A")),
                explanation: format!("Intelligent clinical analysis focusing on: {focus}"),
            },
            treatment_recommendations: TreatmentSection::ready(TreatmentPlan::from(&analysis)),
            timestamp: timestamp(),
        };

        self.patients.write().await.insert(
            patient_id.clone(),
            StoredPatient {
                patient_id: patient_id.clone(),
                created_at: intake.timestamp.clone(),
                original_data: patient,
                ai_analysis: Some(analysis),
            },
        );
        tracing::info!(patient_id = %patient_id, "Patient analysed and stored");

        Ok(intake)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::ScriptedModel;
    use serde_json::json;

    fn patient() -> PatientData {
        serde_json::from_value(json!({
            "personal_details": {"name": "John Smith", "age": 45, "gender": "Male"},
            "medical_history": ["Type 2 Diabetes"],
            "current_complaint": "Fell down, severe leg pain",
            "current_medications": ["Metformin"],
            "vital_signs": {}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn admits_with_analysis() {
        let registry = PatientRegistry::new();
        let model = ScriptedModel::new([
            "CLINICAL PROBLEM:\nPossible femur fracture\n\nRELEVANT MEDICAL FACTORS:\n- Diabetes: slow healing\n",
        ]);

        let intake = registry.admit(Some(&model), patient()).await.unwrap();

        assert_eq!(intake.rag_data.search_type, "ai_patient_analysis");
        assert_eq!(intake.query.as_deref(), Some("AI analysis for patient: Fell down, severe leg pain"));
        assert_eq!(
            intake.rag_data.explanation,
            "Intelligent clinical analysis focusing on: Possible femur fracture"
        );
        let plan = intake.treatment_recommendations.treatment_recommendations.as_ref().unwrap();
        assert_eq!(plan.key_factors, vec!["Diabetes: slow healing"]);

        let stored = registry.get(&intake.patient_id).await.unwrap();
        assert_eq!(stored.original_data.personal_details.name.as_deref(), Some("John Smith"));
        assert!(stored.ai_analysis.is_some());
    }

    #[tokio::test]
    async fn admits_without_model() {
        let registry = PatientRegistry::new();
        let intake = registry.admit(None, patient()).await.unwrap();

        assert_eq!(intake.rag_data.search_type, "patient_add");
        assert_eq!(intake.rag_data.sql_query, "Patient added: John Smith");
        assert!(!intake.treatment_recommendations.success);
        assert_eq!(
            intake.treatment_recommendations.error.as_deref(),
            Some("AI analysis service unavailable")
        );
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn analysis_transport_failure_is_returned() {
        let registry = PatientRegistry::new();
        let model = ScriptedModel::failing("Perplexity API timeout - please try again");
        assert!(registry.admit(Some(&model), patient()).await.is_err());
        assert_eq!(registry.len().await, 0);
    }
}
