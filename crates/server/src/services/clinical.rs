//! Retrieval, summary and treatment as one pipeline

use std::sync::Arc;

use docpilot_core::{ClinicalError, SearchResult};
use serde::Serialize;
use serde_json::Value as JsonValue;

use super::{TreatmentSection, timestamp};
use crate::ai::ChatModel;
use crate::ai::summarizer::summarize;
use crate::ai::treatment::{key_findings_from_records, key_findings_from_summary, recommend};
use crate::search::ClinicalSearch;

/// Answer to a free-text clinical question
#[derive(Debug, Clone, Serialize)]
pub struct ClinicalResponse {
    pub success: bool,
    pub query: String,
    pub patient_id: Option<String>,
    pub rag_data: SearchResult,
    pub summary: JsonValue,
    pub treatment_recommendations: TreatmentSection<JsonValue>,
    pub timestamp: String,
}

/// Runs the three model calls in sequence for one question.
#[derive(Clone)]
pub struct ClinicalAssistant {
    model: Arc<dyn ChatModel>,
    search: ClinicalSearch,
}

impl ClinicalAssistant {
    pub fn new(model: Arc<dyn ChatModel>, search: ClinicalSearch) -> Self {
        Self { model, search }
    }

    /// Retrieval and summary failures abort; a treatment failure is reported
    /// inside the response.
    pub async fn process(
        &self,
        query: &str,
        patient_id: Option<&str>,
    ) -> Result<ClinicalResponse, ClinicalError> {
        let full_query = match patient_id {
            Some(id) => format!("{query} for patient {id}"),
            None => query.to_string(),
        };

        let rag_data = self.search.search(&full_query).await?;
        tracing::info!(records = rag_data.total_records, "Retrieved clinical data");

        let table = serde_json::to_value(&rag_data)
            .map_err(|e| ClinicalError::Parse(format!("Could not encode search result: {e}")))?;
        let report = summarize(self.model.as_ref(), &table, query).await?;

        let mut findings = if report.fallback {
            Vec::new()
        } else {
            key_findings_from_summary(&report.summary)
        };
        if findings.is_empty() {
            findings = key_findings_from_records(&rag_data.raw_data);
        }
        let context = report
            .overview()
            .map_or_else(|| format!("Clinical data retrieved for query: {query}"), str::to_string);

        let treatment_recommendations =
            match recommend(self.model.as_ref(), &findings, &context).await {
                Ok(treatment) => TreatmentSection::ready(treatment.recommendations)
                    .with_search_query(treatment.search_query),
                Err(e) => {
                    tracing::warn!(error = %e, "Treatment recommendations unavailable");
                    TreatmentSection::failed(e.to_string())
                }
            };

        Ok(ClinicalResponse {
            success: true,
            query: query.to_string(),
            patient_id: patient_id.map(str::to_string),
            rag_data,
            summary: report.summary,
            treatment_recommendations,
            timestamp: timestamp(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::ScriptedModel;
    use crate::search::SearchSettings;
    use crate::search::engine::QueryEngine;
    use crate::storage::LocalStore;

    const PATIENT: &str = "0098f2a9-2f4d-4209-778d-cb3426d85987";
    const SQL: &str = r#"{"sql_query": "SELECT conditions_DESCRIPTION, medications_DESCRIPTION FROM '{}' LIMIT 100", "query_type": "conditions"}"#;
    const SUMMARY: &str = r#"{"overview": "One asthmatic patient", "clinical_findings": {"conditions": ["Asthma"], "medications": ["Albuterol"]}}"#;

    fn assistant(model: Arc<ScriptedModel>) -> (tempfile::TempDir, ClinicalAssistant) {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("patient_0098f2a9_2f4d_4209_778d_cb3426d85987");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(
            folder.join("merged_patient_data.csv"),
            "PATIENTID,conditions_DESCRIPTION,medications_DESCRIPTION\n\
             0098f2a9-2f4d-4209-778d-cb3426d85987,Asthma,Albuterol\n",
        )
        .unwrap();

        let search = ClinicalSearch::new(
            model.clone(),
            Arc::new(LocalStore::new(dir.path())),
            QueryEngine::in_memory().unwrap(),
            SearchSettings::default(),
        );
        (dir, ClinicalAssistant::new(model, search))
    }

    #[tokio::test]
    async fn full_pipeline() {
        let model = Arc::new(ScriptedModel::new([
            SQL,
            SUMMARY,
            r#"{"general_recommendations": ["Inhaled corticosteroids"]}"#,
        ]));
        let (_dir, assistant) = assistant(model.clone());

        let response = assistant
            .process("What conditions are recorded", Some(PATIENT))
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(response.query, "What conditions are recorded");
        assert_eq!(response.rag_data.total_records, 1);
        assert_eq!(response.summary["overview"], "One asthmatic patient");
        assert!(response.treatment_recommendations.success);

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[0].user.contains(&format!("for patient {PATIENT}")));
        assert!(prompts[2].user.contains("Summary: One asthmatic patient"));
        assert!(prompts[2].user.contains("\"Albuterol\""));
    }

    #[tokio::test]
    async fn treatment_failure_does_not_abort() {
        let model = Arc::new(ScriptedModel::new([SQL, "not json at all"]));
        let (_dir, assistant) = assistant(model.clone());

        let response = assistant.process("conditions", Some(PATIENT)).await.unwrap();

        assert!(response.success);
        assert!(!response.treatment_recommendations.success);
        assert_eq!(
            response.treatment_recommendations.error.as_deref(),
            Some("Treatment search failed: script exhausted")
        );
        // fallback summary means findings come from the rows
        let prompts = model.prompts();
        assert!(prompts[2].user.contains("\"Asthma\""));
    }

    #[tokio::test]
    async fn retrieval_failure_aborts() {
        let model = Arc::new(ScriptedModel::new(["I can't write SQL for that"]));
        let (_dir, assistant) = assistant(model.clone());

        let err = assistant.process("conditions", Some(PATIENT)).await.unwrap_err();
        assert!(matches!(err, ClinicalError::Parse(_)));
        assert_eq!(model.prompts().len(), 1);
    }
}
