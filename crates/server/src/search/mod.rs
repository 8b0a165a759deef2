//! Question to rows: classify the query, have the model write SQL, bind it
//! to the right patient files and run it in DuckDB.

pub mod engine;
pub mod intent;
pub mod query;

use std::sync::Arc;

use docpilot_core::{ClinicalError, SearchResult, SearchType, SqlPlan};

use crate::ai::ChatModel;
use crate::ai::sql_gen::generate_sql;
use crate::storage::{ObjectStore, patient_csv_url};
use engine::QueryEngine;
use intent::{PatientRef, SearchIntent, classify};

pub const GLOBAL_SEARCH_MAX_FILES: usize = 10;
pub const RESULT_LIMIT: usize = 100;

/// Knobs for the retrieval pipeline
#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Patient files joined into one population query
    pub max_files: usize,
    /// The single `LIMIT` applied to population queries
    pub result_limit: usize,
    /// Patient used when a query names someone without an id
    pub default_patient_id: Option<String>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_files: GLOBAL_SEARCH_MAX_FILES,
            result_limit: RESULT_LIMIT,
            default_patient_id: None,
        }
    }
}

/// Natural-language retrieval over the patient CSVs
#[derive(Clone)]
pub struct ClinicalSearch {
    model: Arc<dyn ChatModel>,
    store: Arc<dyn ObjectStore>,
    engine: QueryEngine,
    settings: SearchSettings,
}

impl ClinicalSearch {
    pub fn new(
        model: Arc<dyn ChatModel>,
        store: Arc<dyn ObjectStore>,
        engine: QueryEngine,
        settings: SearchSettings,
    ) -> Self {
        Self {
            model,
            store,
            engine,
            settings,
        }
    }

    pub async fn search(&self, query: &str) -> Result<SearchResult, ClinicalError> {
        let intent = classify(query);
        tracing::info!(query, intent = intent.search_type().as_str(), "Clinical search");

        let plan = generate_sql(self.model.as_ref(), query, &intent).await?;

        match &intent {
            SearchIntent::Global => self.search_population(plan).await,
            SearchIntent::Patient(patient) => self.search_patient(patient, plan).await,
        }
    }

    /// Patient id to read, given how the query referred to the patient.
    fn resolve_patient(&self, patient: &PatientRef) -> Result<String, ClinicalError> {
        match patient {
            PatientRef::Id(id) => Ok(id.clone()),
            PatientRef::FileId(file_id) => Ok(file_id.replace('_', "-")),
            PatientRef::Name(name) => self.settings.default_patient_id.clone().ok_or_else(|| {
                ClinicalError::Invalid(format!(
                    "Cannot look up patient named {name}; include the patient id in the query"
                ))
            }),
        }
    }

    async fn search_patient(
        &self,
        patient: &PatientRef,
        plan: SqlPlan,
    ) -> Result<SearchResult, ClinicalError> {
        let patient_id = self.resolve_patient(patient)?;
        tracing::debug!(patient_id = %patient_id, via = patient.kind(), "Resolved patient");

        let url = patient_csv_url(self.store.as_ref(), &patient_id)
            .await
            .map_err(|e| ClinicalError::Storage(format!("Could not access patient data: {e}")))?;

        let sql = query::bind_location(&plan.sql_query, &url)?;
        let raw_data = self.engine.execute(sql).await?;

        Ok(SearchResult {
            search_type: SearchType::PatientSearch,
            patient_id: Some(patient_id),
            sql_query: plan.sql_query,
            explanation: plan.explanation,
            patients_searched: None,
            total_records: raw_data.len(),
            raw_data,
            query_type: plan.query_type,
        })
    }

    /// Signed URLs for the first few patient folders. Folders that cannot be
    /// signed are skipped.
    async fn population_urls(&self) -> Result<Vec<String>, ClinicalError> {
        let folders = self.store.list_patient_folders().await?;

        let mut urls = Vec::new();
        for folder in folders.iter().take(self.settings.max_files) {
            match patient_csv_url(self.store.as_ref(), &folder.patient_id).await {
                Ok(url) => urls.push(url),
                Err(e) => {
                    tracing::warn!(folder = %folder.folder, error = %e, "Skipping patient file")
                }
            }
        }
        Ok(urls)
    }

    async fn search_population(&self, plan: SqlPlan) -> Result<SearchResult, ClinicalError> {
        let urls = self.population_urls().await?;
        let sql = query::union_all(&plan.sql_query, &urls, self.settings.result_limit)?;
        tracing::debug!(files = urls.len(), "Running population query");

        let raw_data = self.engine.execute(sql).await?;

        Ok(SearchResult {
            search_type: SearchType::GlobalSearch,
            patient_id: None,
            sql_query: plan.sql_query,
            explanation: plan.explanation,
            patients_searched: Some(urls.len()),
            total_records: raw_data.len(),
            raw_data,
            query_type: plan.query_type,
        })
    }
}
