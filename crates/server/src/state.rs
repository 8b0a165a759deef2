//! Shared application state

use std::path::PathBuf;
use std::sync::Arc;

use docpilot_core::ClinicalError;

use crate::ai::{ChatModel, PerplexityClient};
use crate::config::Config;
use crate::search::engine::QueryEngine;
use crate::search::{ClinicalSearch, SearchSettings};
use crate::services::{ClinicalAssistant, PatientRegistry, SessionRegistry};
use crate::storage::{LocalStore, ObjectStore, SupabaseStore};

/// Everything a handler can reach. Collaborators that are not configured
/// are `None` and the endpoints needing them answer 503.
#[derive(Clone)]
pub struct AppState {
    pub model: Option<Arc<dyn ChatModel>>,
    pub store: Option<Arc<dyn ObjectStore>>,
    pub engine: QueryEngine,
    pub settings: SearchSettings,
    pub patients: PatientRegistry,
    pub sessions: SessionRegistry,
    pub static_dir: PathBuf,
    pub index_file: PathBuf,
}

impl AppState {
    pub fn new(engine: QueryEngine) -> Self {
        Self {
            model: None,
            store: None,
            engine,
            settings: SearchSettings::default(),
            patients: PatientRegistry::new(),
            sessions: SessionRegistry::new(),
            static_dir: PathBuf::from("static"),
            index_file: PathBuf::from("index.html"),
        }
    }

    pub fn with_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_settings(mut self, settings: SearchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_ui(mut self, static_dir: impl Into<PathBuf>, index_file: impl Into<PathBuf>) -> Self {
        self.static_dir = static_dir.into();
        self.index_file = index_file.into();
        self
    }

    /// Wire up the collaborators named in the configuration. A local data
    /// directory takes precedence over Supabase.
    pub fn from_config(config: &Config) -> Result<Self, ClinicalError> {
        let mut state = Self::new(QueryEngine::in_memory()?)
            .with_settings(SearchSettings {
                max_files: config.global_search_max_files,
                result_limit: config.result_limit,
                default_patient_id: config.default_patient_id.clone(),
            })
            .with_ui(&config.static_dir, &config.index_file);

        if let Some(key) = &config.perplexity_api_key {
            let client = PerplexityClient::new(key.clone())
                .with_base_url(config.perplexity_base_url.as_str())
                .with_model(config.perplexity_model.as_str())
                .with_timeout(config.llm_timeout);
            state = state.with_model(Arc::new(client));
        }

        if let Some(dir) = &config.local_data_dir {
            state = state.with_store(Arc::new(LocalStore::new(dir)));
        } else if let (Some(url), Some(key)) = (&config.supabase_url, &config.supabase_key) {
            let store = SupabaseStore::new(
                url,
                key.clone(),
                config.storage_bucket.clone(),
                config.signed_url_ttl,
            )
            .with_timeout(config.storage_timeout);
            state = state.with_store(Arc::new(store));
        }

        Ok(state)
    }

    pub fn model(&self) -> Result<&Arc<dyn ChatModel>, ClinicalError> {
        self.model.as_ref().ok_or_else(|| {
            ClinicalError::Unavailable(
                "AI service unavailable (PERPLEXITY_API_KEY not set)".to_string(),
            )
        })
    }

    pub fn store(&self) -> Result<&Arc<dyn ObjectStore>, ClinicalError> {
        self.store.as_ref().ok_or_else(|| {
            ClinicalError::Unavailable(
                "Patient storage unavailable (set SUPABASE_BASE_URL and SUPABASE_KEY, or LOCAL_DATA_DIR)"
                    .to_string(),
            )
        })
    }

    pub fn assistant(&self) -> Result<ClinicalAssistant, ClinicalError> {
        let model = Arc::clone(self.model()?);
        let search = ClinicalSearch::new(
            Arc::clone(&model),
            Arc::clone(self.store()?),
            self.engine.clone(),
            self.settings.clone(),
        );
        Ok(ClinicalAssistant::new(model, search))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_collaborators_are_unavailable() {
        let state = AppState::from_config(&Config::default()).unwrap();
        assert!(matches!(state.model(), Err(ClinicalError::Unavailable(_))));
        assert!(matches!(state.store(), Err(ClinicalError::Unavailable(_))));
        assert!(state.assistant().is_err());
    }

    #[test]
    fn local_dir_wins_over_supabase() {
        let config = Config {
            perplexity_api_key: Some("k".into()),
            local_data_dir: Some(PathBuf::from("/data")),
            supabase_url: Some("https://x.supabase.co".into()),
            supabase_key: Some("s".into()),
            ..Config::default()
        };
        let state = AppState::from_config(&config).unwrap();
        assert_eq!(state.store().unwrap().backend(), "local");
        assert!(state.assistant().is_ok());
    }
}
