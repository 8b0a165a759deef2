//! Server configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::ai::client::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT};
use crate::search::{GLOBAL_SEARCH_MAX_FILES, RESULT_LIMIT};
use crate::storage::DEFAULT_STORAGE_TIMEOUT;

pub const DEFAULT_BUCKET: &str = "clinical-data";

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    /// Required `X-API-Key` for `/api/*`; auth is off when unset
    pub api_key: Option<String>,
    pub cors_origins: Vec<String>,
    pub rate_limit_rps: u32,

    pub perplexity_api_key: Option<String>,
    pub perplexity_base_url: String,
    pub perplexity_model: String,
    pub llm_timeout: Duration,

    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub storage_bucket: String,
    /// Bucket mirror on disk, used instead of Supabase when set
    pub local_data_dir: Option<PathBuf>,
    pub signed_url_ttl: Duration,
    pub storage_timeout: Duration,

    pub global_search_max_files: usize,
    pub result_limit: usize,
    pub default_patient_id: Option<String>,

    pub static_dir: PathBuf,
    pub index_file: PathBuf,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    match var(name) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(name, value = %raw, "Ignoring unparsable setting");
            default
        }),
        None => default,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".into(),
            api_key: None,
            cors_origins: vec!["*".into()],
            rate_limit_rps: 50,
            perplexity_api_key: None,
            perplexity_base_url: DEFAULT_BASE_URL.into(),
            perplexity_model: DEFAULT_MODEL.into(),
            llm_timeout: DEFAULT_TIMEOUT,
            supabase_url: None,
            supabase_key: None,
            storage_bucket: DEFAULT_BUCKET.into(),
            local_data_dir: None,
            signed_url_ttl: Duration::from_secs(3600),
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
            global_search_max_files: GLOBAL_SEARCH_MAX_FILES,
            result_limit: RESULT_LIMIT,
            default_patient_id: None,
            static_dir: PathBuf::from("static"),
            index_file: PathBuf::from("index.html"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            api_key: var("API_KEY"),
            cors_origins: var("CORS_ORIGINS")
                .map(|v| v.split(',').map(|o| o.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: parsed("RATE_LIMIT_RPS", defaults.rate_limit_rps),
            perplexity_api_key: var("PERPLEXITY_API_KEY"),
            perplexity_base_url: var("PERPLEXITY_BASE_URL").unwrap_or(defaults.perplexity_base_url),
            perplexity_model: var("PERPLEXITY_MODEL").unwrap_or(defaults.perplexity_model),
            llm_timeout: Duration::from_secs(parsed("LLM_TIMEOUT_SECS", defaults.llm_timeout.as_secs())),
            supabase_url: var("SUPABASE_BASE_URL"),
            supabase_key: var("SUPABASE_KEY"),
            storage_bucket: var("STORAGE_BUCKET").unwrap_or(defaults.storage_bucket),
            local_data_dir: var("LOCAL_DATA_DIR").map(PathBuf::from),
            signed_url_ttl: Duration::from_secs(parsed(
                "SIGNED_URL_TTL_SECS",
                defaults.signed_url_ttl.as_secs(),
            )),
            storage_timeout: Duration::from_secs(parsed(
                "STORAGE_TIMEOUT_SECS",
                defaults.storage_timeout.as_secs(),
            )),
            global_search_max_files: parsed(
                "GLOBAL_SEARCH_MAX_FILES",
                defaults.global_search_max_files,
            ),
            result_limit: parsed("RESULT_LIMIT", defaults.result_limit),
            default_patient_id: var("DEFAULT_PATIENT_ID"),
            static_dir: var("STATIC_DIR").map_or(defaults.static_dir, PathBuf::from),
            index_file: var("INDEX_FILE").map_or(defaults.index_file, PathBuf::from),
        }
    }
}
