use std::sync::LazyLock;

use docpilot_core::SearchType;
use regex::Regex;

/// Phrases that mark a question about the whole population.
const GLOBAL_INDICATORS: [&str; 8] = [
    "list patients",
    "patients who",
    "patients with",
    "patients that",
    "show patients",
    "find patients",
    "all patients",
    "how many patients",
];

static UUID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").unwrap()
});

static FILE_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"patient_([a-f0-9_]+)").unwrap());

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)patient\s+named\s+([A-Za-z]+)").unwrap());

/// How a query names its patient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatientRef {
    /// A UUID, exactly as written in the query
    Id(String),
    /// Storage folder suffix, underscores in place of dashes
    FileId(String),
    /// A first or last name
    Name(String),
}

impl PatientRef {
    pub fn kind(&self) -> &'static str {
        match self {
            PatientRef::Id(_) => "patient_id",
            PatientRef::FileId(_) => "file_id",
            PatientRef::Name(_) => "patient_name",
        }
    }
}

/// Whether a query targets one patient or everybody.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchIntent {
    Global,
    Patient(PatientRef),
}

impl SearchIntent {
    pub fn search_type(&self) -> SearchType {
        match self {
            SearchIntent::Global => SearchType::GlobalSearch,
            SearchIntent::Patient(_) => SearchType::PatientSearch,
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, SearchIntent::Global)
    }
}

/// Classify a free-text query. Population phrasing wins over identifiers;
/// a query with neither is treated as global.
pub fn classify(query: &str) -> SearchIntent {
    let lower = query.to_lowercase();

    if GLOBAL_INDICATORS.iter().any(|p| lower.contains(p)) {
        return SearchIntent::Global;
    }

    match extract_patient_identifier(query) {
        Some(patient) => SearchIntent::Patient(patient),
        None => SearchIntent::Global,
    }
}

/// Find a patient identifier in the query: UUID, then storage file id, then name.
pub fn extract_patient_identifier(query: &str) -> Option<PatientRef> {
    if let Some(m) = UUID_PATTERN.find(query) {
        return Some(PatientRef::Id(m.as_str().to_string()));
    }

    if let Some(caps) = FILE_ID_PATTERN.captures(query) {
        return Some(PatientRef::FileId(caps[1].to_string()));
    }

    NAME_PATTERN
        .captures(query)
        .map(|caps| PatientRef::Name(caps[1].trim().to_string()))
}
