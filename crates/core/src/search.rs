use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// One result row, keyed by column name.
pub type Record = Map<String, JsonValue>;

/// Which retrieval path produced a [`SearchResult`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    GlobalSearch,
    PatientSearch,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::GlobalSearch => "global_search",
            SearchType::PatientSearch => "patient_search",
        }
    }
}

/// SQL the model produced for a question.
///
/// `sql_query` is a template: every `{}` stands for the CSV location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SqlPlan {
    pub sql_query: String,
    #[serde(default, alias = "query_explanation")]
    pub explanation: String,
    #[serde(default)]
    pub expected_columns: Vec<String>,
    #[serde(default = "unknown_query_type")]
    pub query_type: String,
}

fn unknown_query_type() -> String {
    "unknown".to_string()
}

/// Tabular data retrieved for a clinical question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub search_type: SearchType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    pub sql_query: String,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patients_searched: Option<usize>,
    pub raw_data: Vec<Record>,
    pub total_records: usize,
    pub query_type: String,
}

/// A patient folder in the object store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientFolder {
    /// Folder name, e.g. `patient_006c29d1_d868_...`
    pub folder: String,
    /// Patient id recovered from the folder name (underscores back to dashes)
    pub patient_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sql_plan_accepts_model_field_names() {
        let plan: SqlPlan = serde_json::from_value(json!({
            "sql_query": "SELECT * FROM '{}'",
            "query_explanation": "everything"
        }))
        .unwrap();
        assert_eq!(plan.explanation, "everything");
        assert_eq!(plan.query_type, "unknown");
        assert!(plan.expected_columns.is_empty());
    }

    #[test]
    fn search_result_omits_absent_fields() {
        let result = SearchResult {
            search_type: SearchType::GlobalSearch,
            patient_id: None,
            sql_query: "SELECT 1".into(),
            explanation: String::new(),
            patients_searched: Some(3),
            raw_data: vec![],
            total_records: 0,
            query_type: "conditions".into(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["search_type"], "global_search");
        assert!(json.get("patient_id").is_none());
        assert_eq!(json["patients_searched"], 3);
    }
}
