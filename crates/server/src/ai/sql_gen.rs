//! Natural language to DuckDB SQL over the merged patient CSV

use docpilot_core::{ClinicalError, SqlPlan};
use serde_json::Value as JsonValue;

use super::client::{ChatModel, Prompt};
use super::json::parse_json_object;
use crate::search::intent::SearchIntent;

const CSV_SCHEMA: &str = r#"CLINICAL DATA CSV SCHEMA:

PATIENT IDENTIFICATION:
- PATIENTID: Primary patient UUID (use this for patient searches!)
- Id: Alternative identifier
- PATIENT: Another reference field

PATIENT DEMOGRAPHICS:
- patients_FIRST, patients_LAST: First and last names
- patients_BIRTHDATE, patients_GENDER, patients_RACE, patients_ETHNICITY
- patients_ADDRESS, patients_CITY, patients_STATE, patients_ZIP
- patients_HEALTHCARE_EXPENSES, patients_HEALTHCARE_COVERAGE

MEDICATIONS:
- medications_START, medications_STOP, medications_CODE, medications_DESCRIPTION
- medications_BASE_COST, medications_TOTALCOST, medications_REASONDESCRIPTION

CONDITIONS:
- conditions_START, conditions_STOP, conditions_CODE, conditions_DESCRIPTION

PROCEDURES:
- procedures_START, procedures_STOP, procedures_CODE, procedures_DESCRIPTION
- procedures_BASE_COST, procedures_REASONDESCRIPTION

OBSERVATIONS:
- observations_DATE, observations_DESCRIPTION, observations_VALUE, observations_UNITS"#;

const RULES: &str = r#"CRITICAL RULES:
1. Use EXACTLY '{}' for CSV file path
2. NO table aliases - direct column access
3. Patient searches: WHERE PATIENTID = 'uuid'
4. Patient name: patients_FIRST || ' ' || patients_LAST AS patient_name
5. Global queries: NO LIMIT (added automatically)
6. Individual queries: Include LIMIT 100
7. Filter NULL values

RESPONSE - Valid JSON only:
{
    "sql_query": "SELECT ... FROM '{}' WHERE ...",
    "query_explanation": "What this query does",
    "expected_columns": ["col1", "col2"],
    "query_type": "medications|conditions|procedures|demographics"
}"#;

fn system_prompt(intent: &SearchIntent) -> String {
    let context = if intent.is_global() {
        "This is a GLOBAL search across ALL patients."
    } else {
        "This is a PATIENT-SPECIFIC search."
    };
    format!("You are a SQL expert for clinical data using DuckDB.\n\n{context}\n{CSV_SCHEMA}\n\n{RULES}")
}

/// Parse the model's reply into a plan. Fenced JSON is accepted.
pub fn parse_sql_response(content: &str) -> Result<SqlPlan, ClinicalError> {
    let value: JsonValue = parse_json_object(content)
        .ok_or_else(|| ClinicalError::Parse(format!("Could not parse SQL response: {content}")))?;

    let has_sql = value
        .get("sql_query")
        .and_then(JsonValue::as_str)
        .is_some_and(|sql| !sql.trim().is_empty());
    if !has_sql {
        return Err(ClinicalError::Parse("No SQL query generated".to_string()));
    }

    serde_json::from_value(value)
        .map_err(|e| ClinicalError::Parse(format!("Could not parse SQL response: {e}")))
}

/// Ask the model for a SQL template answering `query`.
pub async fn generate_sql(
    model: &dyn ChatModel,
    query: &str,
    intent: &SearchIntent,
) -> Result<SqlPlan, ClinicalError> {
    let user = format!(
        "Query: {query}\nIntent: {}\nGenerate DuckDB SQL.",
        intent.search_type().as_str()
    );
    let prompt = Prompt::new(system_prompt(intent), user).max_tokens(600);

    let completion = model.complete(&prompt).await?;
    let plan = parse_sql_response(&completion.content)?;

    tracing::info!(sql = %plan.sql_query, query_type = %plan.query_type, "Generated SQL");
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::ScriptedModel;
    use crate::search::intent::PatientRef;

    #[test]
    fn parses_plain_json() {
        let plan = parse_sql_response(
            r#"{"sql_query": "SELECT * FROM '{}'", "query_explanation": "all rows", "expected_columns": ["Id"], "query_type": "demographics"}"#,
        )
        .unwrap();
        assert_eq!(plan.sql_query, "SELECT * FROM '{}'");
        assert_eq!(plan.explanation, "all rows");
        assert_eq!(plan.query_type, "demographics");
    }

    #[test]
    fn parses_fenced_json_with_defaults() {
        let plan = parse_sql_response("```json\n{\"sql_query\": \"SELECT 1 FROM '{}'\"}\n```").unwrap();
        assert_eq!(plan.query_type, "unknown");
        assert!(plan.expected_columns.is_empty());
    }

    #[test]
    fn prose_is_a_parse_error() {
        let err = parse_sql_response("Here is the query you asked for.").unwrap_err();
        assert!(err.to_string().starts_with("Could not parse SQL response: "));
    }

    #[test]
    fn missing_sql_is_reported() {
        let err = parse_sql_response(r#"{"sql_query": "  ", "query_type": "conditions"}"#).unwrap_err();
        assert_eq!(err, ClinicalError::Parse("No SQL query generated".to_string()));
    }

    #[tokio::test]
    async fn prompt_reflects_intent() {
        let reply = r#"{"sql_query": "SELECT medications_DESCRIPTION FROM '{}'"}"#;
        let model = ScriptedModel::new([reply, reply]);

        generate_sql(&model, "list patients with asthma", &SearchIntent::Global)
            .await
            .unwrap();
        let patient = SearchIntent::Patient(PatientRef::Id("abc".into()));
        generate_sql(&model, "medications for abc", &patient).await.unwrap();

        let prompts = model.prompts();
        assert!(prompts[0].system.contains("GLOBAL search across ALL patients"));
        assert!(prompts[0].user.contains("Intent: global_search"));
        assert!(prompts[1].system.contains("PATIENT-SPECIFIC"));
        assert_eq!(prompts[1].max_tokens, 600);
        assert!((prompts[1].temperature - 0.1).abs() < f32::EPSILON);
    }
}
