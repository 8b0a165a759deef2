//! Structured summaries of retrieved clinical tables

use std::collections::BTreeSet;

use docpilot_core::ClinicalError;
use serde_json::{Value as JsonValue, json};

use super::client::{ChatModel, Prompt};
use super::json::parse_json_object;

/// Records shown to the model
const PREVIEW_RECORDS: usize = 20;

const SYSTEM_PROMPT: &str = r#"You are a senior clinical data scientist with expertise in electronic health records analysis.

TASK: Provide a COMPREHENSIVE and DETAILED analysis of the clinical dataset provided.

Your analysis must cover:
1. **Overview**: Complete description of the dataset scope and clinical context
2. **Patient Demographics**: Age patterns, gender distribution, geographic insights (if available)
3. **Clinical Findings**: Key medical conditions, medications, procedures identified
4. **Temporal Patterns**: Date ranges, treatment durations, frequency patterns
5. **Cost Analysis**: Healthcare expenses, medication costs, procedure costs (if available)
6. **Risk Factors**: Notable clinical risk indicators or concerning patterns
7. **Quality Indicators**: Data completeness, potential gaps or anomalies
8. **Clinical Implications**: Medical significance of the findings
9. **Recommendations**: Actionable insights for clinical care or data management

CRITICAL REQUIREMENTS:
- Analyze ALL data fields present in the sample
- Provide specific numbers and statistics where possible
- Use proper clinical terminology
- Identify patterns across multiple records
- Maintain patient privacy (no individual patient names in summary)

RESPONSE FORMAT - Must be valid JSON:
{
    "overview": "Comprehensive description of the clinical dataset and its scope",
    "patient_demographics": {
        "total_patients": "Number of unique patients",
        "key_demographics": ["Demographic insights from the data"]
    },
    "clinical_findings": {
        "conditions": ["Medical conditions identified"],
        "medications": ["Medications and drug patterns"],
        "procedures": ["Procedures and treatments"]
    },
    "temporal_analysis": {
        "date_range": "Time span of the data",
        "patterns": ["Notable temporal patterns"]
    },
    "cost_analysis": {
        "total_costs": "Cost summary if available",
        "cost_patterns": ["Cost-related insights"]
    },
    "quality_indicators": {
        "completeness": "Data completeness assessment",
        "anomalies": ["Notable data quality issues"]
    },
    "clinical_implications": ["Medical significance and clinical relevance"],
    "recommendations": {
        "clinical_care": ["Recommendations for patient care"],
        "data_management": ["Suggestions for data handling"],
        "follow_up": ["Recommended next steps"]
    },
    "statistical_summary": {
        "record_count": "Total records analyzed",
        "key_metrics": ["Important statistical findings"]
    }
}"#;

/// Summary of a table, either written by the model or computed locally.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryReport {
    pub summary: JsonValue,
    /// The model's reply was unusable and `summary` was built from the records
    pub fallback: bool,
}

impl SummaryReport {
    pub fn overview(&self) -> Option<&str> {
        self.summary.get("overview").and_then(JsonValue::as_str)
    }
}

/// The parts of a table payload the summary prompt uses.
struct TableView<'a> {
    preview: Vec<&'a JsonValue>,
    total_records: u64,
    search_type: &'a str,
    patients_searched: String,
}

impl<'a> TableView<'a> {
    fn new(table: &'a JsonValue) -> Result<Self, ClinicalError> {
        let Some(obj) = table.as_object() else {
            return Err(ClinicalError::Invalid(
                "table_data must be a JSON object".to_string(),
            ));
        };
        if let Some(error) = obj.get("error") {
            let message = error.as_str().map_or_else(|| error.to_string(), str::to_string);
            return Err(ClinicalError::Invalid(message));
        }

        let preview = obj
            .get("raw_data")
            .and_then(JsonValue::as_array)
            .map(|rows| rows.iter().take(PREVIEW_RECORDS).collect())
            .unwrap_or_default();
        let patients_searched = match obj.get("patients_searched") {
            Some(JsonValue::Null) | None => "single patient".to_string(),
            Some(JsonValue::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };

        Ok(Self {
            preview,
            total_records: obj
                .get("total_records")
                .and_then(JsonValue::as_u64)
                .unwrap_or(0),
            search_type: obj
                .get("search_type")
                .and_then(JsonValue::as_str)
                .unwrap_or("unknown"),
            patients_searched,
        })
    }

    fn user_message(&self, query: &str) -> String {
        let sample =
            serde_json::to_string_pretty(&self.preview).unwrap_or_else(|_| "[]".to_string());
        format!(
            r#"Please provide a COMPREHENSIVE clinical data analysis for the following dataset:

CLINICAL DATA ANALYSIS REQUEST:

Search Details:
- Search Type: {search_type}
- Original Query: {query}
- Total Records Found: {total}
- Data Source: {patients} patient(s)

Complete Data Sample (first {shown} of {total} records):
{sample}

ANALYSIS SCOPE: {total} total clinical records

Focus on extracting maximum clinical insights from this data. Analyze patterns, identify clinical significance, and provide detailed observations about the patient population and their healthcare interactions."#,
            search_type = self.search_type,
            total = self.total_records,
            patients = self.patients_searched,
            shown = self.preview.len(),
        )
    }
}

fn usable(summary: &JsonValue) -> bool {
    summary
        .get("overview")
        .and_then(JsonValue::as_str)
        .is_some_and(|o| !o.trim().is_empty() && o != "No overview")
}

fn non_empty(value: &JsonValue) -> bool {
    !matches!(value, JsonValue::Null) && value.as_str() != Some("")
}

fn fields_matching<'a>(fields: &BTreeSet<&'a str>, needles: &[&str]) -> Vec<&'a str> {
    fields
        .iter()
        .copied()
        .filter(|f| {
            let lower = f.to_lowercase();
            needles.iter().any(|n| lower.contains(n))
        })
        .collect()
}

fn availability(fields: &[&str], what: &str) -> String {
    if fields.is_empty() {
        format!("No {} data", what.to_lowercase())
    } else {
        format!("{what} data available in {} fields", fields.len())
    }
}

/// Structural summary computed from the records themselves.
pub fn fallback_summary(preview: &[&JsonValue], total_records: u64, query: &str) -> JsonValue {
    if preview.is_empty() {
        return json!({"overview": "No data available for analysis"});
    }

    let mut all_fields = BTreeSet::new();
    let mut filled_fields = BTreeSet::new();
    for record in preview.iter().filter_map(|r| r.as_object()) {
        for (key, value) in record {
            all_fields.insert(key.as_str());
            if non_empty(value) {
                filled_fields.insert(key.as_str());
            }
        }
    }

    let medication = fields_matching(&all_fields, &["medication"]);
    let condition = fields_matching(&all_fields, &["condition"]);
    let procedure = fields_matching(&all_fields, &["procedure"]);
    let patient = fields_matching(&all_fields, &["patient"]);
    let cost = fields_matching(&all_fields, &["cost", "expense"]);

    json!({
        "overview": format!(
            "Clinical dataset containing {total_records} records with {} data fields per record. Query: {query}",
            all_fields.len()
        ),
        "patient_demographics": {
            "total_patients": if total_records > 5 { "Multiple patients" } else { "Single patient" },
            "key_demographics": [if patient.is_empty() {
                "Limited demographic data".to_string()
            } else {
                format!("Patient data fields: {}", patient.join(", "))
            }],
        },
        "clinical_findings": {
            "conditions": [availability(&condition, "Condition")],
            "medications": [availability(&medication, "Medication")],
            "procedures": [availability(&procedure, "Procedure")],
        },
        "temporal_analysis": {
            "date_range": "Date fields present in dataset",
            "patterns": ["Temporal analysis requires more detailed processing"],
        },
        "cost_analysis": {
            "total_costs": if cost.is_empty() {
                "No cost data".to_string()
            } else {
                format!("Cost data available in {} fields", cost.len())
            },
            "cost_patterns": ["Cost analysis available with proper cost fields"],
        },
        "quality_indicators": {
            "completeness": format!(
                "Data completeness: {}/{} fields have non-null values",
                filled_fields.len(),
                all_fields.len()
            ),
            "anomalies": ["Standard data quality assessment completed"],
        },
        "clinical_implications": [format!(
            "Dataset suitable for {} analysis with {total_records} records",
            query.to_lowercase()
        )],
        "recommendations": {
            "clinical_care": ["Review individual patient records for specific care recommendations"],
            "data_management": ["Ensure data quality and completeness for optimal analysis"],
            "follow_up": ["Consider more specific queries for detailed clinical insights"],
        },
        "statistical_summary": {
            "record_count": total_records.to_string(),
            "key_metrics": [
                format!("Total fields per record: {}", all_fields.len()),
                format!("Active data fields: {}", filled_fields.len()),
            ],
        },
    })
}

/// Summarize a retrieval result (`raw_data`, `total_records`, `search_type`,
/// `patients_searched`) in the context of the question that produced it.
pub async fn summarize(
    model: &dyn ChatModel,
    table_data: &JsonValue,
    query: &str,
) -> Result<SummaryReport, ClinicalError> {
    let view = TableView::new(table_data)?;
    let prompt = Prompt::new(SYSTEM_PROMPT, view.user_message(query)).max_tokens(2000);

    let completion = model.complete(&prompt).await.map_err(|e| {
        ClinicalError::Llm(format!("Comprehensive summary generation failed: {e}"))
    })?;

    match parse_json_object::<JsonValue>(&completion.content).filter(usable) {
        Some(summary) => Ok(SummaryReport {
            summary,
            fallback: false,
        }),
        None => {
            tracing::warn!(
                records = view.preview.len(),
                "Summary reply unusable, building structural summary"
            );
            Ok(SummaryReport {
                summary: fallback_summary(&view.preview, view.total_records, query),
                fallback: true,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::ScriptedModel;

    fn table() -> JsonValue {
        json!({
            "search_type": "global_search",
            "total_records": 8,
            "patients_searched": 3,
            "raw_data": [
                {"PATIENTID": "p1", "conditions_DESCRIPTION": "Asthma", "medications_TOTALCOST": 12.5},
                {"PATIENTID": "p2", "conditions_DESCRIPTION": "", "medications_TOTALCOST": null}
            ]
        })
    }

    #[tokio::test]
    async fn model_summary_is_kept() {
        let model = ScriptedModel::new([r#"{"overview": "Two asthma patients", "clinical_findings": {"conditions": ["Asthma"]}}"#]);
        let report = summarize(&model, &table(), "patients with asthma").await.unwrap();

        assert!(!report.fallback);
        assert_eq!(report.overview(), Some("Two asthma patients"));

        let prompt = model.last_prompt().unwrap();
        assert!(prompt.user.contains("- Search Type: global_search"));
        assert!(prompt.user.contains("- Data Source: 3 patient(s)"));
        assert!(prompt.user.contains("first 2 of 8 records"));
    }

    #[tokio::test]
    async fn malformed_reply_uses_structural_fallback() {
        let model = ScriptedModel::new(["The dataset shows asthma."]);
        let report = summarize(&model, &table(), "Patients with asthma").await.unwrap();

        assert!(report.fallback);
        let summary = &report.summary;
        assert_eq!(
            summary["overview"],
            "Clinical dataset containing 8 records with 3 data fields per record. Query: Patients with asthma"
        );
        assert_eq!(summary["patient_demographics"]["total_patients"], "Multiple patients");
        assert_eq!(
            summary["quality_indicators"]["completeness"],
            "Data completeness: 3/3 fields have non-null values"
        );
        assert_eq!(
            summary["clinical_findings"]["procedures"][0],
            "No procedure data"
        );
        assert_eq!(
            summary["cost_analysis"]["total_costs"],
            "Cost data available in 1 fields"
        );
    }

    #[tokio::test]
    async fn placeholder_overview_is_rejected() {
        let model = ScriptedModel::new([r#"{"overview": "No overview"}"#]);
        let report = summarize(&model, &table(), "q").await.unwrap();
        assert!(report.fallback);
    }

    #[tokio::test]
    async fn error_payload_is_invalid() {
        let model = ScriptedModel::new([]);
        let err = summarize(&model, &json!({"error": "No patient data available"}), "q")
            .await
            .unwrap_err();
        assert_eq!(err, ClinicalError::Invalid("No patient data available".into()));
        assert!(model.prompts().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_is_wrapped() {
        let model = ScriptedModel::failing("Perplexity API timeout - please try again");
        let err = summarize(&model, &table(), "q").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Comprehensive summary generation failed: Perplexity API timeout - please try again"
        );
    }

    #[test]
    fn empty_table_has_minimal_fallback() {
        assert_eq!(
            fallback_summary(&[], 0, "q"),
            json!({"overview": "No data available for analysis"})
        );
    }
}
