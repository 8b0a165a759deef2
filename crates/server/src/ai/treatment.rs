//! Evidence-based treatment recommendations

use docpilot_core::{ClinicalError, Record};
use serde_json::{Value as JsonValue, json};

use super::client::{ChatModel, Prompt};
use super::json::parse_json_object;

const SYSTEM_PROMPT: &str = r#"You are a medical research assistant with access to current literature.
Search for evidence-based treatment recommendations with proper citations.

Respond in JSON:
{
    "treatment_recommendations": [
        {
            "condition": "Specific condition",
            "recommended_treatments": ["Evidence-based treatments"],
            "rationale": "Medical rationale",
            "evidence_level": "Strong/Moderate/Limited",
            "citations": ["Sources with URLs when available"]
        }
    ],
    "general_recommendations": ["Overall recommendations"],
    "follow_up_actions": ["Next steps"],
    "sources": ["All sources cited"]
}

Guidelines:
1. Only evidence-based treatments
2. Include proper citations
3. Specify evidence levels
4. Focus on current best practices
5. Include URLs when available"#;

const FINDINGS_FROM_RECORDS: usize = 5;
const FINDINGS_PER_KIND: usize = 3;
const DEFAULT_FINDING: &str = "Clinical data analysis";

/// Recommendations plus the search prompt that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct TreatmentReport {
    /// Model JSON, or `{"raw_recommendations": text}` when it was not JSON
    pub recommendations: JsonValue,
    pub search_query: String,
}

fn cell_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) if s.trim().is_empty() => None,
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Bool(false) => None,
        other => Some(other.to_string()),
    }
}

fn push_unique(into: &mut Vec<String>, value: String) {
    if !into.contains(&value) {
        into.push(value);
    }
}

/// Distinct condition and medication values from the first few rows.
pub fn key_findings_from_records(records: &[Record]) -> Vec<String> {
    let mut conditions = Vec::new();
    let mut medications = Vec::new();

    for record in records.iter().take(FINDINGS_FROM_RECORDS) {
        for (column, value) in record {
            let column = column.to_lowercase();
            let Some(text) = cell_text(value) else {
                continue;
            };
            if column.contains("condition") {
                push_unique(&mut conditions, text.clone());
            }
            if column.contains("medication") {
                push_unique(&mut medications, text);
            }
        }
    }

    let findings: Vec<String> = conditions
        .into_iter()
        .take(FINDINGS_PER_KIND)
        .chain(medications.into_iter().take(FINDINGS_PER_KIND))
        .collect();

    if findings.is_empty() {
        vec![DEFAULT_FINDING.to_string()]
    } else {
        findings
    }
}

/// Conditions and medications listed under a summary's `clinical_findings`.
pub fn key_findings_from_summary(summary: &JsonValue) -> Vec<String> {
    let findings = &summary["clinical_findings"];
    ["conditions", "medications"]
        .iter()
        .flat_map(|kind| {
            findings[kind]
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(|v| v.as_str())
                .filter(|s| !s.trim().is_empty())
                .take(FINDINGS_PER_KIND)
                .map(str::to_string)
        })
        .collect()
}

fn search_prompt(key_findings: &[String], summary_text: &str) -> String {
    let findings =
        serde_json::to_string_pretty(key_findings).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"Based on this clinical summary, search for current evidence-based treatment recommendations:

Key Findings: {findings}
Summary: {summary_text}

Search for:
1. Current treatment guidelines
2. Evidence-based therapies
3. Recent research findings
4. Clinical best practices

Focus on peer-reviewed sources and official guidelines."#
    )
}

/// Ask the model for treatment options for the given findings.
pub async fn recommend(
    model: &dyn ChatModel,
    key_findings: &[String],
    summary_text: &str,
) -> Result<TreatmentReport, ClinicalError> {
    let search_query = search_prompt(key_findings, summary_text);
    let prompt = Prompt::new(SYSTEM_PROMPT, search_query.clone()).max_tokens(2000);

    let completion = model
        .complete(&prompt)
        .await
        .map_err(|e| ClinicalError::Llm(format!("Treatment search failed: {e}")))?;

    let recommendations = match parse_json_object::<JsonValue>(&completion.content) {
        Some(value) if value.is_object() => value,
        _ => {
            tracing::debug!("Treatment reply was not JSON, returning raw text");
            json!({"raw_recommendations": completion.content})
        }
    };

    tracing::info!(findings = key_findings.len(), "Treatment recommendations received");
    Ok(TreatmentReport {
        recommendations,
        search_query,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::ScriptedModel;

    fn record(value: JsonValue) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn findings_from_records_are_distinct_and_capped() {
        let records: Vec<Record> = [
            json!({"conditions_DESCRIPTION": "Asthma", "medications_DESCRIPTION": "Albuterol"}),
            json!({"conditions_DESCRIPTION": "Asthma", "medications_DESCRIPTION": "Fluticasone"}),
            json!({"conditions_DESCRIPTION": "Hypertension", "medications_DESCRIPTION": null}),
            json!({"conditions_DESCRIPTION": "Obesity", "medications_DESCRIPTION": ""}),
            json!({"conditions_DESCRIPTION": "Prediabetes", "medications_DESCRIPTION": "Metformin"}),
            json!({"conditions_DESCRIPTION": "Ignored sixth row"}),
        ]
        .into_iter()
        .map(record)
        .collect();

        assert_eq!(
            key_findings_from_records(&records),
            vec!["Asthma", "Hypertension", "Obesity", "Albuterol", "Fluticasone", "Metformin"]
        );
    }

    #[test]
    fn findings_default_when_nothing_relevant() {
        let records = vec![record(json!({"observations_VALUE": 7.1}))];
        assert_eq!(key_findings_from_records(&records), vec![DEFAULT_FINDING]);
        assert_eq!(key_findings_from_records(&[]), vec![DEFAULT_FINDING]);
    }

    #[test]
    fn findings_from_summary() {
        let summary = json!({"clinical_findings": {
            "conditions": ["Asthma", "COPD", "Obesity", "Gout"],
            "medications": ["Albuterol"]
        }});
        assert_eq!(
            key_findings_from_summary(&summary),
            vec!["Asthma", "COPD", "Obesity", "Albuterol"]
        );
        assert!(key_findings_from_summary(&json!({"overview": "x"})).is_empty());
    }

    #[tokio::test]
    async fn json_reply_is_returned() {
        let model = ScriptedModel::new([r#"{"treatment_recommendations": [], "sources": ["https://www.aafp.org/"]}"#]);
        let report = recommend(&model, &["Asthma".to_string()], "Asthma cohort").await.unwrap();

        assert_eq!(report.recommendations["sources"][0], "https://www.aafp.org/");
        assert!(report.search_query.contains("\"Asthma\""));
        assert!(report.search_query.contains("Summary: Asthma cohort"));
    }

    #[tokio::test]
    async fn prose_reply_is_wrapped() {
        let model = ScriptedModel::new(["Use inhaled corticosteroids."]);
        let report = recommend(&model, &[], "s").await.unwrap();
        assert_eq!(
            report.recommendations,
            json!({"raw_recommendations": "Use inhaled corticosteroids."})
        );
    }

    #[tokio::test]
    async fn transport_failure_is_wrapped() {
        let model = ScriptedModel::failing("Perplexity API error: 500 - boom");
        let err = recommend(&model, &[], "s").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Treatment search failed: Perplexity API error: 500 - boom"
        );
    }
}
