use serde::{Deserialize, Serialize};

/// Canned references used when a clinical reply cites nothing.
pub const DEFAULT_REFERENCES: [&str; 3] = [
    "https://www.aafp.org/afp/",
    "https://www.acep.org/clinical/",
    "https://www.mayoclinic.org/diseases-conditions/",
];

/// Sections sliced out of a free-text clinical analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClinicalAnalysis {
    pub problem: String,
    pub relevant_factors: Vec<String>,
    #[serde(default)]
    pub excluded_factors: Vec<String>,
    pub priority_order: Vec<String>,
    pub action_plan: Vec<String>,
    pub follow_up_recommendations: Vec<String>,
    pub filtering_rationale: String,
    pub clinical_references: Vec<String>,
    pub raw_ai_response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClinicalAnalysis {
    /// Placeholder analysis for a reply that could not be sliced.
    pub fn fallback(raw: &str, reason: &str) -> Self {
        Self {
            problem: "Clinical analysis completed (parsing error)".to_string(),
            relevant_factors: vec!["Manual review recommended".to_string()],
            excluded_factors: Vec::new(),
            priority_order: vec!["Clinical assessment".to_string()],
            action_plan: vec!["Comprehensive evaluation".to_string()],
            follow_up_recommendations: vec!["Follow-up as clinically indicated".to_string()],
            filtering_rationale: format!("Response parsing error: {reason}"),
            clinical_references: vec!["https://www.mayoclinic.org/".to_string()],
            raw_ai_response: raw.to_string(),
            error: Some(format!("Parsing failed: {reason}")),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

/// Analysis reshaped into the treatment-recommendation block the UI renders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TreatmentPlan {
    pub problem_statement: String,
    pub key_factors: Vec<String>,
    pub priority_order: Vec<String>,
    pub action_plan: Vec<String>,
    pub clinical_reasoning: String,
    pub evidence_sources: Vec<String>,
}

impl From<&ClinicalAnalysis> for TreatmentPlan {
    fn from(analysis: &ClinicalAnalysis) -> Self {
        let clinical_reasoning = if analysis.filtering_rationale.is_empty() {
            "AI-powered intelligent filtering applied".to_string()
        } else {
            analysis.filtering_rationale.clone()
        };
        Self {
            problem_statement: analysis.problem.clone(),
            key_factors: analysis.relevant_factors.clone(),
            priority_order: analysis.priority_order.clone(),
            action_plan: analysis.action_plan.clone(),
            clinical_reasoning,
            evidence_sources: analysis.clinical_references.clone(),
        }
    }
}
