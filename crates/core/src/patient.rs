use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Demographics block of a submitted patient.
///
/// Only `name`, `age` and `gender` are interpreted; anything else the
/// client sends is kept verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PersonalDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl PersonalDetails {
    pub fn name_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or(default)
    }

    pub fn gender_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.gender.as_deref().filter(|g| !g.is_empty()).unwrap_or(default)
    }

    /// Age rendered as text; clients send both `45` and `"45"`.
    pub fn age_or(&self, default: &str) -> String {
        match &self.age {
            Some(JsonValue::String(s)) if !s.is_empty() => s.clone(),
            Some(JsonValue::Number(n)) => n.to_string(),
            _ => default.to_string(),
        }
    }
}

/// Patient case submitted for AI analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientData {
    pub personal_details: PersonalDetails,
    pub medical_history: Vec<String>,
    pub current_complaint: String,
    pub current_medications: Vec<String>,
    pub vital_signs: Map<String, JsonValue>,
}

impl PatientData {
    /// Complaint text, or `default` when the client left it blank.
    pub fn complaint_or<'a>(&'a self, default: &'a str) -> &'a str {
        let trimmed = self.current_complaint.trim();
        if trimmed.is_empty() { default } else { trimmed }
    }
}

/// Flattened single-row view of a patient, shaped like a search result row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientRow {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub complaint: String,
    pub medical_history: String,
    pub current_medications: String,
    pub vital_signs: String,
}

impl From<&PatientData> for PatientRow {
    fn from(patient: &PatientData) -> Self {
        let personal = &patient.personal_details;
        Self {
            name: personal.name_or("Unknown").to_string(),
            age: personal.age_or("Unknown"),
            gender: personal.gender_or("Unknown").to_string(),
            complaint: patient.complaint_or("Not specified").to_string(),
            medical_history: patient.medical_history.join(", "),
            current_medications: patient.current_medications.join(", "),
            vital_signs: JsonValue::Object(patient.vital_signs.clone()).to_string(),
        }
    }
}
