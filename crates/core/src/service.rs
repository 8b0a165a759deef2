use serde::{Deserialize, Serialize};

/// Public endpoints advertised by the root route.
pub const ENDPOINTS: [(&str, &str); 8] = [
    ("/api/text-query", "Clinical queries with AI"),
    ("/api/summarize", "AI data summarization"),
    ("/api/add-patient", "Add patient with AI analysis"),
    ("/api/patients/{id}", "Stored patient analysis"),
    ("/api/list-patients", "Patient folders in object storage"),
    ("/api/new-session", "Create new session"),
    ("/api/health", "Health check"),
    ("/metrics", "Prometheus metrics"),
];

/// Description served at `/` when no UI bundle is installed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
    pub status: String,
    pub ui_file: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub path: String,
    pub description: String,
}

impl ServiceInfo {
    pub fn new(index_file: &str) -> Self {
        Self {
            message: "DocPilot Clinical AI Assistant API".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            status: "Running".to_string(),
            ui_file: format!("{index_file} not found - place it next to the server binary"),
            endpoints: ENDPOINTS
                .iter()
                .map(|(path, description)| EndpointInfo {
                    path: path.to_string(),
                    description: description.to_string(),
                })
                .collect(),
        }
    }
}
