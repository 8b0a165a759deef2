use serde::{Deserialize, Serialize};

/// JSON body returned by every failed API call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Failure {
    pub success: bool,
    pub error: String,
}

impl Failure {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Body for routes that do not exist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteNotFound {
    pub error: String,
    pub status_code: u16,
}

impl Default for RouteNotFound {
    fn default() -> Self {
        Self {
            error: "Endpoint not found".to_string(),
            status_code: 404,
        }
    }
}
