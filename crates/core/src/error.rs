use thiserror::Error;

/// Failure categories of the clinical pipeline.
///
/// Every external call is a single best-effort attempt, so these carry a
/// human-readable message and nothing else.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClinicalError {
    /// LLM transport, auth, rate-limit or response-shape failure
    #[error("{0}")]
    Llm(String),

    /// Object storage listing or URL signing failure
    #[error("{0}")]
    Storage(String),

    /// Analytical engine failure
    #[error("{0}")]
    Query(String),

    /// LLM output that could not be turned into the requested structure
    #[error("{0}")]
    Parse(String),

    /// Caller supplied something the pipeline cannot work with
    #[error("{0}")]
    Invalid(String),

    /// A collaborator is not configured
    #[error("{0}")]
    Unavailable(String),
}

impl ClinicalError {
    /// Short machine-friendly category name, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ClinicalError::Llm(_) => "llm",
            ClinicalError::Storage(_) => "storage",
            ClinicalError::Query(_) => "query",
            ClinicalError::Parse(_) => "parse",
            ClinicalError::Invalid(_) => "invalid",
            ClinicalError::Unavailable(_) => "unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_bare_message() {
        let err = ClinicalError::Llm("Perplexity API timeout - please try again".into());
        assert_eq!(err.to_string(), "Perplexity API timeout - please try again");
        assert_eq!(err.kind(), "llm");
    }
}
