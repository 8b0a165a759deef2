//! Perplexity chat-completions client

use std::time::Duration;

use async_trait::async_trait;
use docpilot_core::ClinicalError;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";
pub const DEFAULT_MODEL: &str = "sonar-pro";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// Provider-independent description of one completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: Option<f32>,
    pub search_domains: Vec<String>,
    pub return_citations: bool,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: 2000,
            temperature: 0.1,
            top_p: None,
            search_domains: Vec::new(),
            return_citations: false,
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Restrict the provider's web search to these domains and ask for citations.
    pub fn cited_from(mut self, domains: &[&str]) -> Self {
        self.search_domains = domains.iter().map(|d| d.to_string()).collect();
        self.return_citations = true;
        self
    }
}

/// Text returned by the model plus any citations the provider attached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub citations: Vec<String>,
}

/// A hosted chat model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &Prompt) -> Result<Completion, ClinicalError>;
}

/// Client for the Perplexity chat-completions API
#[derive(Clone)]
pub struct PerplexityClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

/// Request body for chat completions
#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    search_domain_filter: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    return_citations: bool,
}

/// Response from chat completions
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

impl PerplexityClient {
    /// Create a new client with the given API key
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request_body(&self, prompt: &Prompt) -> ApiRequest {
        ApiRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: prompt.system.clone(),
                },
                Message {
                    role: "user".to_string(),
                    content: prompt.user.clone(),
                },
            ],
            max_tokens: prompt.max_tokens,
            temperature: prompt.temperature,
            top_p: prompt.top_p,
            search_domain_filter: prompt.search_domains.clone(),
            return_citations: prompt.return_citations,
        }
    }
}

#[async_trait]
impl ChatModel for PerplexityClient {
    async fn complete(&self, prompt: &Prompt) -> Result<Completion, ClinicalError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        tracing::debug!(status = %status, model = %self.model, "Perplexity responded");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let body = response
            .json::<ApiResponse>()
            .await
            .map_err(|e| ClinicalError::Llm(format!("Perplexity API call failed: {e}")))?;

        completion_from(body)
    }
}

/// Map a non-2xx status to the user-facing message.
fn status_error(status: StatusCode, body: &str) -> ClinicalError {
    let message = match status {
        StatusCode::UNAUTHORIZED => {
            "Invalid Perplexity API key - check your PERPLEXITY_API_KEY environment variable"
                .to_string()
        }
        StatusCode::TOO_MANY_REQUESTS => {
            "Perplexity API rate limit exceeded - please wait and try again".to_string()
        }
        _ => format!("Perplexity API error: {} - {}", status.as_u16(), body),
    };
    ClinicalError::Llm(message)
}

fn transport_error(err: &reqwest::Error) -> ClinicalError {
    if err.is_timeout() {
        ClinicalError::Llm("Perplexity API timeout - please try again".to_string())
    } else {
        ClinicalError::Llm(format!("Network error calling Perplexity API: {err}"))
    }
}

fn completion_from(body: ApiResponse) -> Result<Completion, ClinicalError> {
    let choice = body.choices.into_iter().next().ok_or_else(|| {
        ClinicalError::Llm("Invalid API response format - no choices returned".to_string())
    })?;

    tracing::debug!(chars = choice.message.content.len(), "Received completion");

    Ok(Completion {
        content: choice.message.content,
        citations: body.citations,
    })
}
