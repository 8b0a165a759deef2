//! LLM-backed features: SQL generation, case analysis, summarization and
//! treatment recommendations, all over a [`ChatModel`].

pub mod analyzer;
pub mod client;
pub mod json;
pub mod sql_gen;
pub mod summarizer;
pub mod treatment;

pub use client::{ChatModel, Completion, PerplexityClient, Prompt};

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use docpilot_core::ClinicalError;

    use super::{ChatModel, Completion, Prompt};

    /// Replays canned replies in order and records every prompt it sees.
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<Result<Completion, ClinicalError>>>,
        prompts: Mutex<Vec<Prompt>>,
    }

    impl ScriptedModel {
        pub fn new<'a>(replies: impl IntoIterator<Item = &'a str>) -> Self {
            Self::from_results(replies.into_iter().map(|r| {
                Ok(Completion {
                    content: r.to_string(),
                    citations: Vec::new(),
                })
            }))
        }

        pub fn failing(message: &str) -> Self {
            Self::from_results([Err(ClinicalError::Llm(message.to_string()))])
        }

        pub fn from_results(
            replies: impl IntoIterator<Item = Result<Completion, ClinicalError>>,
        ) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn prompts(&self) -> Vec<Prompt> {
            self.prompts.lock().unwrap().clone()
        }

        pub fn last_prompt(&self) -> Option<Prompt> {
            self.prompts.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, prompt: &Prompt) -> Result<Completion, ClinicalError> {
            self.prompts.lock().unwrap().push(prompt.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ClinicalError::Llm("script exhausted".to_string())))
        }
    }
}
