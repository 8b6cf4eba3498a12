//! OpenAI-compatible hint generator
//!
//! Works with `OpenRouter` and any other endpoint speaking the chat
//! completions protocol.

use super::common::{build_messages, extract_text};
use super::prompts::{analyze_prompt, start_hint_prompt, SYSTEM_PROMPT};
use super::{HintGenerator, LlmError};
use crate::config::{ANALYZE_MAX_TOKENS, HINT_TEMPERATURE, START_HINT_MAX_TOKENS};
use crate::utils::truncate_str;
use async_openai::{
    config::OpenAIConfig, types::chat::CreateChatCompletionRequestArgs, Client,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// [`HintGenerator`] backed by a chat completions endpoint
pub struct OpenAiCompatGenerator {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiCompatGenerator {
    /// Create a generator for `base_url` using `model`
    #[must_use]
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url);
        Self {
            client: Client::with_config(config),
            model,
        }
    }

    async fn complete(&self, user_message: &str, max_tokens: u32) -> Result<String, LlmError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.clone())
            .messages(build_messages(SYSTEM_PROMPT, user_message)?)
            .max_tokens(max_tokens)
            .temperature(HINT_TEMPERATURE)
            .build()
            .map_err(|e| LlmError::Unknown(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LlmError::ApiError(e.to_string()))?;

        let text = extract_text(&response)?;
        debug!("Model response: {}", truncate_str(&text, 200));
        Ok(text)
    }
}

#[async_trait]
impl HintGenerator for OpenAiCompatGenerator {
    #[instrument(skip(self, task_description, reference_solution))]
    async fn generate_start_hint(
        &self,
        task_id: i64,
        task_description: &str,
        reference_solution: &str,
    ) -> Result<String, LlmError> {
        let prompt = start_hint_prompt(task_description, reference_solution);
        self.complete(&prompt, START_HINT_MAX_TOKENS).await
    }

    #[instrument(skip(self, task_description, reference_solution, user_code))]
    async fn analyze_code(
        &self,
        task_id: i64,
        task_description: &str,
        reference_solution: &str,
        user_code: &str,
    ) -> Result<String, LlmError> {
        let prompt = analyze_prompt(task_description, reference_solution, user_code);
        self.complete(&prompt, ANALYZE_MAX_TOKENS).await
    }
}
