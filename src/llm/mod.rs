//! Hint generation through an LLM
//!
//! Provides the [`HintGenerator`] interface used by the tutor flows and an
//! OpenAI-compatible implementation (`OpenRouter` by default).

mod common;
mod openai_compat;
/// Prompt texts and builders
pub mod prompts;

pub use openai_compat::OpenAiCompatGenerator;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// Error returned by the provider's API
    #[error("API error: {0}")]
    ApiError(String),
    /// Missing provider configuration or API key
    #[error("Missing client/API key: {0}")]
    MissingConfig(String),
    /// The model answered with nothing usable
    #[error("Empty response from model")]
    EmptyResponse,
    /// Any other unexpected error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Produces hints from a task statement and a reference solution
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HintGenerator: Send + Sync {
    /// One-sentence explanation of how to start the task
    async fn generate_start_hint(
        &self,
        task_id: i64,
        task_description: &str,
        reference_solution: &str,
    ) -> Result<String, LlmError>;

    /// One-sentence hint about what is wrong with the student's code
    async fn analyze_code(
        &self,
        task_id: i64,
        task_description: &str,
        reference_solution: &str,
        user_code: &str,
    ) -> Result<String, LlmError>;
}

/// Generator used when no API key is configured; every call fails
pub struct DisabledGenerator;

#[async_trait]
impl HintGenerator for DisabledGenerator {
    async fn generate_start_hint(
        &self,
        _task_id: i64,
        _task_description: &str,
        _reference_solution: &str,
    ) -> Result<String, LlmError> {
        Err(LlmError::MissingConfig("OPENROUTER_API_KEY".to_string()))
    }

    async fn analyze_code(
        &self,
        _task_id: i64,
        _task_description: &str,
        _reference_solution: &str,
        _user_code: &str,
    ) -> Result<String, LlmError> {
        Err(LlmError::MissingConfig("OPENROUTER_API_KEY".to_string()))
    }
}
