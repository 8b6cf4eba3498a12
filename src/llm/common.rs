//! Request and response helpers for OpenAI-compatible APIs

use super::LlmError;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionResponse,
};

/// Build the system + user message pair
///
/// # Errors
///
/// Returns `LlmError::Unknown` if message building fails.
pub fn build_messages(
    system_prompt: &str,
    user_message: &str,
) -> Result<Vec<ChatCompletionRequestMessage>, LlmError> {
    Ok(vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(system_prompt)
            .build()
            .map_err(|e| LlmError::Unknown(e.to_string()))?
            .into(),
        ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(|e| LlmError::Unknown(e.to_string()))?
            .into(),
    ])
}

/// Extract trimmed text from the first choice
///
/// # Errors
///
/// Returns `LlmError::EmptyResponse` if there is no choice or it is blank.
pub fn extract_text(response: &CreateChatCompletionResponse) -> Result<String, LlmError> {
    response
        .choices
        .first()
        .and_then(|c| c.message.content.as_deref())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToString::to_string)
        .ok_or(LlmError::EmptyResponse)
}
