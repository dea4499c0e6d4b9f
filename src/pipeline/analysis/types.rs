use serde::{Deserialize, Serialize};

use super::AnalysisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One chat-completions message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// LLM client abstraction (allows mocking for tests)
pub trait LlmClient {
    /// Send a conversation and return the raw completion text.
    fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String, AnalysisError>;
}

impl<T: LlmClient + ?Sized> LlmClient for std::sync::Arc<T> {
    fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String, AnalysisError> {
        (**self).complete(messages, temperature)
    }
}
