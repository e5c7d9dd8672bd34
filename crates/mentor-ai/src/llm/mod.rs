//! LLM providers for chat answers and insights
//!
//! Implementations:
//! - `OpenAiClient`: hosted OpenAI-compatible chat completions API
//! - `OllamaClient`: local Ollama server
//! - `MockLlm`: canned replies for development and tests

mod mock;
mod ollama;
mod openai;
mod prompt;

pub use mock::MockLlm;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use prompt::PromptBuilder;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::{LlmConfig, LlmProviderKind};
use crate::error::{Error, Result};
use crate::types::ChatRole;

/// A message sent to a chat model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptMessage {
    /// `system`, `user` or `assistant`
    pub role: String,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn from_role(role: ChatRole, content: impl Into<String>) -> Self {
        Self { role: role.as_str().to_string(), content: content.into() }
    }
}

/// Everything a provider needs to answer one question
#[derive(Debug, Clone)]
pub struct ChatPrompt {
    /// Grounding instructions and retrieved context
    pub system: String,
    /// Earlier turns, oldest first
    pub history: Vec<PromptMessage>,
    /// The question being asked
    pub question: String,
}

impl ChatPrompt {
    /// Flatten into the message list chat APIs expect
    pub fn messages(&self) -> Vec<PromptMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(PromptMessage::system(self.system.clone()));
        messages.extend(self.history.iter().cloned());
        messages.push(PromptMessage::user(self.question.clone()));
        messages
    }
}

/// Trait for LLM-based answer generation
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate an answer for a prompt
    async fn complete(&self, prompt: &ChatPrompt) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging and responses
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}

/// Build the provider selected in the configuration
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    let provider: Arc<dyn LlmProvider> = match config.provider {
        LlmProviderKind::OpenAi => match config.api_key.as_deref() {
            Some(key) if !key.is_empty() => Arc::new(OpenAiClient::new(config, key)?),
            _ => {
                tracing::warn!("OPENAI_API_KEY is not set, falling back to the mock LLM");
                Arc::new(MockLlm::new())
            }
        },
        LlmProviderKind::Ollama => Arc::new(OllamaClient::new(config)?),
        LlmProviderKind::Mock => Arc::new(MockLlm::new()),
    };

    tracing::info!("LLM provider: {} ({})", provider.name(), provider.model());
    Ok(provider)
}

/// Retry an operation with exponential backoff (`base_ms * 2^attempt`)
pub(crate) async fn retry_request<F, Fut, T>(max_retries: u32, base_ms: u64, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = None;

    for attempt in 0..=max_retries {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                last_error = Some(e);
                if attempt < max_retries {
                    let delay = Duration::from_millis(base_ms.saturating_mul(2u64.saturating_pow(attempt)));
                    tracing::warn!(
                        "Request failed (attempt {}/{}), retrying in {:?}",
                        attempt + 1,
                        max_retries + 1,
                        delay
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::Llm("Unknown error".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = retry_request(3, 1, move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(Error::llm("temporarily unavailable"))
            } else {
                Ok("answer")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "answer");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_returns_last_error() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = retry_request(1, 1, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::llm("down"))
        })
        .await;

        assert!(matches!(result, Err(Error::Llm(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_openai_without_key_uses_mock() {
        let provider = create_provider(&LlmConfig::default()).unwrap();
        assert_eq!(provider.name(), "mock");
    }

    #[test]
    fn test_prompt_messages_order() {
        let prompt = ChatPrompt {
            system: "ctx".into(),
            history: vec![
                PromptMessage::from_role(ChatRole::User, "hi"),
                PromptMessage::from_role(ChatRole::Assistant, "hello"),
            ],
            question: "when?".into(),
        };
        let roles: Vec<String> = prompt.messages().into_iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    }
}
