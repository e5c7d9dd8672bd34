//! Offline provider with canned replies

use async_trait::async_trait;

use crate::error::Result;

use super::{ChatPrompt, LlmProvider};

/// Answers every question with `Mock reply to: <question>`
#[derive(Debug, Default)]
pub struct MockLlm;

impl MockLlm {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn complete(&self, prompt: &ChatPrompt) -> Result<String> {
        Ok(format!("Mock reply to: {}", prompt.question))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock"
    }
}
