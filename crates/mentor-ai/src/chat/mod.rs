//! Chatbot over the unified knowledge base
//!
//! A question is answered by retrieving the best matching knowledge
//! records, adding the recent conversation and asking the configured
//! LLM provider. Both sides of the exchange are persisted.

mod feed;
mod insights;

pub use feed::{discovery_feed, FeedItem, FeedQuery};
pub use insights::{InsightReply, InsightRequest};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::KnowledgeConfig;
use crate::error::{Error, Result};
use crate::knowledge::KnowledgeBase;
use crate::llm::{LlmProvider, PromptBuilder};
use crate::storage::MentorDb;
use crate::types::{ChatMessage, ChatRole, KnowledgeRecord, SourceKind};

/// Upper bound for records retrieved per question
pub const MAX_TOP_K: usize = 20;

const SNIPPET_CHARS: usize = 200;

/// Body of `POST /api/v1/chat`
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// A knowledge record cited by an answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRef {
    pub id: String,
    pub topic: String,
    pub source: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
    pub origin: String,
    pub snippet: String,
}

impl From<&KnowledgeRecord> for SourceRef {
    fn from(record: &KnowledgeRecord) -> Self {
        Self {
            id: record.id.clone(),
            topic: record.topic.clone(),
            source: record.source,
            semester: record.semester.clone(),
            origin: record.origin.clone(),
            snippet: record.preview(SNIPPET_CHARS),
        }
    }
}

/// Answer to a chat question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    /// Provider that produced the answer
    pub source: String,
    pub conversation_id: String,
    pub sources: Vec<SourceRef>,
}

/// Chat and insight service
#[derive(Clone)]
pub struct ChatService {
    db: MentorDb,
    knowledge: KnowledgeBase,
    llm: Arc<dyn LlmProvider>,
    config: KnowledgeConfig,
}

impl ChatService {
    pub fn new(
        db: MentorDb,
        knowledge: KnowledgeBase,
        llm: Arc<dyn LlmProvider>,
        config: KnowledgeConfig,
    ) -> Self {
        Self {
            db,
            knowledge,
            llm,
            config,
        }
    }

    /// Answer a question and record the exchange
    pub async fn ask(&self, request: ChatRequest) -> Result<ChatReply> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(Error::validation("message cannot be empty"));
        }

        let conversation_id = request
            .conversation_id
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let top_k = request.top_k.unwrap_or(self.config.top_k).clamp(1, MAX_TOP_K);
        let records: Vec<KnowledgeRecord> = self
            .knowledge
            .search(message, top_k)?
            .into_iter()
            .map(|hit| hit.record)
            .collect();

        let history = self.db.conversation(&conversation_id)?;
        let skip = history.len().saturating_sub(self.config.history_turns);
        let history = &history[skip..];

        tracing::info!(
            "Chat {}: {} records retrieved, {} prior messages",
            conversation_id,
            records.len(),
            history.len()
        );

        let prompt = PromptBuilder::chat_prompt(message, &records, history);
        let response = self.llm.complete(&prompt).await?;

        let cited: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        self.db
            .insert_chat_message(&ChatMessage::new(&conversation_id, ChatRole::User, message))?;
        self.db.insert_chat_message(
            &ChatMessage::new(&conversation_id, ChatRole::Assistant, response.clone())
                .with_metadata("provider", self.llm.name())
                .with_metadata("sources", cited.join(",")),
        )?;

        Ok(ChatReply {
            response,
            source: self.llm.name().to_string(),
            conversation_id,
            sources: records.iter().map(SourceRef::from).collect(),
        })
    }

    /// Stored messages of a conversation
    pub fn transcript(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        let messages = self.db.conversation(conversation_id)?;
        if messages.is_empty() {
            return Err(Error::not_found("Conversation", conversation_id));
        }
        Ok(messages)
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }
}
