//! Short LLM-written insights backed by supporting records

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::llm::PromptBuilder;
use crate::types::KnowledgeRecord;

use super::{ChatService, SourceRef};

/// Body of `POST /api/v1/insights`
#[derive(Debug, Clone, Deserialize)]
pub struct InsightRequest {
    pub query: String,
}

/// Generated insight with its supporting records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightReply {
    pub insight: String,
    /// Share of requested supporting records that were found
    pub confidence: f32,
    pub sources: Vec<SourceRef>,
}

impl ChatService {
    /// Summarize what the knowledge base says about a query
    pub async fn insight(&self, request: InsightRequest) -> Result<InsightReply> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(Error::validation("query cannot be empty"));
        }

        let requested = self.config.top_k.max(1);
        let records: Vec<KnowledgeRecord> = self
            .knowledge
            .search(query, requested)?
            .into_iter()
            .map(|hit| hit.record)
            .collect();

        if records.is_empty() {
            return Ok(InsightReply {
                insight: format!("No information found for: {}", query),
                confidence: 0.0,
                sources: Vec::new(),
            });
        }

        let prompt = PromptBuilder::insight_prompt(query, &records);
        let insight = self.llm.complete(&prompt).await?;
        let confidence = records.len() as f32 / requested as f32;

        tracing::info!(
            "Insight for '{}' from {} records (confidence {:.2})",
            query,
            records.len(),
            confidence
        );

        Ok(InsightReply {
            insight,
            confidence,
            sources: records.iter().map(SourceRef::from).collect(),
        })
    }
}
