//! Chatbot, discovery feed and insight endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::chat::{discovery_feed, ChatReply, ChatRequest, FeedItem, FeedQuery, InsightReply, InsightRequest};
use crate::error::Result;
use crate::server::extract::{ApiJson, ApiQuery};
use crate::server::state::AppState;
use crate::types::ChatMessage;

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub conversation_id: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub items: Vec<FeedItem>,
}

/// POST /api/v1/chat - Answer a question from the knowledge base
pub async fn chat(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ChatRequest>,
) -> Result<Json<ChatReply>> {
    Ok(Json(state.chat().ask(request).await?))
}

/// GET /api/v1/chat/:conversation_id
pub async fn transcript(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<TranscriptResponse>> {
    let messages = state.chat().transcript(&conversation_id)?;
    Ok(Json(TranscriptResponse {
        conversation_id,
        messages,
    }))
}

/// GET /api/v1/feed
pub async fn feed(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<FeedQuery>,
) -> Result<Json<FeedResponse>> {
    let items = discovery_feed(state.db(), &query)?;
    Ok(Json(FeedResponse { items }))
}

/// POST /api/v1/insights
pub async fn insights(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<InsightRequest>,
) -> Result<Json<InsightReply>> {
    Ok(Json(state.chat().insight(request).await?))
}
