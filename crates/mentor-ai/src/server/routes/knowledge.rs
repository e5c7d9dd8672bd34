//! Knowledge base endpoints

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::knowledge::{IndexReport, KnowledgeSummary};
use crate::server::extract::ApiQuery;
use crate::server::state::AppState;
use crate::types::{KnowledgeFilter, KnowledgeRecord, ScoredRecord};

const DEFAULT_SEARCH_LIMIT: usize = 10;
const MAX_SEARCH_LIMIT: usize = 50;

#[derive(Debug, Serialize)]
pub struct KnowledgeListResponse {
    pub records: Vec<KnowledgeRecord>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<ScoredRecord>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    #[serde(default = "default_sample")]
    pub sample: usize,
}

fn default_sample() -> usize {
    5
}

/// GET /api/v1/knowledge - List records, newest first
pub async fn list_knowledge(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<KnowledgeFilter>,
) -> Result<Json<KnowledgeListResponse>> {
    let records = state.db().list_knowledge(&filter)?;
    Ok(Json(KnowledgeListResponse { records }))
}

/// GET /api/v1/knowledge/search - Full-text search over tips and pages
pub async fn search_knowledge(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let q = query.q.trim();
    if q.is_empty() {
        return Err(Error::validation("q cannot be empty"));
    }

    let limit = query
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);
    let results = state.knowledge().search(q, limit)?;

    Ok(Json(SearchResponse {
        query: q.to_string(),
        results,
    }))
}

/// GET /api/v1/knowledge/summary - Counts plus a sample of recent records
pub async fn knowledge_summary(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SummaryQuery>,
) -> Result<Json<KnowledgeSummary>> {
    Ok(Json(state.knowledge().summary(query.sample)?))
}

/// POST /api/v1/knowledge/reindex - Rebuild the knowledge base from tips and stored pages
pub async fn reindex(State(state): State<AppState>) -> Result<Json<IndexReport>> {
    let knowledge = state.knowledge().clone();
    let report = tokio::task::spawn_blocking(move || knowledge.rebuild())
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;

    tracing::info!(
        "Reindex done: {} page chunks, {} tips",
        report.pages.total_chunks,
        report.tips.indexed
    );
    Ok(Json(report))
}
