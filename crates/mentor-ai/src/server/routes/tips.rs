//! Student tip endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::graph::TipGraph;
use crate::knowledge::IndexOutcome;
use crate::server::extract::{ApiJson, ApiPath, ApiQuery};
use crate::server::state::AppState;
use crate::types::{Tip, TipFilter, TipSubmission};

/// Response for GET /api/v1/tips
#[derive(Debug, Serialize)]
pub struct TipListResponse {
    pub tips: Vec<Tip>,
    /// Matching tips ignoring limit and offset
    pub total: usize,
}

/// POST /api/v1/tips - Store a tip and add it to the knowledge base
pub async fn create_tip(
    State(state): State<AppState>,
    ApiJson(submission): ApiJson<TipSubmission>,
) -> Result<(StatusCode, Json<Tip>)> {
    let tip = submission.into_tip()?;
    state.db().insert_tip(&tip)?;

    match state.knowledge().index_tip(&tip) {
        Ok(IndexOutcome::Indexed { .. }) => {
            tracing::debug!("Tip {} added to the knowledge base", tip.id)
        }
        Ok(outcome) => tracing::debug!("Tip {} not indexed: {:?}", tip.id, outcome),
        // The tip itself is stored; a later reindex picks it up
        Err(e) => tracing::warn!("Failed to index tip {}: {}", tip.id, e),
    }

    tracing::info!("Stored tip {} ({}, {})", tip.id, tip.issue_type, tip.semester);
    Ok((StatusCode::CREATED, Json(tip)))
}

/// GET /api/v1/tips - List tips, newest first
pub async fn list_tips(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<TipFilter>,
) -> Result<Json<TipListResponse>> {
    let tips = state.db().list_tips(&filter)?;
    let total = state.db().count_tips(&filter)?;
    Ok(Json(TipListResponse { tips, total }))
}

/// GET /api/v1/tips/:id
pub async fn get_tip(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Tip>> {
    state
        .db()
        .get_tip(&id)?
        .map(Json)
        .ok_or_else(|| Error::not_found("Tip", id.to_string()))
}

/// DELETE /api/v1/tips/:id - Remove a tip and its knowledge record
pub async fn delete_tip(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode> {
    let tip = state
        .db()
        .get_tip(&id)?
        .ok_or_else(|| Error::not_found("Tip", id.to_string()))?;

    state.knowledge().remove_tip(&tip)?;
    state.db().delete_tip(&id)?;

    tracing::info!("Deleted tip {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/tips/graph - Network graph of the matching tips
pub async fn tip_graph(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<TipFilter>,
) -> Result<Json<TipGraph>> {
    let tips = state.db().list_tips(&filter)?;
    Ok(Json(TipGraph::build(&tips)))
}
