//! Conflict detection endpoints

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::conflicts::ConflictReport;
use crate::error::{Error, Result};
use crate::server::extract::ApiQuery;
use crate::server::state::AppState;
use crate::types::Conflict;

#[derive(Debug, Default, Deserialize)]
pub struct ConflictQuery {
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConflictListResponse {
    pub conflicts: Vec<Conflict>,
}

/// POST /api/v1/conflicts/scan - Compare official records and log disagreements
pub async fn scan_conflicts(State(state): State<AppState>) -> Result<Json<ConflictReport>> {
    let detector = state.conflicts().clone();
    let report = tokio::task::spawn_blocking(move || detector.scan())
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;
    Ok(Json(report))
}

/// GET /api/v1/conflicts
pub async fn list_conflicts(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ConflictQuery>,
) -> Result<Json<ConflictListResponse>> {
    let topic = query
        .topic
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let conflicts = state.conflicts().list(topic)?;
    Ok(Json(ConflictListResponse { conflicts }))
}
