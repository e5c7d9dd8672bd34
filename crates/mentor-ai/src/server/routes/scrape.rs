//! Scraping endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::crawler::PageSnapshot;
use crate::error::{Error, Result};
use crate::knowledge::IndexOutcome;
use crate::pipeline::ScrapeReport;
use crate::server::state::AppState;

/// Body of the scrape endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ScrapeRequest {
    /// Target URL; the configured default when absent
    #[serde(default)]
    pub url: Option<String>,
    /// Store and index the page (single-page scrape only)
    #[serde(default)]
    pub persist: bool,
}

/// Response for POST /api/v1/scrape
#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    #[serde(flatten)]
    pub snapshot: PageSnapshot,
    /// Chunks added to the knowledge base when persisted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_indexed: Option<usize>,
}

/// A request without a JSON body uses the defaults; a malformed one is rejected
fn request_body(body: std::result::Result<Json<ScrapeRequest>, JsonRejection>) -> Result<ScrapeRequest> {
    match body {
        Ok(Json(request)) => Ok(request),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(ScrapeRequest::default()),
        Err(rejection) => Err(rejection.into()),
    }
}

fn target_url(state: &AppState, requested: Option<String>) -> Result<String> {
    let url = requested
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| state.scraper().default_url().to_string());

    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(Error::validation("Scraper only supports http(s) URLs."));
    }
    Ok(url)
}

/// POST /api/v1/scrape - Fetch one page and return its text and links
pub async fn scrape_page(
    State(state): State<AppState>,
    body: std::result::Result<Json<ScrapeRequest>, JsonRejection>,
) -> Result<Json<ScrapeResponse>> {
    let request = request_body(body)?;
    let url = target_url(&state, request.url)?;

    let mut snapshot = state.scraper().scrape_page(&url).await?;

    let chunks_indexed = if request.persist {
        snapshot.page = state.db().upsert_scraped_page(&snapshot.page)?;
        match state.knowledge().index_page(&snapshot.page)? {
            IndexOutcome::Indexed { chunks } => Some(chunks),
            _ => Some(0),
        }
    } else {
        None
    };

    Ok(Json(ScrapeResponse {
        snapshot,
        chunks_indexed,
    }))
}

/// POST /api/v1/scrape/section - Crawl a section, store and index it, then scan for conflicts
pub async fn scrape_section(
    State(state): State<AppState>,
    body: std::result::Result<Json<ScrapeRequest>, JsonRejection>,
) -> Result<Json<ScrapeReport>> {
    let request = request_body(body)?;
    let url = target_url(&state, request.url)?;

    let report = state.pipeline().run(Some(&url)).await?;
    Ok(Json(report))
}
