//! API routes for the Mentor AI server

pub mod chat;
pub mod conflicts;
pub mod knowledge;
pub mod scrape;
pub mod tips;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Student tips
        .route("/tips", post(tips::create_tip).get(tips::list_tips))
        .route("/tips/graph", get(tips::tip_graph))
        .route("/tips/:id", get(tips::get_tip).delete(tips::delete_tip))
        // Scraping
        .route("/scrape", post(scrape::scrape_page))
        .route("/scrape/section", post(scrape::scrape_section))
        // Knowledge base
        .route("/knowledge", get(knowledge::list_knowledge))
        .route("/knowledge/search", get(knowledge::search_knowledge))
        .route("/knowledge/summary", get(knowledge::knowledge_summary))
        .route("/knowledge/reindex", post(knowledge::reindex))
        // Chatbot and discovery
        .route("/chat", post(chat::chat))
        .route("/chat/:conversation_id", get(chat::transcript))
        .route("/feed", get(chat::feed))
        .route("/insights", post(chat::insights))
        // Conflict detection
        .route("/conflicts", get(conflicts::list_conflicts))
        .route("/conflicts/scan", post(conflicts::scan_conflicts))
        // Service
        .route("/health", get(health))
        .route("/info", get(info))
}

/// GET /api/v1/health - database connectivity
async fn health(State(state): State<AppState>) -> Result<Json<Value>> {
    state.db().ping().map_err(|e| {
        tracing::warn!("Health check failed: {}", e);
        Error::DbUnavailable
    })?;

    Ok(Json(json!({
        "status": "ok",
        "db": 1,
        "version": "v1",
    })))
}

/// GET /api/v1/info - API overview
async fn info(State(state): State<AppState>) -> Json<Value> {
    let llm = state.chat().provider();

    Json(json!({
        "name": "mentor-ai",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Student tips, university site scraping and a knowledge-base backed chatbot",
        "llm": {
            "provider": llm.name(),
            "model": llm.model(),
        },
        "endpoints": {
            "POST /api/v1/tips": "Submit a student tip",
            "GET /api/v1/tips": "List tips (semester, issue_type, tag, limit, offset)",
            "GET /api/v1/tips/:id": "Get a tip",
            "DELETE /api/v1/tips/:id": "Delete a tip",
            "GET /api/v1/tips/graph": "Tip network graph",
            "POST /api/v1/scrape": "Scrape a single page",
            "POST /api/v1/scrape/section": "Crawl, store and index a site section",
            "GET /api/v1/knowledge": "List knowledge records (topic, source, limit)",
            "GET /api/v1/knowledge/search": "Full-text search (q, limit)",
            "GET /api/v1/knowledge/summary": "Knowledge base statistics and sample",
            "POST /api/v1/knowledge/reindex": "Rebuild the knowledge base",
            "POST /api/v1/chat": "Ask the chatbot",
            "GET /api/v1/chat/:conversation_id": "Conversation transcript",
            "GET /api/v1/feed": "Discovery feed (topic, source, limit)",
            "POST /api/v1/insights": "Short insight on a topic",
            "POST /api/v1/conflicts/scan": "Run conflict detection",
            "GET /api/v1/conflicts": "List detected conflicts (topic)",
            "GET /api/v1/health": "Health check"
        }
    }))
}
