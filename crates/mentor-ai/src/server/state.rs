//! Application state for the Mentor AI server

use std::sync::Arc;

use crate::chat::ChatService;
use crate::config::MentorConfig;
use crate::conflicts::ConflictDetector;
use crate::crawler::WebScraper;
use crate::error::Result;
use crate::knowledge::KnowledgeBase;
use crate::llm::{self, LlmProvider};
use crate::pipeline::CrawlPipeline;
use crate::storage::MentorDb;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: MentorConfig,
    /// Document database
    db: MentorDb,
    /// Website scraper
    scraper: WebScraper,
    /// Unified knowledge base
    knowledge: KnowledgeBase,
    /// Chatbot, feed and insights
    chat: ChatService,
    /// Conflict detection engine
    conflicts: ConflictDetector,
    /// Crawl + index + scan
    pipeline: CrawlPipeline,
}

impl AppState {
    /// Create application state from configuration
    pub fn new(config: MentorConfig) -> Result<Self> {
        tracing::info!("Opening database at {}", config.database.path.display());
        let db = MentorDb::open(&config.database.path)?;
        let llm = llm::create_provider(&config.llm)?;
        Self::with_parts(config, db, llm)
    }

    /// Assemble state from an opened database and an LLM provider
    pub fn with_parts(config: MentorConfig, db: MentorDb, llm: Arc<dyn LlmProvider>) -> Result<Self> {
        let scraper = WebScraper::new(config.scraper.clone())?;
        let knowledge = KnowledgeBase::new(db.clone(), config.knowledge.clone());
        let chat = ChatService::new(db.clone(), knowledge.clone(), llm, config.knowledge.clone());
        let conflicts = ConflictDetector::new(db.clone());
        let pipeline = CrawlPipeline::new(
            scraper.clone(),
            db.clone(),
            knowledge.clone(),
            conflicts.clone(),
            config.conflicts.scan_after_crawl,
        );

        tracing::info!("Application state initialized");

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                scraper,
                knowledge,
                chat,
                conflicts,
                pipeline,
            }),
        })
    }

    pub fn config(&self) -> &MentorConfig {
        &self.inner.config
    }

    pub fn db(&self) -> &MentorDb {
        &self.inner.db
    }

    pub fn scraper(&self) -> &WebScraper {
        &self.inner.scraper
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.inner.knowledge
    }

    pub fn chat(&self) -> &ChatService {
        &self.inner.chat
    }

    pub fn conflicts(&self) -> &ConflictDetector {
        &self.inner.conflicts
    }

    pub fn pipeline(&self) -> &CrawlPipeline {
        &self.inner.pipeline
    }
}
