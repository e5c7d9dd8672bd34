//! Unified knowledge base
//!
//! Official page content and student tips are stored side by side under
//! the same `topic / semester / source / content` schema so the chatbot
//! and the feed can treat them uniformly.

mod chunker;

pub use chunker::TextChunker;

use serde::Serialize;

use crate::config::KnowledgeConfig;
use crate::error::Result;
use crate::storage::MentorDb;
use crate::types::{KnowledgeRecord, KnowledgeStats, ScoredRecord, ScrapedPage, SourceKind, Tip};

/// Characters shown in summary previews
const PREVIEW_CHARS: usize = 100;

/// Result of indexing a single page or tip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    Indexed { chunks: usize },
    TooShort,
    AlreadyIndexed,
    Failed,
}

/// Counters for one kind of source
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct KindReport {
    pub indexed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub total_chunks: usize,
}

impl KindReport {
    fn record(&mut self, outcome: Result<IndexOutcome>) {
        match outcome {
            Ok(IndexOutcome::Indexed { chunks }) => {
                self.indexed += 1;
                self.total_chunks += chunks;
            }
            Ok(IndexOutcome::TooShort | IndexOutcome::AlreadyIndexed) => self.skipped += 1,
            Ok(IndexOutcome::Failed) => self.errors += 1,
            Err(e) => {
                tracing::warn!("Indexing failed: {}", e);
                self.errors += 1;
            }
        }
    }
}

/// Outcome of a full rebuild
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct IndexReport {
    pub pages: KindReport,
    pub tips: KindReport,
}

/// One sampled record in the knowledge summary
#[derive(Debug, Clone, Serialize)]
pub struct SummaryItem {
    pub id: String,
    pub source: SourceKind,
    pub topic: String,
    pub preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
}

impl From<&KnowledgeRecord> for SummaryItem {
    fn from(record: &KnowledgeRecord) -> Self {
        let (url, chunk) = match record.source {
            SourceKind::Official => (
                Some(record.origin.clone()),
                record.chunk_index.map(|i| {
                    format!("{}/{}", i + 1, record.total_chunks.unwrap_or(1))
                }),
            ),
            SourceKind::Student => (None, None),
        };

        Self {
            id: record.id.clone(),
            source: record.source,
            topic: record.topic.clone(),
            preview: record.preview(PREVIEW_CHARS),
            url,
            chunk,
            semester: record.semester.clone(),
        }
    }
}

/// Collection statistics plus a sample of records
#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeSummary {
    #[serde(flatten)]
    pub stats: KnowledgeStats,
    pub sample: Vec<SummaryItem>,
}

/// Indexer and query front of the knowledge base
#[derive(Clone)]
pub struct KnowledgeBase {
    db: MentorDb,
    chunker: TextChunker,
    config: KnowledgeConfig,
}

impl KnowledgeBase {
    pub fn new(db: MentorDb, config: KnowledgeConfig) -> Self {
        Self {
            db,
            chunker: TextChunker::new(config.chunk_size, config.chunk_overlap),
            config,
        }
    }

    /// Replace a page's records with fresh chunks of its text
    pub fn index_page(&self, page: &ScrapedPage) -> Result<IndexOutcome> {
        if !page.is_ok() {
            return Ok(IndexOutcome::Failed);
        }

        let text = page.full_text();
        if text.trim().chars().count() < self.config.min_page_chars {
            tracing::debug!("Skipping short page {}", page.url);
            return Ok(IndexOutcome::TooShort);
        }

        let chunks = self.chunker.chunk(&text);
        let total = chunks.len() as u32;
        let topic = page.topic();

        let records: Vec<KnowledgeRecord> = chunks
            .into_iter()
            .enumerate()
            .map(|(i, content)| KnowledgeRecord {
                id: KnowledgeRecord::page_chunk_id(&page.id, i),
                topic: topic.clone(),
                semester: None,
                source: SourceKind::Official,
                content,
                origin: page.url.clone(),
                tags: page.tags.clone(),
                chunk_index: Some(i as u32),
                total_chunks: Some(total),
                created_at: page.scraped_at,
            })
            .collect();

        self.db.delete_knowledge_by_origin(&page.url)?;
        let inserted = self.db.insert_knowledge(&records)?;
        tracing::debug!("Indexed {} chunks from {}", inserted, page.url);

        Ok(IndexOutcome::Indexed { chunks: inserted })
    }

    /// Add a tip to the knowledge base unless it is too short or already present
    pub fn index_tip(&self, tip: &Tip) -> Result<IndexOutcome> {
        if tip.description.trim().chars().count() < self.config.min_tip_chars {
            return Ok(IndexOutcome::TooShort);
        }
        if self.db.knowledge_exists(&KnowledgeRecord::tip_id(tip))? {
            return Ok(IndexOutcome::AlreadyIndexed);
        }

        let inserted = self.db.insert_knowledge(&[KnowledgeRecord::from_tip(tip)])?;
        Ok(IndexOutcome::Indexed { chunks: inserted })
    }

    /// Drop the record of a deleted tip
    pub fn remove_tip(&self, tip: &Tip) -> Result<usize> {
        self.db.delete_knowledge_by_origin(&tip.id.to_string())
    }

    /// Index every stored page and tip
    pub fn rebuild(&self) -> Result<IndexReport> {
        let mut report = IndexReport::default();

        let pages = self.db.list_scraped_pages()?;
        tracing::info!("Indexing {} scraped pages", pages.len());
        for page in &pages {
            report.pages.record(self.index_page(page));
        }

        let tips = self.db.all_tips()?;
        tracing::info!("Indexing {} tips", tips.len());
        for tip in &tips {
            report.tips.record(self.index_tip(tip));
        }

        tracing::info!(
            "Knowledge base rebuilt: {} pages ({} chunks), {} tips",
            report.pages.indexed,
            report.pages.total_chunks,
            report.tips.indexed
        );

        Ok(report)
    }

    /// Full-text search, best match first
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<ScoredRecord>> {
        self.db.search_knowledge(query, limit)
    }

    /// Counts plus the newest `sample` records
    pub fn summary(&self, sample: usize) -> Result<KnowledgeSummary> {
        let stats = self.db.knowledge_stats()?;
        let sample = self
            .db
            .recent_knowledge(sample)?
            .iter()
            .map(SummaryItem::from)
            .collect();

        Ok(KnowledgeSummary { stats, sample })
    }

    pub fn config(&self) -> &KnowledgeConfig {
        &self.config
    }
}
