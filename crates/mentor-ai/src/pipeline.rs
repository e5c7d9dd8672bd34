//! Crawl, persist, index and scan in one pass

use serde::Serialize;

use crate::conflicts::ConflictDetector;
use crate::crawler::WebScraper;
use crate::error::{Error, Result};
use crate::knowledge::{IndexOutcome, KnowledgeBase};
use crate::storage::MentorDb;
use crate::types::ScrapedPage;

/// Summary of a section crawl
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScrapeReport {
    pub base_url: String,
    pub pages_scraped: usize,
    pub pages_failed: usize,
    pub pages_skipped: usize,
    pub chunks_indexed: usize,
    /// Set when a conflict scan ran after the crawl
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflicts_found: Option<usize>,
    pub new_conflicts: usize,
    pub resolved_conflicts: usize,
    pub failed_urls: Vec<String>,
}

/// Section crawl shared by the API and the scheduler
#[derive(Clone)]
pub struct CrawlPipeline {
    scraper: WebScraper,
    db: MentorDb,
    knowledge: KnowledgeBase,
    detector: ConflictDetector,
    scan_after_crawl: bool,
}

impl CrawlPipeline {
    pub fn new(
        scraper: WebScraper,
        db: MentorDb,
        knowledge: KnowledgeBase,
        detector: ConflictDetector,
        scan_after_crawl: bool,
    ) -> Self {
        Self {
            scraper,
            db,
            knowledge,
            detector,
            scan_after_crawl,
        }
    }

    /// Crawl the section below `url` (the configured default when `None`)
    pub async fn run(&self, url: Option<&str>) -> Result<ScrapeReport> {
        let base_url = url.unwrap_or(self.scraper.default_url()).to_string();
        tracing::info!("Starting section crawl of {}", base_url);

        let pages = self.scraper.scrape_section(&base_url).await?;

        // Database work is synchronous
        let this = self.clone();
        let mut report = tokio::task::spawn_blocking(move || this.persist(pages))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;
        report.base_url = base_url;

        tracing::info!(
            "Section crawl of {} done: {} pages, {} failed, {} chunks indexed",
            report.base_url,
            report.pages_scraped,
            report.pages_failed,
            report.chunks_indexed
        );

        Ok(report)
    }

    fn persist(&self, pages: Vec<ScrapedPage>) -> Result<ScrapeReport> {
        let mut report = ScrapeReport::default();

        for page in pages {
            if !page.is_ok() {
                // Keep whatever an earlier crawl stored for this URL
                report.pages_failed += 1;
                report.failed_urls.push(page.url);
                continue;
            }

            let stored = self.db.upsert_scraped_page(&page)?;
            report.pages_scraped += 1;

            match self.knowledge.index_page(&stored)? {
                IndexOutcome::Indexed { chunks } => report.chunks_indexed += chunks,
                _ => report.pages_skipped += 1,
            }
        }

        if self.scan_after_crawl {
            let scan = self.detector.scan()?;
            report.conflicts_found = Some(scan.conflicts.len());
            report.new_conflicts = scan.new_conflicts;
            report.resolved_conflicts = scan.resolved;
        }

        Ok(report)
    }
}
