//! Periodic re-crawl of the default section

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::pipeline::CrawlPipeline;

/// Spawn a task crawling the default URL every `every`; the first crawl runs after one interval
pub fn spawn_crawl_schedule(pipeline: CrawlPipeline, every: Duration) -> JoinHandle<()> {
    tracing::info!("Scheduled crawl every {:?}", every);

    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match pipeline.run(None).await {
                Ok(report) => tracing::info!(
                    "Scheduled crawl: {} pages, {} failed, {} chunks",
                    report.pages_scraped,
                    report.pages_failed,
                    report.chunks_indexed
                ),
                Err(e) => tracing::warn!("Scheduled crawl failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{KnowledgeConfig, ScraperConfig};
    use crate::conflicts::ConflictDetector;
    use crate::crawler::tests::{serve, site};
    use crate::crawler::WebScraper;
    use crate::knowledge::KnowledgeBase;
    use crate::storage::MentorDb;

    fn pipeline(db: &MentorDb, default_url: String) -> CrawlPipeline {
        let scraper = WebScraper::new(ScraperConfig {
            default_url,
            timeout_secs: 5,
            ..Default::default()
        })
        .unwrap();
        let knowledge = KnowledgeBase::new(db.clone(), KnowledgeConfig::default());
        CrawlPipeline::new(scraper, db.clone(), knowledge, ConflictDetector::new(db.clone()), true)
    }

    #[tokio::test]
    async fn test_first_crawl_runs_after_one_interval() {
        let base = serve(site()).await;
        let db = MentorDb::in_memory().unwrap();
        let handle = spawn_crawl_schedule(
            pipeline(&db, format!("{}/studium", base)),
            Duration::from_millis(500),
        );

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(db.count_scraped_pages().unwrap(), 0);

        // The default section is stored once the interval has passed; the 404 page is not
        let mut stored = 0;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            stored = db.count_scraped_pages().unwrap();
            if stored >= 2 {
                break;
            }
        }
        handle.abort();

        assert_eq!(stored, 2);
        let urls: Vec<String> = db
            .list_scraped_pages()
            .unwrap()
            .into_iter()
            .map(|p| p.url)
            .collect();
        assert!(urls.contains(&format!("{}/studium/bewerbung", base)));
    }
}
