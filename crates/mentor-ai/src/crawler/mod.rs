//! University website scraping
//!
//! Fetches pages from the university site, turns them into [`ScrapedPage`]s
//! and crawls whole sections below a base URL.

mod extract;

pub use extract::{
    discover_links, extract_links, extract_text_blocks, host_of, normalize_url, parse_page,
    path_segments,
};

use futures::stream::{self, StreamExt};
use reqwest::{redirect::Policy, Client};
use scraper::Html;
use serde::Serialize;
use std::time::Duration;

use crate::config::ScraperConfig;
use crate::error::{Error, Result};
use crate::types::{ScrapedLink, ScrapedPage};

/// A single page together with its raw text blocks and links
#[derive(Debug, Clone, Serialize)]
pub struct PageSnapshot {
    pub page: ScrapedPage,
    pub text_blocks: Vec<String>,
    pub links: Vec<ScrapedLink>,
}

/// HTTP scraper for the university website
#[derive(Clone)]
pub struct WebScraper {
    client: Client,
    config: ScraperConfig,
}

impl WebScraper {
    /// Create a new scraper
    pub fn new(config: ScraperConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(Policy::limited(10))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// URL crawled when a request does not name one
    pub fn default_url(&self) -> &str {
        &self.config.default_url
    }

    /// Fetch the HTML of a page
    pub async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await.map_err(|e| Error::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response.text().await.map_err(|e| Error::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Fetch and parse one page
    pub async fn scrape_page(&self, url: &str) -> Result<PageSnapshot> {
        let url = normalize_url(url)?;
        let html = self.fetch_html(&url).await?;

        let document = Html::parse_document(&html);
        Ok(PageSnapshot {
            page: extract::parse_document(&url, &document),
            text_blocks: extract::text_blocks(&document),
            links: extract::links(&document, &url),
        })
    }

    /// Crawl every page below `base_url`, one result per discovered URL in URL order
    pub async fn scrape_section(&self, base_url: &str) -> Result<Vec<ScrapedPage>> {
        let base_url = normalize_url(base_url)?;
        let html = self.fetch_html(&base_url).await?;

        let mut urls = discover_links(&base_url, &html)?;
        if urls.len() > self.config.max_pages {
            tracing::warn!(
                "Section {} has {} pages, crawling the first {}",
                base_url,
                urls.len(),
                self.config.max_pages
            );
            urls.truncate(self.config.max_pages);
        }
        tracing::info!("Crawling {} pages below {}", urls.len(), base_url);

        let base_page = parse_page(&base_url, &html);
        let mut pages: Vec<ScrapedPage> = stream::iter(urls.into_iter().filter(|u| *u != base_url))
            .map(|url| self.fetch_page(url))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        pages.push(base_page);
        pages.sort_by(|a, b| a.url.cmp(&b.url));

        let failed = pages.iter().filter(|p| !p.is_ok()).count();
        tracing::info!(
            "Crawled {} pages below {} ({} failed)",
            pages.len(),
            base_url,
            failed
        );

        Ok(pages)
    }

    async fn fetch_page(&self, url: String) -> ScrapedPage {
        match self.fetch_html(&url).await {
            Ok(html) => parse_page(&url, &html),
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", url, e);
                let source = host_of(&url);
                let tags = path_segments(&url);
                ScrapedPage::failed(url, source, tags, e.to_string())
            }
        }
    }
}
