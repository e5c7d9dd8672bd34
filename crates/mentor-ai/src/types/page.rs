//! Scraped page types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Structured representation of a scraped page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScrapedPage {
    pub id: Uuid,
    pub url: String,
    pub title: Option<String>,
    #[serde(default)]
    pub headings: Vec<String>,
    #[serde(default)]
    pub paragraphs: Vec<String>,
    /// Paragraphs joined by blank lines
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub metadata: PageMetadata,
    /// Host the page was served from
    pub source: String,
    /// Non-empty URL path segments
    #[serde(default)]
    pub tags: Vec<String>,
    pub scraped_at: DateTime<Utc>,
    /// Set when fetching the page failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScrapedPage {
    /// A page that could not be fetched
    pub fn failed(url: String, source: String, tags: Vec<String>, error: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            url,
            title: None,
            headings: Vec::new(),
            paragraphs: Vec::new(),
            content: String::new(),
            metadata: PageMetadata::default(),
            source,
            tags,
            scraped_at: Utc::now(),
            error: Some(error),
        }
    }

    /// Whether the page was fetched and parsed
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// All text worth indexing: content, then headings and paragraphs not already in it
    pub fn full_text(&self) -> String {
        let mut text = self.content.clone();

        let extra_headings: Vec<&str> = self
            .headings
            .iter()
            .map(String::as_str)
            .filter(|h| !text.contains(*h))
            .collect();
        if !extra_headings.is_empty() {
            text.push_str("\n\n");
            text.push_str(&extra_headings.join("\n"));
        }

        let extra_paragraphs: Vec<&str> = self
            .paragraphs
            .iter()
            .map(String::as_str)
            .filter(|p| !self.content.contains(*p))
            .collect();
        if !extra_paragraphs.is_empty() {
            text.push_str("\n\n");
            text.push_str(&extra_paragraphs.join("\n"));
        }

        text
    }

    /// Topic used in the knowledge base: title, else last path segment, else host
    pub fn topic(&self) -> String {
        self.title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.tags.last().cloned())
            .unwrap_or_else(|| self.source.clone())
    }
}

/// Extra page details
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PageMetadata {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breadcrumbs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_count: Option<usize>,
}

/// A hyperlink found on a page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScrapedLink {
    pub href: String,
    #[serde(default)]
    pub text: Option<String>,
}
