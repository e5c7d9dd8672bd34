//! HTML extraction for university pages

use chrono::Utc;
use once_cell::sync::Lazy;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{PageMetadata, ScrapedLink, ScrapedPage};

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css}: {e}"))
}

static OG_TITLE: Lazy<Selector> = Lazy::new(|| selector(r#"meta[property="og:title"]"#));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static H1: Lazy<Selector> = Lazy::new(|| selector("h1"));
static HEADINGS: Lazy<Selector> = Lazy::new(|| selector("h1, h2, h3"));
static PARAGRAPHS: Lazy<Selector> = Lazy::new(|| selector("p"));
static BREADCRUMB: Lazy<Selector> = Lazy::new(|| selector(r#"[class*="breadcrumb"]"#));
static BREADCRUMB_ITEMS: Lazy<Selector> = Lazy::new(|| selector("li, span, a"));
static TEXT_BLOCKS: Lazy<Selector> = Lazy::new(|| selector("p, li, h2, h3, h4"));
static ANCHORS: Lazy<Selector> = Lazy::new(|| selector("a[href]"));

/// Normalize a URL: default the scheme to https, require a host, drop query and fragment
pub fn normalize_url(url: &str) -> Result<String> {
    let url = url.trim();
    let candidate = if url.contains(':') {
        url.to_string()
    } else {
        format!("https://{}", url)
    };
    let parsed = Url::parse(&candidate)
        .map_err(|e| Error::validation(format!("Invalid URL '{}': {}", url, e)))?;

    normalize_parsed(parsed).ok_or_else(|| Error::validation("URL must include a domain"))
}

fn normalize_parsed(mut url: Url) -> Option<String> {
    if url.host_str().map_or(true, str::is_empty) {
        return None;
    }
    url.set_query(None);
    url.set_fragment(None);
    Some(url.to_string())
}

/// Host of a URL, empty when it has none
pub fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

/// Non-empty path segments of a URL
pub fn path_segments(url: &str) -> Vec<String> {
    Url::parse(url)
        .ok()
        .map(|u| {
            u.path()
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Pages below `base_url` linked from its HTML, plus the base itself, sorted and unique
pub fn discover_links(base_url: &str, html: &str) -> Result<Vec<String>> {
    let base = Url::parse(base_url)
        .map_err(|e| Error::validation(format!("Invalid base URL '{}': {}", base_url, e)))?;
    let base_host = (base.host_str().map(str::to_string), base.port_or_known_default());
    let trimmed = base.path().trim_end_matches('/');
    let allowed_prefix = if trimmed.is_empty() { "/" } else { trimmed };

    let mut discovered = BTreeSet::new();
    discovered.insert(base.to_string());

    let document = Html::parse_document(html);
    for anchor in document.select(&ANCHORS) {
        let href = anchor.value().attr("href").unwrap_or_default().trim();
        if href.is_empty() || href.starts_with("mailto:") || href.starts_with("tel:") {
            continue;
        }

        let Ok(candidate) = base.join(href) else {
            continue;
        };
        if !matches!(candidate.scheme(), "http" | "https") {
            continue;
        }
        if (candidate.host_str().map(str::to_string), candidate.port_or_known_default()) != base_host {
            continue;
        }
        if !candidate.path().starts_with(allowed_prefix) {
            continue;
        }
        if let Some(normalized) = normalize_parsed(candidate) {
            discovered.insert(normalized);
        }
    }

    Ok(discovered.into_iter().collect())
}

/// Parse a fetched page into its structured form
pub fn parse_page(url: &str, html: &str) -> ScrapedPage {
    let document = Html::parse_document(html);
    parse_document(url, &document)
}

pub(crate) fn parse_document(url: &str, document: &Html) -> ScrapedPage {
    let headings = extract_headings(document);
    let paragraphs = extract_paragraphs(document);
    let breadcrumbs = extract_breadcrumbs(document);

    let metadata = PageMetadata {
        breadcrumbs,
        heading_count: (!headings.is_empty()).then_some(headings.len()),
    };

    ScrapedPage {
        id: Uuid::new_v4(),
        url: url.to_string(),
        title: extract_title(document),
        content: paragraphs.join("\n\n"),
        headings,
        paragraphs,
        metadata,
        source: host_of(url),
        tags: path_segments(url),
        scraped_at: Utc::now(),
        error: None,
    }
}

/// Text of `p, li, h2, h3, h4` elements
pub fn extract_text_blocks(html: &str) -> Vec<String> {
    text_blocks(&Html::parse_document(html))
}

pub(crate) fn text_blocks(document: &Html) -> Vec<String> {
    document
        .select(&TEXT_BLOCKS)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Every link on the page, resolved against `base_url`
pub fn extract_links(html: &str, base_url: &str) -> Vec<ScrapedLink> {
    links(&Html::parse_document(html), base_url)
}

pub(crate) fn links(document: &Html, base_url: &str) -> Vec<ScrapedLink> {
    let base = Url::parse(base_url).ok();

    document
        .select(&ANCHORS)
        .map(|anchor| {
            let raw = anchor.value().attr("href").unwrap_or_default().trim();
            let href = base
                .as_ref()
                .and_then(|b| b.join(raw).ok())
                .map(|u| u.to_string())
                .unwrap_or_else(|| raw.to_string());
            let text = Some(element_text(anchor)).filter(|t| !t.is_empty());
            ScrapedLink { href, text }
        })
        .collect()
}

fn extract_title(document: &Html) -> Option<String> {
    let og_title = document
        .select(&OG_TITLE)
        .filter_map(|meta| meta.value().attr("content"))
        .map(str::trim)
        .find(|t| !t.is_empty());
    if let Some(title) = og_title {
        return Some(title.to_string());
    }

    let title = document
        .select(&TITLE)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty());
    if title.is_some() {
        return title;
    }

    document.select(&H1).next().map(element_text)
}

fn extract_headings(document: &Html) -> Vec<String> {
    document
        .select(&HEADINGS)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect()
}

fn extract_paragraphs(document: &Html) -> Vec<String> {
    document
        .select(&PARAGRAPHS)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect()
}

fn extract_breadcrumbs(document: &Html) -> Vec<String> {
    let Some(container) = document.select(&BREADCRUMB).next() else {
        return Vec::new();
    };

    let mut items: Vec<String> = Vec::new();
    for element in container.select(&BREADCRUMB_ITEMS) {
        let text = element_text(element);
        // <li><a>Home</a></li> yields the same text twice
        if !text.is_empty() && items.last() != Some(&text) {
            items.push(text);
        }
    }
    items
}

/// Text content with whitespace collapsed
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
