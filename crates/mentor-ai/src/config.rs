//! Configuration for the Mentor AI service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MentorConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Scraper configuration
    pub scraper: ScraperConfig,
    /// LLM configuration
    pub llm: LlmConfig,
    /// Knowledge base configuration
    pub knowledge: KnowledgeConfig,
    /// Conflict detection configuration
    pub conflicts: ConflictConfig,
}

impl MentorConfig {
    /// Load configuration: defaults, then an optional TOML file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        // A missing .env is the normal case outside development
        let _ = dotenvy::dotenv();

        let file = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("MENTOR_CONFIG").ok().map(PathBuf::from));

        let mut config = match file {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Apply environment overrides through a lookup function
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("MENTOR_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("MENTOR_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(origins) = lookup("ALLOW_ORIGINS") {
            self.server.allow_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(path) = lookup("MENTOR_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.llm.api_key = Some(key).filter(|k| !k.is_empty());
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            self.llm.model = model;
        }
        if let Some(provider) = lookup("LLM_PROVIDER") {
            match provider.to_lowercase().as_str() {
                "openai" => self.llm.provider = LlmProviderKind::OpenAi,
                "ollama" => self.llm.provider = LlmProviderKind::Ollama,
                "mock" => self.llm.provider = LlmProviderKind::Mock,
                other => tracing::warn!("Ignoring unknown LLM_PROVIDER '{}'", other),
            }
        }
        if let Some(url) = lookup("LLM_BASE_URL") {
            self.llm.base_url = Some(url);
        }
        if let Some(url) = lookup("SCRAPE_BASE_URL") {
            self.scraper.default_url = url;
        }
        if let Some(secs) = lookup("SCRAPE_INTERVAL_SECS").and_then(|s| s.parse().ok()) {
            self.scraper.interval_secs = Some(secs).filter(|s| *s > 0);
        }
    }

    /// Reject configurations the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Config("server.port must be non-zero".to_string()));
        }
        if self.knowledge.chunk_overlap >= self.knowledge.chunk_size {
            return Err(Error::Config(format!(
                "knowledge.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.knowledge.chunk_overlap, self.knowledge.chunk_size
            )));
        }
        if self.scraper.default_url.trim().is_empty() {
            return Err(Error::Config("scraper.default_url must be set".to_string()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Allowed CORS origins ("*" allows any)
    pub allow_origins: Vec<String>,
    /// Maximum request body size in bytes
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            allow_origins: vec![
                "http://localhost:5500".to_string(),
                "http://localhost:5173".to_string(),
            ],
            max_body_bytes: 1024 * 1024, // 1MB
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file path
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mentor-ai")
            .join("mentor.db");

        Self { path }
    }
}

/// Scraper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// URL used when a request does not name one
    pub default_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// User-Agent header sent with every request
    pub user_agent: String,
    /// Maximum number of pages fetched per section crawl
    pub max_pages: usize,
    /// Concurrent page fetches during a crawl
    pub concurrency: usize,
    /// Crawl the default URL on this interval (disabled when unset)
    pub interval_secs: Option<u64>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            default_url: "https://www.h-da.de/studium/studienangebot".to_string(),
            timeout_secs: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            max_pages: 200,
            concurrency: 4,
            interval_secs: None,
        }
    }
}

/// Which LLM backend answers chat questions
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    /// Hosted OpenAI-compatible chat completions API
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    /// Local Ollama server
    Ollama,
    /// Canned replies, no network
    Mock,
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend selection
    pub provider: LlmProviderKind,
    /// API key (OpenAI)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL override (defaults per provider)
    pub base_url: Option<String>,
    /// Model name
    pub model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
    /// Base delay for retry backoff in milliseconds
    pub retry_base_ms: u64,
}

impl LlmConfig {
    /// Base URL for the selected provider
    pub fn resolved_base_url(&self) -> String {
        let url = match (&self.base_url, self.provider) {
            (Some(url), _) => url.clone(),
            (None, LlmProviderKind::Ollama) => "http://localhost:11434".to_string(),
            (None, _) => "https://api.openai.com".to_string(),
        };
        url.trim_end_matches('/').to_string()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::OpenAi,
            api_key: None,
            base_url: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            timeout_secs: 60,
            max_retries: 2,
            retry_base_ms: 1000,
        }
    }
}

/// Knowledge base configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
    /// Pages with less combined text are not indexed
    pub min_page_chars: usize,
    /// Tips with a shorter description are not indexed
    pub min_tip_chars: usize,
    /// Records retrieved per chat question
    pub top_k: usize,
    /// Prior conversation turns passed to the LLM
    pub history_turns: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            min_page_chars: 50,
            min_tip_chars: 20,
            top_k: 5,
            history_turns: 10,
        }
    }
}

/// Conflict detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictConfig {
    /// Run a scan after every section crawl
    pub scan_after_crawl: bool,
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            scan_after_crawl: true,
        }
    }
}
