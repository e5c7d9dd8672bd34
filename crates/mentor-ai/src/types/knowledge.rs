//! Unified knowledge base records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::tip::Tip;

/// Where a knowledge record came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Scraped from the university website
    Official,
    /// Submitted by a student
    Student,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Official => "official",
            Self::Student => "student",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "official" => Some(Self::Official),
            "student" => Some(Self::Student),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record in the unified knowledge base
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeRecord {
    /// `tip_<uuid>` or `page_<uuid>_chunk_<n>`
    pub id: String,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
    pub source: SourceKind,
    pub content: String,
    /// Page URL or tip id
    pub origin: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeRecord {
    /// Knowledge id for a tip
    pub fn tip_id(tip: &Tip) -> String {
        format!("tip_{}", tip.id)
    }

    /// Knowledge id for a page chunk
    pub fn page_chunk_id(page_id: &uuid::Uuid, chunk_index: usize) -> String {
        format!("page_{}_chunk_{}", page_id, chunk_index)
    }

    /// Build the record for a tip
    pub fn from_tip(tip: &Tip) -> Self {
        Self {
            id: Self::tip_id(tip),
            topic: tip.issue_type.clone(),
            semester: Some(tip.semester.clone()),
            source: SourceKind::Student,
            content: tip.description.clone(),
            origin: tip.id.to_string(),
            tags: tip.tags.clone(),
            chunk_index: None,
            total_chunks: None,
            created_at: tip.created_at,
        }
    }

    /// First `max_chars` characters, with an ellipsis when cut
    pub fn preview(&self, max_chars: usize) -> String {
        let mut preview: String = self.content.chars().take(max_chars).collect();
        if self.content.chars().count() > max_chars {
            preview.push_str("...");
        }
        preview
    }
}

/// Filters for listing knowledge records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeFilter {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub source: Option<SourceKind>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

impl Default for KnowledgeFilter {
    fn default() -> Self {
        Self {
            topic: None,
            source: None,
            limit: default_limit(),
        }
    }
}

/// Knowledge base counts
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KnowledgeStats {
    pub total: usize,
    pub official: usize,
    pub student: usize,
}

/// A knowledge record returned by full-text search
#[derive(Debug, Clone, Serialize)]
pub struct ScoredRecord {
    #[serde(flatten)]
    pub record: KnowledgeRecord,
    /// bm25 relevance, higher is better
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_record_from_tip() {
        let tip = Tip {
            id: Uuid::new_v4(),
            semester: "3".into(),
            issue_type: "Internship".into(),
            description: "Ask the internship office before signing anything.".into(),
            course: None,
            tags: vec!["praktikum".into()],
            created_at: Utc::now(),
        };
        let record = KnowledgeRecord::from_tip(&tip);
        assert_eq!(record.id, format!("tip_{}", tip.id));
        assert_eq!(record.source, SourceKind::Student);
        assert_eq!(record.semester.as_deref(), Some("3"));
        assert_eq!(record.origin, tip.id.to_string());
    }

    #[test]
    fn test_preview_truncates_on_chars() {
        let mut record = KnowledgeRecord::from_tip(&Tip {
            id: Uuid::new_v4(),
            semester: "1".into(),
            issue_type: "x".into(),
            description: "äöü".repeat(50),
            course: None,
            tags: vec![],
            created_at: Utc::now(),
        });
        assert_eq!(record.preview(10).chars().count(), 13);
        record.content = "short".into();
        assert_eq!(record.preview(10), "short");
    }
}
