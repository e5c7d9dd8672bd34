//! Discovery feed mixing student tips and official information

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use crate::error::Result;
use crate::storage::MentorDb;
use crate::types::{KnowledgeFilter, KnowledgeRecord, SourceKind};

const DEFAULT_FEED_LIMIT: usize = 20;
const MAX_FEED_LIMIT: usize = 100;
const EXCERPT_CHARS: usize = 280;

/// Query parameters of `GET /api/v1/feed`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedQuery {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub source: Option<SourceKind>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// One entry of the discovery feed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedItem {
    pub id: String,
    pub topic: String,
    pub source: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
    pub excerpt: String,
    pub origin: String,
    pub created_at: DateTime<Utc>,
}

impl From<&KnowledgeRecord> for FeedItem {
    fn from(record: &KnowledgeRecord) -> Self {
        Self {
            id: record.id.clone(),
            topic: record.topic.clone(),
            source: record.source,
            semester: record.semester.clone(),
            excerpt: record.preview(EXCERPT_CHARS),
            origin: record.origin.clone(),
            created_at: record.created_at,
        }
    }
}

/// Newest knowledge, one chunk per page, alternating student and official entries
pub fn discovery_feed(db: &MentorDb, query: &FeedQuery) -> Result<Vec<FeedItem>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_FEED_LIMIT)
        .clamp(1, MAX_FEED_LIMIT);

    // Pages contribute several chunks each, so over-fetch before deduplicating
    let records = db.list_knowledge(&KnowledgeFilter {
        topic: query.topic.clone(),
        source: query.source,
        limit: limit * 5,
    })?;

    let mut seen_origins = HashSet::new();
    let mut student = VecDeque::new();
    let mut official = VecDeque::new();
    for record in &records {
        if !seen_origins.insert(record.origin.as_str()) {
            continue;
        }
        match record.source {
            SourceKind::Student => student.push_back(record),
            SourceKind::Official => official.push_back(record),
        }
    }

    Ok(interleave(student, official, limit)
        .into_iter()
        .map(FeedItem::from)
        .collect())
}

fn interleave<T>(mut first: VecDeque<T>, mut second: VecDeque<T>, limit: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(limit.min(first.len() + second.len()));
    while out.len() < limit {
        match (first.pop_front(), second.pop_front()) {
            (None, None) => break,
            (a, b) => {
                out.extend(a);
                if out.len() < limit {
                    out.extend(b);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn record(id: &str, source: SourceKind, origin: &str, created_at: DateTime<Utc>) -> KnowledgeRecord {
        KnowledgeRecord {
            id: id.to_string(),
            topic: "Mensa".to_string(),
            semester: None,
            source,
            content: format!("Inhalt von {}", id),
            origin: origin.to_string(),
            tags: vec![],
            chunk_index: None,
            total_chunks: None,
            created_at,
        }
    }

    #[test]
    fn test_interleave() {
        let a: VecDeque<_> = vec![1, 3, 5, 7].into();
        let b: VecDeque<_> = vec![2, 4].into();
        assert_eq!(interleave(a.clone(), b.clone(), 10), vec![1, 2, 3, 4, 5, 7]);
        assert_eq!(interleave(a, b, 3), vec![1, 2, 3]);
    }

    #[test]
    fn test_feed_one_chunk_per_page() {
        let db = MentorDb::in_memory().unwrap();
        let page = "https://www.h-da.de/campus/mensa";
        let tip_origin = Uuid::new_v4().to_string();
        let now = Utc::now();
        let ago = |minutes| now - Duration::minutes(minutes);
        db.insert_knowledge(&[
            record("page_1_chunk_0", SourceKind::Official, page, ago(5)),
            record("page_1_chunk_1", SourceKind::Official, page, ago(5)),
            record("tip_1", SourceKind::Student, &tip_origin, ago(1)),
            record("page_2_chunk_0", SourceKind::Official, "https://www.h-da.de/campus", ago(10)),
        ])
        .unwrap();

        let feed = discovery_feed(&db, &FeedQuery::default()).unwrap();
        let ids: Vec<&str> = feed.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["tip_1", "page_1_chunk_0", "page_2_chunk_0"]);

        let official_only = discovery_feed(
            &db,
            &FeedQuery {
                source: Some(SourceKind::Official),
                limit: Some(1),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(official_only.len(), 1);
        assert_eq!(official_only[0].source, SourceKind::Official);
    }
}
