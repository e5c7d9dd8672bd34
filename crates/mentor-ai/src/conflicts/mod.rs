//! Conflict detection between official knowledge records
//!
//! Facts (deadlines, fees, credits, durations, languages) are extracted
//! from every official record with regexes. Records on the same topic from
//! different pages that state disjoint values for the same kind of fact
//! are reported as conflicts, stored, and logged as JSON lines.

mod patterns;

pub use patterns::{extract_facts, Fact};

use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::error::Result;
use crate::storage::MentorDb;
use crate::types::{Conflict, FactKind, KnowledgeRecord};

/// Tracing target conflict records are logged on
pub const CONFLICT_LOG_TARGET: &str = "mentor_ai::conflicts";

/// Outcome of a conflict scan
#[derive(Debug, Clone, Serialize)]
pub struct ConflictReport {
    pub records_scanned: usize,
    /// Distinct normalized topics
    pub groups: usize,
    pub conflicts: Vec<Conflict>,
    /// Conflicts not seen in earlier scans
    pub new_conflicts: usize,
    /// Stored conflicts no longer present in the knowledge base
    pub resolved: usize,
}

/// Facts of one record grouped by kind
struct RecordFacts<'a> {
    record: &'a KnowledgeRecord,
    by_kind: BTreeMap<FactKind, Vec<Fact>>,
}

impl<'a> RecordFacts<'a> {
    fn new(record: &'a KnowledgeRecord) -> Self {
        let mut by_kind: BTreeMap<FactKind, Vec<Fact>> = BTreeMap::new();
        for fact in extract_facts(&record.content) {
            by_kind.entry(fact.kind).or_default().push(fact);
        }
        Self { record, by_kind }
    }

    fn values(&self, kind: FactKind) -> BTreeSet<&str> {
        self.by_kind
            .get(&kind)
            .map(|facts| facts.iter().map(|f| f.value.as_str()).collect())
            .unwrap_or_default()
    }

    fn excerpt(&self, kind: FactKind) -> String {
        self.by_kind
            .get(&kind)
            .and_then(|facts| facts.first())
            .map(|f| f.excerpt.clone())
            .unwrap_or_default()
    }
}

/// Lowercase, whitespace-collapsed topic
pub fn normalize_topic(topic: &str) -> String {
    topic
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Find conflicting facts among records; returns the number of topic groups and the conflicts
pub fn detect(records: &[KnowledgeRecord]) -> (usize, Vec<Conflict>) {
    let mut groups: BTreeMap<String, Vec<RecordFacts<'_>>> = BTreeMap::new();
    for record in records {
        let facts = RecordFacts::new(record);
        groups.entry(normalize_topic(&record.topic)).or_default().push(facts);
    }

    let mut conflicts = Vec::new();
    for (topic, members) in &groups {
        for (i, left) in members.iter().enumerate() {
            for right in &members[i + 1..] {
                if left.record.origin == right.record.origin {
                    continue;
                }

                for kind in FactKind::ALL {
                    let left_values = left.values(kind);
                    let right_values = right.values(kind);
                    if left_values.is_empty()
                        || right_values.is_empty()
                        || !left_values.is_disjoint(&right_values)
                    {
                        continue;
                    }

                    conflicts.push(Conflict {
                        id: Uuid::new_v4(),
                        topic: topic.clone(),
                        kind,
                        left_id: left.record.id.clone(),
                        left_value: join_values(&left_values),
                        left_excerpt: left.excerpt(kind),
                        right_id: right.record.id.clone(),
                        right_value: join_values(&right_values),
                        right_excerpt: right.excerpt(kind),
                        detected_at: Utc::now(),
                    });
                }
            }
        }
    }

    (groups.len(), conflicts)
}

fn join_values(values: &BTreeSet<&str>) -> String {
    values.iter().copied().collect::<Vec<_>>().join(", ")
}

/// Runs detection over the stored knowledge base
#[derive(Clone)]
pub struct ConflictDetector {
    db: MentorDb,
}

impl ConflictDetector {
    pub fn new(db: MentorDb) -> Self {
        Self { db }
    }

    /// Scan all official records, store and log the conflicts found
    pub fn scan(&self) -> Result<ConflictReport> {
        let records = self.db.official_knowledge()?;
        let (groups, conflicts) = detect(&records);

        let mut new_conflicts = 0;
        for conflict in &conflicts {
            let is_new = self.db.insert_conflict(conflict)?;
            if is_new {
                new_conflicts += 1;
            }
            log_conflict(conflict, is_new);
        }

        // A re-crawl may have brought the pages back into agreement
        let current: Vec<String> = conflicts.iter().map(Conflict::pair_key).collect();
        let resolved = self.db.prune_conflicts(&current)?;

        tracing::info!(
            "Conflict scan: {} records in {} topics, {} conflicts ({} new, {} resolved)",
            records.len(),
            groups,
            conflicts.len(),
            new_conflicts,
            resolved
        );

        Ok(ConflictReport {
            records_scanned: records.len(),
            groups,
            conflicts,
            new_conflicts,
            resolved,
        })
    }

    /// Stored conflicts, optionally for one topic
    pub fn list(&self, topic: Option<&str>) -> Result<Vec<Conflict>> {
        let topic = topic.map(normalize_topic).filter(|t| !t.is_empty());
        self.db.list_conflicts(topic.as_deref())
    }
}

/// One JSON line per conflict
fn log_conflict(conflict: &Conflict, is_new: bool) {
    let mut line = match serde_json::to_value(conflict) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!("Failed to serialize conflict {}: {}", conflict.id, e);
            return;
        }
    };
    if let Some(object) = line.as_object_mut() {
        object.insert("new".to_string(), serde_json::Value::Bool(is_new));
    }
    tracing::warn!(target: CONFLICT_LOG_TARGET, "{}", line);
}
