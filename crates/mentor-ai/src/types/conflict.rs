//! Conflict records produced by the detector

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind of fact two records disagree on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum FactKind {
    Deadline,
    Fee,
    Credits,
    Duration,
    Language,
}

impl FactKind {
    pub const ALL: [FactKind; 5] = [
        FactKind::Deadline,
        FactKind::Fee,
        FactKind::Credits,
        FactKind::Duration,
        FactKind::Language,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deadline => "deadline",
            Self::Fee => "fee",
            Self::Credits => "credits",
            Self::Duration => "duration",
            Self::Language => "language",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl fmt::Display for FactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two knowledge records on the same topic stating different values
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conflict {
    pub id: Uuid,
    pub topic: String,
    pub kind: FactKind,
    pub left_id: String,
    pub left_value: String,
    pub left_excerpt: String,
    pub right_id: String,
    pub right_value: String,
    pub right_excerpt: String,
    pub detected_at: DateTime<Utc>,
}

impl Conflict {
    /// Order-independent identity of the conflict
    pub fn pair_key(&self) -> String {
        let (a, b) = if self.left_id <= self.right_id {
            (&self.left_id, &self.right_id)
        } else {
            (&self.right_id, &self.left_id)
        };
        format!("{}|{}|{}", a, b, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_key_is_symmetric() {
        let conflict = Conflict {
            id: Uuid::new_v4(),
            topic: "bewerbung".into(),
            kind: FactKind::Deadline,
            left_id: "page_b".into(),
            left_value: "2025-07-15".into(),
            left_excerpt: String::new(),
            right_id: "page_a".into(),
            right_value: "2025-06-01".into(),
            right_excerpt: String::new(),
            detected_at: Utc::now(),
        };
        let mut flipped = conflict.clone();
        std::mem::swap(&mut flipped.left_id, &mut flipped.right_id);
        assert_eq!(conflict.pair_key(), flipped.pair_key());
        assert_eq!(conflict.pair_key(), "page_a|page_b|deadline");
    }

    #[test]
    fn test_fact_kind_roundtrip_names() {
        for kind in FactKind::ALL {
            assert_eq!(FactKind::parse(kind.as_str()), Some(kind));
        }
    }
}
