//! Student tip types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Minimum description length after trimming
pub const MIN_DESCRIPTION_CHARS: usize = 10;
/// Maximum description length after trimming
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

/// A student-submitted piece of informal advice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tip {
    pub id: Uuid,
    /// Semester the tip applies to (e.g. "WS24/25" or "3")
    pub semester: String,
    /// Kind of issue the tip is about; acts as the tip's topic
    pub issue_type: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Form payload for `POST /api/v1/tips`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TipSubmission {
    pub semester: String,
    pub issue_type: String,
    pub description: String,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TipSubmission {
    /// Validate the submission and turn it into a new tip
    pub fn into_tip(self) -> Result<Tip> {
        let semester = self.semester.trim().to_string();
        if semester.is_empty() {
            return Err(Error::validation("semester cannot be empty"));
        }

        let issue_type = self.issue_type.trim().to_string();
        if issue_type.is_empty() {
            return Err(Error::validation("issue_type cannot be empty"));
        }

        let description = self.description.trim().to_string();
        let len = description.chars().count();
        if len < MIN_DESCRIPTION_CHARS {
            return Err(Error::validation(format!(
                "description must be at least {} characters",
                MIN_DESCRIPTION_CHARS
            )));
        }
        if len > MAX_DESCRIPTION_CHARS {
            return Err(Error::validation(format!(
                "description cannot exceed {} characters",
                MAX_DESCRIPTION_CHARS
            )));
        }

        let course = self
            .course
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        Ok(Tip {
            id: Uuid::new_v4(),
            semester,
            issue_type,
            description,
            course,
            tags: normalize_tags(&self.tags),
            created_at: Utc::now(),
        })
    }
}

/// Lowercase, trim and deduplicate tags, keeping first-seen order
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Filters for listing tips
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TipFilter {
    #[serde(default)]
    pub semester: Option<String>,
    #[serde(default)]
    pub issue_type: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

/// Largest page size accepted by the tip list
pub const MAX_TIP_LIMIT: usize = 200;

fn default_limit() -> usize {
    50
}

impl Default for TipFilter {
    fn default() -> Self {
        Self {
            semester: None,
            issue_type: None,
            tag: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl TipFilter {
    /// Limit clamped to `1..=MAX_TIP_LIMIT`
    pub fn effective_limit(&self) -> usize {
        self.limit.clamp(1, MAX_TIP_LIMIT)
    }
}
