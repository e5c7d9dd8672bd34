//! Core types for the Mentor AI service

pub mod chat;
pub mod conflict;
pub mod knowledge;
pub mod page;
pub mod tip;

pub use chat::{ChatMessage, ChatRole};
pub use conflict::{Conflict, FactKind};
pub use knowledge::{KnowledgeFilter, KnowledgeRecord, KnowledgeStats, ScoredRecord, SourceKind};
pub use page::{PageMetadata, ScrapedLink, ScrapedPage};
pub use tip::{Tip, TipFilter, TipSubmission};
