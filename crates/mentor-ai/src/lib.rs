//! mentor-ai: study companion backend for university students
//!
//! Students share informal tips, official pages of the university site are
//! scraped into the same knowledge base, and a chatbot answers questions
//! from both. Contradictory official statements (deadlines, fees, credits)
//! are detected and logged as JSON records.

pub mod chat;
pub mod config;
pub mod conflicts;
pub mod crawler;
pub mod error;
pub mod graph;
pub mod knowledge;
pub mod llm;
pub mod pipeline;
pub mod scheduler;
pub mod server;
pub mod storage;
pub mod types;

pub use config::MentorConfig;
pub use error::{Error, Result};
pub use server::{build_router, AppState, MentorServer};
pub use storage::MentorDb;
pub use types::{
    ChatMessage, Conflict, KnowledgeRecord, ScrapedPage, SourceKind, Tip, TipFilter, TipSubmission,
};
