//! Storage module for persistent data storage
//!
//! Provides SQLite-based persistence for tips, scraped pages, the unified
//! knowledge base, chat transcripts and detected conflicts.

mod database;

pub use database::MentorDb;
