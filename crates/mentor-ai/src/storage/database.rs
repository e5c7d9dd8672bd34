//! SQLite document store for tips, scraped pages, the knowledge base, chats and conflicts

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{
    ChatMessage, ChatRole, Conflict, FactKind, KnowledgeFilter, KnowledgeRecord, KnowledgeStats,
    ScoredRecord, ScrapedPage, SourceKind, Tip, TipFilter,
};

/// SQLite-backed store shared by every service component
#[derive(Clone)]
pub struct MentorDb {
    conn: Arc<Mutex<Connection>>,
}

impl MentorDb {
    /// Create or open the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::database(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate()?;
        Ok(db)
    }

    /// Create an in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::database(format!("Failed to open in-memory database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate()?;
        Ok(db)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA temp_store=MEMORY;
        "#).map_err(|e| Error::database(format!("Failed to set pragmas: {}", e)))?;

        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS tips (
                id TEXT PRIMARY KEY,
                semester TEXT NOT NULL,
                issue_type TEXT NOT NULL,
                description TEXT NOT NULL,
                course TEXT,
                tags TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tips_semester ON tips(semester);
            CREATE INDEX IF NOT EXISTS idx_tips_issue_type ON tips(issue_type);
            CREATE INDEX IF NOT EXISTS idx_tips_created_at ON tips(created_at);

            CREATE TABLE IF NOT EXISTS scraped_pages (
                id TEXT PRIMARY KEY,
                url TEXT NOT NULL UNIQUE,
                title TEXT,
                headings TEXT NOT NULL DEFAULT '[]',
                paragraphs TEXT NOT NULL DEFAULT '[]',
                content TEXT NOT NULL DEFAULT '',
                metadata TEXT NOT NULL DEFAULT '{}',
                source TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]',
                scraped_at TEXT NOT NULL,
                error TEXT
            );

            CREATE TABLE IF NOT EXISTS knowledge (
                id TEXT PRIMARY KEY,
                topic TEXT NOT NULL,
                semester TEXT,
                source TEXT NOT NULL,
                content TEXT NOT NULL,
                origin TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]',
                chunk_index INTEGER,
                total_chunks INTEGER,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_knowledge_origin ON knowledge(origin);
            CREATE INDEX IF NOT EXISTS idx_knowledge_source ON knowledge(source);
            CREATE INDEX IF NOT EXISTS idx_knowledge_created_at ON knowledge(created_at);

            -- FTS5 index over the knowledge base
            CREATE VIRTUAL TABLE IF NOT EXISTS knowledge_fts USING fts5(
                topic,
                content,
                content='knowledge',
                content_rowid='rowid'
            );

            CREATE TRIGGER IF NOT EXISTS knowledge_ai AFTER INSERT ON knowledge BEGIN
                INSERT INTO knowledge_fts(rowid, topic, content)
                VALUES (NEW.rowid, NEW.topic, NEW.content);
            END;

            CREATE TRIGGER IF NOT EXISTS knowledge_ad AFTER DELETE ON knowledge BEGIN
                INSERT INTO knowledge_fts(knowledge_fts, rowid, topic, content)
                VALUES ('delete', OLD.rowid, OLD.topic, OLD.content);
            END;

            CREATE TRIGGER IF NOT EXISTS knowledge_au AFTER UPDATE ON knowledge BEGIN
                INSERT INTO knowledge_fts(knowledge_fts, rowid, topic, content)
                VALUES ('delete', OLD.rowid, OLD.topic, OLD.content);
                INSERT INTO knowledge_fts(rowid, topic, content)
                VALUES (NEW.rowid, NEW.topic, NEW.content);
            END;

            CREATE TABLE IF NOT EXISTS chat_messages (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL,
                role TEXT NOT NULL,
                message TEXT NOT NULL,
                created_at TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}'
            );

            CREATE INDEX IF NOT EXISTS idx_chat_conversation ON chat_messages(conversation_id, created_at);

            CREATE TABLE IF NOT EXISTS conflicts (
                id TEXT PRIMARY KEY,
                pair_key TEXT NOT NULL UNIQUE,
                topic TEXT NOT NULL,
                kind TEXT NOT NULL,
                left_id TEXT NOT NULL,
                left_value TEXT NOT NULL,
                left_excerpt TEXT NOT NULL,
                right_id TEXT NOT NULL,
                right_value TEXT NOT NULL,
                right_excerpt TEXT NOT NULL,
                detected_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_conflicts_topic ON conflicts(topic);
        "#)
        .map_err(|e| Error::database(format!("Failed to run migrations: {}", e)))?;

        tracing::info!("Database migrations complete");
        Ok(())
    }

    /// Check the connection answers queries
    pub fn ping(&self) -> Result<()> {
        let conn = self.conn.lock();
        let one: i64 = conn
            .query_row("SELECT 1", [], |row| row.get(0))
            .map_err(|_| Error::DbUnavailable)?;
        if one == 1 {
            Ok(())
        } else {
            Err(Error::DbUnavailable)
        }
    }

    // ==================== Tips ====================

    /// Insert a new tip
    pub fn insert_tip(&self, tip: &Tip) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute(
            r#"
            INSERT INTO tips (id, semester, issue_type, description, course, tags, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                tip.id.to_string(),
                tip.semester,
                tip.issue_type,
                tip.description,
                tip.course,
                serde_json::to_string(&tip.tags)?,
                timestamp(&tip.created_at),
            ],
        ).map_err(|e| Error::database(format!("Failed to insert tip: {}", e)))?;

        Ok(())
    }

    /// Get a tip by id
    pub fn get_tip(&self, id: &Uuid) -> Result<Option<Tip>> {
        let conn = self.conn.lock();

        let tip = conn
            .query_row(
                "SELECT * FROM tips WHERE id = ?1",
                params![id.to_string()],
                row_to_tip,
            )
            .optional()
            .map_err(|e| Error::database(format!("Failed to get tip: {}", e)))?;

        Ok(tip)
    }

    /// List tips matching the filter, newest first
    pub fn list_tips(&self, filter: &TipFilter) -> Result<Vec<Tip>> {
        let conn = self.conn.lock();
        let (clause, mut args) = tip_where(filter);
        args.push(Value::Integer(filter.effective_limit() as i64));
        args.push(Value::Integer(filter.offset as i64));

        let sql = format!(
            "SELECT * FROM tips {} ORDER BY created_at DESC, id LIMIT ? OFFSET ?",
            clause
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| Error::database(format!("Failed to prepare query: {}", e)))?;

        let tips = stmt
            .query_map(params_from_iter(args.iter()), row_to_tip)
            .map_err(|e| Error::database(format!("Failed to list tips: {}", e)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(tips)
    }

    /// Every stored tip, oldest first
    pub fn all_tips(&self) -> Result<Vec<Tip>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT * FROM tips ORDER BY created_at, id")?;
        let tips = stmt
            .query_map([], row_to_tip)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tips)
    }

    /// Count tips matching the filter (ignores limit/offset)
    pub fn count_tips(&self, filter: &TipFilter) -> Result<usize> {
        let conn = self.conn.lock();
        let (clause, args) = tip_where(filter);

        let count: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM tips {}", clause),
                params_from_iter(args.iter()),
                |row| row.get(0),
            )
            .map_err(|e| Error::database(format!("Failed to count tips: {}", e)))?;

        Ok(count as usize)
    }

    /// Delete a tip
    pub fn delete_tip(&self, id: &Uuid) -> Result<bool> {
        let conn = self.conn.lock();

        let count = conn
            .execute("DELETE FROM tips WHERE id = ?1", params![id.to_string()])
            .map_err(|e| Error::database(format!("Failed to delete tip: {}", e)))?;

        Ok(count > 0)
    }

    // ==================== Scraped pages ====================

    /// Insert a page, or replace the stored page with the same URL.
    ///
    /// Returns the stored page; its id is the one first assigned to the URL.
    pub fn upsert_scraped_page(&self, page: &ScrapedPage) -> Result<ScrapedPage> {
        let conn = self.conn.lock();

        conn.execute(
            r#"
            INSERT INTO scraped_pages (
                id, url, title, headings, paragraphs, content, metadata, source, tags, scraped_at, error
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                headings = excluded.headings,
                paragraphs = excluded.paragraphs,
                content = excluded.content,
                metadata = excluded.metadata,
                source = excluded.source,
                tags = excluded.tags,
                scraped_at = excluded.scraped_at,
                error = excluded.error
            "#,
            params![
                page.id.to_string(),
                page.url,
                page.title,
                serde_json::to_string(&page.headings)?,
                serde_json::to_string(&page.paragraphs)?,
                page.content,
                serde_json::to_string(&page.metadata)?,
                page.source,
                serde_json::to_string(&page.tags)?,
                timestamp(&page.scraped_at),
                page.error,
            ],
        ).map_err(|e| Error::database(format!("Failed to upsert page: {}", e)))?;

        conn.query_row(
            "SELECT * FROM scraped_pages WHERE url = ?1",
            params![page.url],
            row_to_page,
        )
        .map_err(|e| Error::database(format!("Failed to read back page: {}", e)))
    }

    /// Get a page by id
    pub fn get_scraped_page(&self, id: &Uuid) -> Result<Option<ScrapedPage>> {
        let conn = self.conn.lock();

        let page = conn
            .query_row(
                "SELECT * FROM scraped_pages WHERE id = ?1",
                params![id.to_string()],
                row_to_page,
            )
            .optional()?;

        Ok(page)
    }

    /// List all pages ordered by URL
    pub fn list_scraped_pages(&self) -> Result<Vec<ScrapedPage>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT * FROM scraped_pages ORDER BY url")?;
        let pages = stmt
            .query_map([], row_to_page)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(pages)
    }

    /// Number of stored pages
    pub fn count_scraped_pages(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM scraped_pages", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ==================== Knowledge base ====================

    /// Whether a knowledge record with this id exists
    pub fn knowledge_exists(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM knowledge WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    /// Insert knowledge records in one transaction
    pub fn insert_knowledge(&self, records: &[KnowledgeRecord]) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| Error::database(format!("Failed to start transaction: {}", e)))?;

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO knowledge (
                    id, topic, semester, source, content, origin, tags, chunk_index, total_chunks, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(id) DO UPDATE SET
                    topic = excluded.topic,
                    semester = excluded.semester,
                    source = excluded.source,
                    content = excluded.content,
                    origin = excluded.origin,
                    tags = excluded.tags,
                    chunk_index = excluded.chunk_index,
                    total_chunks = excluded.total_chunks,
                    created_at = excluded.created_at
                "#,
            )?;

            for record in records {
                inserted += stmt.execute(params![
                    record.id,
                    record.topic,
                    record.semester,
                    record.source.as_str(),
                    record.content,
                    record.origin,
                    serde_json::to_string(&record.tags)?,
                    record.chunk_index.map(i64::from),
                    record.total_chunks.map(i64::from),
                    timestamp(&record.created_at),
                ])?;
            }
        }

        tx.commit()
            .map_err(|e| Error::database(format!("Failed to commit knowledge: {}", e)))?;

        Ok(inserted)
    }

    /// Remove every record derived from an origin (page URL or tip id)
    pub fn delete_knowledge_by_origin(&self, origin: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let deleted = conn
            .execute("DELETE FROM knowledge WHERE origin = ?1", params![origin])
            .map_err(|e| Error::database(format!("Failed to delete knowledge: {}", e)))?;
        Ok(deleted)
    }

    /// Full-text search across the knowledge base, best match first
    pub fn search_knowledge(&self, query: &str, limit: usize) -> Result<Vec<ScoredRecord>> {
        let Some(fts_query) = fts_query(query) else {
            return Ok(Vec::new());
        };

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT k.*, bm25(knowledge_fts) AS score
            FROM knowledge_fts f
            JOIN knowledge k ON k.rowid = f.rowid
            WHERE knowledge_fts MATCH ?1
            ORDER BY score
            LIMIT ?2
            "#,
        ).map_err(|e| Error::database(format!("Failed to prepare FTS query: {}", e)))?;

        let results = stmt
            .query_map(params![fts_query, limit as i64], |row| {
                let record = row_to_knowledge(row)?;
                let score: f64 = row.get("score")?;
                // bm25 is negative, lower is better
                Ok(ScoredRecord { record, score: -score })
            })
            .map_err(|e| Error::database(format!("Failed to execute FTS query: {}", e)))?;

        let mut records = Vec::new();
        for result in results {
            match result {
                Ok(r) => records.push(r),
                Err(e) => tracing::warn!("Error reading search result: {}", e),
            }
        }

        Ok(records)
    }

    /// List knowledge records, newest first
    pub fn list_knowledge(&self, filter: &KnowledgeFilter) -> Result<Vec<KnowledgeRecord>> {
        let conn = self.conn.lock();

        let mut clauses = Vec::new();
        let mut args: Vec<Value> = Vec::new();
        if let Some(topic) = filter.topic.as_deref().filter(|t| !t.is_empty()) {
            clauses.push("lower(topic) = lower(?)");
            args.push(Value::Text(topic.trim().to_string()));
        }
        if let Some(source) = filter.source {
            clauses.push("source = ?");
            args.push(Value::Text(source.as_str().to_string()));
        }
        let clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        args.push(Value::Integer(filter.limit.max(1) as i64));

        let sql = format!(
            "SELECT * FROM knowledge {} ORDER BY created_at DESC, id LIMIT ?",
            clause
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(args.iter()), row_to_knowledge)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    /// Newest knowledge records regardless of topic or source
    pub fn recent_knowledge(&self, limit: usize) -> Result<Vec<KnowledgeRecord>> {
        self.list_knowledge(&KnowledgeFilter {
            limit,
            ..Default::default()
        })
    }

    /// All official records, for conflict detection
    pub fn official_knowledge(&self) -> Result<Vec<KnowledgeRecord>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT * FROM knowledge WHERE source = 'official' ORDER BY id")?;
        let records = stmt
            .query_map([], row_to_knowledge)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Counts per source
    pub fn knowledge_stats(&self) -> Result<KnowledgeStats> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT source, COUNT(*) FROM knowledge GROUP BY source")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stats = KnowledgeStats::default();
        for (source, count) in rows {
            let count = count as usize;
            stats.total += count;
            match SourceKind::parse(&source) {
                Some(SourceKind::Official) => stats.official += count,
                Some(SourceKind::Student) => stats.student += count,
                None => tracing::warn!("Unknown knowledge source '{}'", source),
            }
        }
        Ok(stats)
    }

    // ==================== Chat ====================

    /// Store a chat message
    pub fn insert_chat_message(&self, message: &ChatMessage) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO chat_messages (id, conversation_id, role, message, created_at, metadata)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                message.id.to_string(),
                message.conversation_id,
                message.role.as_str(),
                message.message,
                timestamp(&message.created_at),
                serde_json::to_string(&message.metadata)?,
            ],
        ).map_err(|e| Error::database(format!("Failed to insert chat message: {}", e)))?;
        Ok(())
    }

    /// Messages of a conversation, oldest first
    pub fn conversation(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT * FROM chat_messages WHERE conversation_id = ?1 ORDER BY created_at, rowid",
        )?;
        let messages = stmt
            .query_map(params![conversation_id], row_to_chat_message)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(messages)
    }

    // ==================== Conflicts ====================

    /// Store a conflict; returns false when the same pair and kind was already recorded
    pub fn insert_conflict(&self, conflict: &Conflict) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn.execute(
            r#"
            INSERT OR IGNORE INTO conflicts (
                id, pair_key, topic, kind, left_id, left_value, left_excerpt,
                right_id, right_value, right_excerpt, detected_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                conflict.id.to_string(),
                conflict.pair_key(),
                conflict.topic,
                conflict.kind.as_str(),
                conflict.left_id,
                conflict.left_value,
                conflict.left_excerpt,
                conflict.right_id,
                conflict.right_value,
                conflict.right_excerpt,
                timestamp(&conflict.detected_at),
            ],
        ).map_err(|e| Error::database(format!("Failed to insert conflict: {}", e)))?;
        Ok(count > 0)
    }

    /// Delete stored conflicts whose pair is not among `current`; returns the number removed
    pub fn prune_conflicts(&self, current: &[String]) -> Result<usize> {
        let conn = self.conn.lock();
        let removed = conn.execute(
            "DELETE FROM conflicts WHERE pair_key NOT IN (SELECT value FROM json_each(?1))",
            params![serde_json::to_string(current)?],
        ).map_err(|e| Error::database(format!("Failed to prune conflicts: {}", e)))?;
        Ok(removed)
    }

    /// Stored conflicts, newest first
    pub fn list_conflicts(&self, topic: Option<&str>) -> Result<Vec<Conflict>> {
        let conn = self.conn.lock();
        let conflicts = match topic {
            Some(topic) => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM conflicts WHERE topic = lower(?1) ORDER BY detected_at DESC, id",
                )?;
                let rows = stmt.query_map(params![topic], row_to_conflict)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt =
                    conn.prepare("SELECT * FROM conflicts ORDER BY detected_at DESC, id")?;
                let rows = stmt.query_map([], row_to_conflict)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(conflicts)
    }
}

// Helper functions

/// Fixed-width RFC 3339 so text ordering matches time ordering
fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn parse_timestamp(row: &Row, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    let idx = row.as_ref().column_index(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn parse_uuid(row: &Row, column: &str) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(column)?;
    let idx = row.as_ref().column_index(column)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn parse_json<T: DeserializeOwned>(row: &Row, column: &str) -> rusqlite::Result<T> {
    let raw: String = row.get(column)?;
    let idx = row.as_ref().column_index(column)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn row_to_tip(row: &Row) -> rusqlite::Result<Tip> {
    Ok(Tip {
        id: parse_uuid(row, "id")?,
        semester: row.get("semester")?,
        issue_type: row.get("issue_type")?,
        description: row.get("description")?,
        course: row.get("course")?,
        tags: parse_json(row, "tags")?,
        created_at: parse_timestamp(row, "created_at")?,
    })
}

fn row_to_page(row: &Row) -> rusqlite::Result<ScrapedPage> {
    Ok(ScrapedPage {
        id: parse_uuid(row, "id")?,
        url: row.get("url")?,
        title: row.get("title")?,
        headings: parse_json(row, "headings")?,
        paragraphs: parse_json(row, "paragraphs")?,
        content: row.get("content")?,
        metadata: parse_json(row, "metadata")?,
        source: row.get("source")?,
        tags: parse_json(row, "tags")?,
        scraped_at: parse_timestamp(row, "scraped_at")?,
        error: row.get("error")?,
    })
}

fn row_to_knowledge(row: &Row) -> rusqlite::Result<KnowledgeRecord> {
    let source: String = row.get("source")?;
    let source = SourceKind::parse(&source).unwrap_or(SourceKind::Official);
    let chunk_index: Option<i64> = row.get("chunk_index")?;
    let total_chunks: Option<i64> = row.get("total_chunks")?;

    Ok(KnowledgeRecord {
        id: row.get("id")?,
        topic: row.get("topic")?,
        semester: row.get("semester")?,
        source,
        content: row.get("content")?,
        origin: row.get("origin")?,
        tags: parse_json(row, "tags")?,
        chunk_index: chunk_index.map(|c| c as u32),
        total_chunks: total_chunks.map(|c| c as u32),
        created_at: parse_timestamp(row, "created_at")?,
    })
}

fn row_to_chat_message(row: &Row) -> rusqlite::Result<ChatMessage> {
    let role: String = row.get("role")?;
    Ok(ChatMessage {
        id: parse_uuid(row, "id")?,
        conversation_id: row.get("conversation_id")?,
        role: ChatRole::parse(&role).unwrap_or(ChatRole::User),
        message: row.get("message")?,
        created_at: parse_timestamp(row, "created_at")?,
        metadata: parse_json(row, "metadata")?,
    })
}

fn row_to_conflict(row: &Row) -> rusqlite::Result<Conflict> {
    let kind: String = row.get("kind")?;
    let idx = row.as_ref().column_index("kind")?;
    let kind = FactKind::parse(&kind).ok_or_else(|| {
        conversion_error(
            idx,
            std::io::Error::new(std::io::ErrorKind::InvalidData, format!("unknown kind {}", kind)),
        )
    })?;

    Ok(Conflict {
        id: parse_uuid(row, "id")?,
        topic: row.get("topic")?,
        kind,
        left_id: row.get("left_id")?,
        left_value: row.get("left_value")?,
        left_excerpt: row.get("left_excerpt")?,
        right_id: row.get("right_id")?,
        right_value: row.get("right_value")?,
        right_excerpt: row.get("right_excerpt")?,
        detected_at: parse_timestamp(row, "detected_at")?,
    })
}

/// WHERE clause and positional arguments for a tip filter
fn tip_where(filter: &TipFilter) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut args = Vec::new();

    if let Some(semester) = filter.semester.as_deref().filter(|s| !s.is_empty()) {
        clauses.push("lower(semester) = lower(?)");
        args.push(Value::Text(semester.trim().to_string()));
    }
    if let Some(issue_type) = filter.issue_type.as_deref().filter(|s| !s.is_empty()) {
        clauses.push("lower(issue_type) = lower(?)");
        args.push(Value::Text(issue_type.trim().to_string()));
    }
    if let Some(tag) = filter.tag.as_deref().filter(|s| !s.is_empty()) {
        clauses.push("EXISTS (SELECT 1 FROM json_each(tips.tags) WHERE json_each.value = ?)");
        args.push(Value::Text(tag.trim().to_lowercase()));
    }

    if clauses.is_empty() {
        (String::new(), args)
    } else {
        (format!("WHERE {}", clauses.join(" AND ")), args)
    }
}

/// Turn free text into an FTS5 query of OR-ed quoted terms
fn fts_query(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(|t| format!("\"{}\"", t.to_lowercase()))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TipSubmission;

    fn tip(semester: &str, issue_type: &str, description: &str, tags: &[&str]) -> Tip {
        TipSubmission {
            semester: semester.to_string(),
            issue_type: issue_type.to_string(),
            description: description.to_string(),
            course: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
        .into_tip()
        .unwrap()
    }

    fn page_record(id: &str, topic: &str, content: &str, origin: &str) -> KnowledgeRecord {
        KnowledgeRecord {
            id: id.to_string(),
            topic: topic.to_string(),
            semester: None,
            source: SourceKind::Official,
            content: content.to_string(),
            origin: origin.to_string(),
            tags: vec![],
            chunk_index: Some(0),
            total_chunks: Some(1),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_tip_roundtrip_and_filters() {
        let db = MentorDb::in_memory().unwrap();
        let a = tip("WS24/25", "Exams", "Register for exams early in QIS.", &["qis"]);
        let b = tip("SS25", "Housing", "Apply for the dorm before March.", &["wohnen"]);
        db.insert_tip(&a).unwrap();
        db.insert_tip(&b).unwrap();

        let stored = db.get_tip(&a.id).unwrap().unwrap();
        assert_eq!(stored.description, a.description);
        assert_eq!(stored.tags, vec!["qis"]);

        let by_semester = TipFilter {
            semester: Some("ws24/25".into()),
            ..Default::default()
        };
        let listed = db.list_tips(&by_semester).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, a.id);

        let by_tag = TipFilter {
            tag: Some("WOHNEN".into()),
            limit: 10,
            ..Default::default()
        };
        assert_eq!(db.count_tips(&by_tag).unwrap(), 1);
        assert_eq!(db.list_tips(&by_tag).unwrap()[0].id, b.id);

        assert_eq!(db.count_tips(&TipFilter::default()).unwrap(), 2);
        assert!(db.delete_tip(&a.id).unwrap());
        assert!(!db.delete_tip(&a.id).unwrap());
    }

    #[test]
    fn test_page_upsert_keeps_first_id() {
        let db = MentorDb::in_memory().unwrap();
        let mut page = ScrapedPage::failed(
            "https://www.h-da.de/studium".into(),
            "www.h-da.de".into(),
            vec!["studium".into()],
            "timeout".into(),
        );
        let first = db.upsert_scraped_page(&page).unwrap();

        page.id = Uuid::new_v4();
        page.error = None;
        page.content = "Studium an der h_da".into();
        let second = db.upsert_scraped_page(&page).unwrap();

        assert_eq!(first.id, second.id);
        assert!(second.is_ok());
        assert_eq!(db.count_scraped_pages().unwrap(), 1);
    }

    #[test]
    fn test_knowledge_search_and_delete() {
        let db = MentorDb::in_memory().unwrap();
        db.insert_knowledge(&[
            page_record("page_1_chunk_0", "Bewerbung", "Die Bewerbungsfrist endet am 15.07.2025.", "https://x/a"),
            page_record("page_2_chunk_0", "Mensa", "Die Mensa öffnet um 11 Uhr.", "https://x/b"),
        ])
        .unwrap();

        let hits = db.search_knowledge("Wann endet die Bewerbungsfrist?", 5).unwrap();
        assert_eq!(hits[0].record.id, "page_1_chunk_0");
        assert!(hits[0].score > 0.0);

        assert!(db.search_knowledge("?!", 5).unwrap().is_empty());

        assert_eq!(db.delete_knowledge_by_origin("https://x/a").unwrap(), 1);
        assert!(db.search_knowledge("Bewerbungsfrist", 5).unwrap().is_empty());
        assert!(!db.knowledge_exists("page_1_chunk_0").unwrap());
        assert_eq!(db.knowledge_stats().unwrap().official, 1);
    }

    #[test]
    fn test_conflict_dedup() {
        let db = MentorDb::in_memory().unwrap();
        let conflict = Conflict {
            id: Uuid::new_v4(),
            topic: "bewerbung".into(),
            kind: FactKind::Deadline,
            left_id: "a".into(),
            left_value: "2025-07-15".into(),
            left_excerpt: "..".into(),
            right_id: "b".into(),
            right_value: "2025-06-01".into(),
            right_excerpt: "..".into(),
            detected_at: Utc::now(),
        };
        assert!(db.insert_conflict(&conflict).unwrap());

        let mut mirrored = conflict.clone();
        mirrored.id = Uuid::new_v4();
        std::mem::swap(&mut mirrored.left_id, &mut mirrored.right_id);
        assert!(!db.insert_conflict(&mirrored).unwrap());

        assert_eq!(db.list_conflicts(Some("Bewerbung")).unwrap().len(), 1);
    }

    #[test]
    fn test_knowledge_replace_updates_search_index() {
        let db = MentorDb::in_memory().unwrap();
        db.insert_knowledge(&[page_record(
            "page_1_chunk_0",
            "Bewerbung",
            "Die Bewerbungsfrist endet am 15.07.2025.",
            "https://x/a",
        )])
        .unwrap();

        db.insert_knowledge(&[page_record(
            "page_1_chunk_0",
            "Bewerbung",
            "Die Einschreibung beginnt im August.",
            "https://x/a",
        )])
        .unwrap();

        assert!(db.search_knowledge("Bewerbungsfrist", 5).unwrap().is_empty());
        let hits = db.search_knowledge("Einschreibung", 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.id, "page_1_chunk_0");
        assert_eq!(hits[0].record.content, "Die Einschreibung beginnt im August.");
        assert_eq!(db.knowledge_stats().unwrap().official, 1);
    }

    #[test]
    fn test_prune_conflicts_keeps_current_pairs() {
        let db = MentorDb::in_memory().unwrap();
        let conflict = |left: &str, right: &str| Conflict {
            id: Uuid::new_v4(),
            topic: "bewerbung".into(),
            kind: FactKind::Deadline,
            left_id: left.into(),
            left_value: "2025-07-15".into(),
            left_excerpt: "..".into(),
            right_id: right.into(),
            right_value: "2025-06-01".into(),
            right_excerpt: "..".into(),
            detected_at: Utc::now(),
        };
        let kept = conflict("a", "b");
        let stale = conflict("a", "c");
        db.insert_conflict(&kept).unwrap();
        db.insert_conflict(&stale).unwrap();

        assert_eq!(db.prune_conflicts(&[kept.pair_key()]).unwrap(), 1);
        let listed = db.list_conflicts(None).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].right_id, "b");

        assert_eq!(db.prune_conflicts(&[]).unwrap(), 1);
        assert!(db.list_conflicts(None).unwrap().is_empty());
    }

    #[test]
    fn test_conversation_order() {
        let db = MentorDb::in_memory().unwrap();
        let q = ChatMessage::new("c1", ChatRole::User, "Hi");
        let a = ChatMessage::new("c1", ChatRole::Assistant, "Hello").with_metadata("provider", "mock");
        db.insert_chat_message(&q).unwrap();
        db.insert_chat_message(&a).unwrap();

        let convo = db.conversation("c1").unwrap();
        assert_eq!(convo.len(), 2);
        assert_eq!(convo[0].role, ChatRole::User);
        assert_eq!(convo[1].metadata.get("provider").map(String::as_str), Some("mock"));
    }

    #[test]
    fn test_ping() {
        assert!(MentorDb::in_memory().unwrap().ping().is_ok());
    }
}
