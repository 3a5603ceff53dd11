//! Pattern catalog storage
//!
//! SQLite-backed store for deduplicated patterns, the semantic-search
//! response cache, and the daily cost ledger. One database file, WAL mode,
//! FTS5 for free-text recall. Writes go through a single connection behind
//! a mutex; the insert-or-increment dedup is one conditional upsert so two
//! concurrent extractions of the same fingerprint can never both insert.

pub mod query;

use std::path::Path;

use parking_lot::{Mutex, MutexGuard};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{OrgMineError, Result};
use crate::schema::{Category, MetaNode, NewPattern, Pattern, PatternSummary};

pub use query::{PatternFilter, PatternPage};

/// Outcome of the atomic insert-or-increment dedup write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupOutcome {
    /// First time this fingerprint was seen; a new row was created
    Inserted { id: i64 },
    /// The fingerprint already existed; its use count was bumped
    Incremented { id: i64, use_count: i64 },
}

/// SQLite-backed pattern catalog
pub struct CatalogStore {
    conn: Mutex<Connection>,
}

impl CatalogStore {
    /// Open (or create) the catalog at the given path
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        // WAL lets readers proceed while the single writer commits; the
        // pragma answers with the resulting mode, so read it as a row
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Self { conn: Mutex::new(conn) };
        store.init_schema()?;
        Ok(store)
    }

    /// Open an in-memory catalog (tests and dry runs)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn: Mutex::new(conn) };
        store.init_schema()?;
        Ok(store)
    }

    /// Flush and close the underlying connection
    pub fn close(self) -> Result<()> {
        let conn = self.conn.into_inner();
        conn.close().map_err(|(_, e)| OrgMineError::Storage(e))
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    fn init_schema(&self) -> Result<()> {
        self.conn().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS patterns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                pattern_type TEXT NOT NULL,
                category TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                source_object TEXT NOT NULL DEFAULT 'Unknown',
                source_file TEXT NOT NULL DEFAULT '',
                api_version TEXT NOT NULL DEFAULT '',
                complexity_score INTEGER NOT NULL DEFAULT 1,
                field_references TEXT NOT NULL DEFAULT '[]',
                tags TEXT NOT NULL DEFAULT '[]',
                structure TEXT NOT NULL,
                fingerprint TEXT NOT NULL UNIQUE,
                favorited INTEGER NOT NULL DEFAULT 0,
                use_count INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_patterns_category_type
                ON patterns(category, pattern_type);
            CREATE INDEX IF NOT EXISTS idx_patterns_complexity
                ON patterns(complexity_score);
            CREATE VIRTUAL TABLE IF NOT EXISTS patterns_fts USING fts5(
                name,
                description,
                tags,
                source_object,
                pattern_type,
                row_id UNINDEXED
            );
            CREATE TABLE IF NOT EXISTS llm_cache (
                query_key TEXT PRIMARY KEY,
                query TEXT NOT NULL,
                pattern_ids TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS cost_ledger (
                day TEXT PRIMARY KEY,
                cumulative_cost REAL NOT NULL DEFAULT 0,
                request_count INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )?;
        Ok(())
    }

    /// Insert a pattern, or bump the use count of the row already holding
    /// its fingerprint
    ///
    /// This is the system's one transactional primitive: a single
    /// conditional upsert, so the check and the write cannot be split by a
    /// concurrent writer. All other fields of an existing row are left
    /// untouched.
    pub fn insert_or_increment(&self, pattern: &NewPattern) -> Result<DedupOutcome> {
        let structure = serde_json::to_string(&pattern.structure)?;
        let field_references = serde_json::to_string(&pattern.field_references)?;
        let tags = serde_json::to_string(&pattern.tags)?;
        let created_at = chrono::Utc::now().to_rfc3339();

        let conn = self.conn();
        let (id, use_count): (i64, i64) = conn
            .query_row(
                r#"
                INSERT INTO patterns (
                    pattern_type, category, name, description, source_object,
                    source_file, api_version, complexity_score,
                    field_references, tags, structure, fingerprint, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                ON CONFLICT(fingerprint) DO UPDATE SET use_count = use_count + 1
                RETURNING id, use_count
                "#,
                params![
                    pattern.pattern_type,
                    pattern.category.label(),
                    pattern.name,
                    pattern.description,
                    pattern.source_object,
                    pattern.source_file,
                    pattern.api_version,
                    pattern.complexity_score,
                    field_references,
                    tags,
                    structure,
                    pattern.fingerprint,
                    created_at,
                ],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(f, _)
                    if f.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    OrgMineError::StorageIntegrity {
                        message: format!(
                            "fingerprint {} violated uniqueness outside the dedup upsert",
                            pattern.fingerprint
                        ),
                    }
                }
                other => OrgMineError::Storage(other),
            })?;

        if use_count == 1 {
            // Fresh row: index it for free-text recall
            conn.execute(
                r#"
                INSERT INTO patterns_fts (name, description, tags, source_object, pattern_type, row_id)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    pattern.name,
                    pattern.description,
                    pattern.tags.join(" "),
                    pattern.source_object,
                    pattern.pattern_type,
                    id,
                ],
            )?;
            Ok(DedupOutcome::Inserted { id })
        } else {
            Ok(DedupOutcome::Incremented { id, use_count })
        }
    }

    /// Fetch a full pattern by id
    pub fn get(&self, id: i64) -> Result<Option<Pattern>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                &format!("SELECT {PATTERN_COLUMNS} FROM patterns WHERE id = ?1"),
                params![id],
                row_to_pattern,
            )
            .optional()?;
        Ok(row)
    }

    /// Toggle the favorite flag; returns the new state, or None for an
    /// unknown id
    pub fn toggle_favorite(&self, id: i64) -> Result<Option<bool>> {
        let conn = self.conn();
        let state = conn
            .query_row(
                "UPDATE patterns SET favorited = NOT favorited WHERE id = ?1 RETURNING favorited",
                params![id],
                |row| row.get::<_, bool>(0),
            )
            .optional()?;
        Ok(state)
    }

    /// Lightweight summaries for the semantic gateway's candidate context
    pub fn summaries(&self, limit: usize) -> Result<Vec<PatternSummary>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PATTERN_COLUMNS} FROM patterns ORDER BY use_count DESC, id ASC LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit as i64], row_to_pattern)?;
        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?.to_summary());
        }
        Ok(summaries)
    }

    /// Fetch summaries for specific ids, preserving the given order
    pub fn patterns_by_ids(&self, ids: &[i64]) -> Result<Vec<PatternSummary>> {
        let mut summaries = Vec::with_capacity(ids.len());
        for &id in ids {
            if let Some(pattern) = self.get(id)? {
                summaries.push(pattern.to_summary());
            }
        }
        Ok(summaries)
    }

    /// Aggregate catalog statistics
    pub fn stats(&self) -> Result<CatalogStats> {
        let conn = self.conn();
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM patterns", [], |r| r.get(0))?;
        let favorites: i64 =
            conn.query_row("SELECT COUNT(*) FROM patterns WHERE favorited", [], |r| r.get(0))?;

        let group = |sql: &str| -> Result<Vec<(String, i64)>> {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        };

        let by_category = group(
            "SELECT category, COUNT(*) FROM patterns GROUP BY category ORDER BY category",
        )?;
        let by_type = group(
            "SELECT pattern_type, COUNT(*) FROM patterns GROUP BY pattern_type ORDER BY pattern_type",
        )?;
        let by_complexity = group(
            "SELECT CAST(complexity_score AS TEXT), COUNT(*) FROM patterns GROUP BY complexity_score ORDER BY complexity_score",
        )?;
        let top_objects = group(
            "SELECT source_object, COUNT(*) FROM patterns GROUP BY source_object ORDER BY COUNT(*) DESC, source_object LIMIT 20",
        )?;

        Ok(CatalogStats {
            total_patterns: total,
            favorites,
            by_category,
            by_type,
            by_complexity,
            top_objects,
        })
    }
}

/// Aggregate counts for the stats interface
#[derive(Debug, Clone, serde::Serialize)]
pub struct CatalogStats {
    pub total_patterns: i64,
    pub favorites: i64,
    pub by_category: Vec<(String, i64)>,
    pub by_type: Vec<(String, i64)>,
    pub by_complexity: Vec<(String, i64)>,
    pub top_objects: Vec<(String, i64)>,
}

pub(crate) const PATTERN_COLUMNS: &str = "id, pattern_type, category, name, description, \
     source_object, source_file, api_version, complexity_score, field_references, tags, \
     structure, fingerprint, favorited, use_count, created_at";

pub(crate) fn row_to_pattern(row: &rusqlite::Row<'_>) -> rusqlite::Result<Pattern> {
    let category_label: String = row.get(2)?;
    let field_references: String = row.get(9)?;
    let tags: String = row.get(10)?;
    let structure: String = row.get(11)?;

    Ok(Pattern {
        id: row.get(0)?,
        pattern_type: row.get(1)?,
        category: Category::from_label(&category_label).unwrap_or(Category::ApexLogic),
        name: row.get(3)?,
        description: row.get(4)?,
        source_object: row.get(5)?,
        source_file: row.get(6)?,
        api_version: row.get(7)?,
        complexity_score: row.get(8)?,
        field_references: serde_json::from_str(&field_references).unwrap_or_default(),
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        structure: serde_json::from_str::<MetaNode>(&structure).unwrap_or_default(),
        fingerprint: row.get(12)?,
        favorited: row.get(13)?,
        use_count: row.get(14)?,
        created_at: row.get(15)?,
    })
}
