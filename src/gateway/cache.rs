//! Semantic-search response cache
//!
//! Keyed by the normalized query text, holding the external service's
//! ranked pattern ids. Entries expire after the configured TTL; an expired
//! entry is logically absent and is replaced by the next fresh write.
//! Concurrent writers for the same key race harmlessly: the value is a
//! pure function of the query, so last-writer-wins loses nothing.

use rusqlite::{params, OptionalExtension};

use crate::catalog::CatalogStore;
use crate::error::Result;
use crate::schema::fnv1a_hash;

/// Normalize query text: trim, lowercase, collapse runs of whitespace
pub fn normalize_query(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Cache key for a normalized query
pub fn cache_key(normalized: &str) -> String {
    format!("{:016x}", fnv1a_hash(normalized))
}

/// Current unix time in seconds
pub fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Look up a cached result, honoring the TTL
///
/// Expired rows are deleted on sight so the table does not accumulate
/// stale entries.
pub fn lookup(
    store: &CatalogStore,
    key: &str,
    ttl_secs: u64,
    now: i64,
) -> Result<Option<Vec<i64>>> {
    let conn = store.conn();
    let row: Option<(String, i64)> = conn
        .query_row(
            "SELECT pattern_ids, created_at FROM llm_cache WHERE query_key = ?1",
            params![key],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match row {
        Some((ids, created_at)) if now - created_at < ttl_secs as i64 => {
            Ok(Some(serde_json::from_str(&ids)?))
        }
        Some(_) => {
            conn.execute("DELETE FROM llm_cache WHERE query_key = ?1", params![key])?;
            Ok(None)
        }
        None => Ok(None),
    }
}

/// Store a result for a query
pub fn put(
    store: &CatalogStore,
    key: &str,
    query: &str,
    pattern_ids: &[i64],
    now: i64,
) -> Result<()> {
    let ids = serde_json::to_string(pattern_ids)?;
    let conn = store.conn();
    conn.execute(
        r#"
        INSERT INTO llm_cache (query_key, query, pattern_ids, created_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(query_key) DO UPDATE SET
            query = excluded.query,
            pattern_ids = excluded.pattern_ids,
            created_at = excluded.created_at
        "#,
        params![key, query, ids, now],
    )?;
    Ok(())
}
