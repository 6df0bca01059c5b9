//! Table layout and row mapping for `cache_entries`

use crate::entry::{from_millis, split_tags, CacheEntry};
use rusqlite::{Connection, Row};
use std::path::PathBuf;

pub(super) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    cid TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    size INTEGER NOT NULL DEFAULT 0,
    mime_type TEXT NOT NULL DEFAULT '',
    access_count INTEGER NOT NULL DEFAULT 0,
    last_accessed INTEGER NOT NULL,
    is_favorite INTEGER NOT NULL DEFAULT 0,
    tags TEXT NOT NULL DEFAULT '',
    local_path TEXT,
    notes TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_cache_entries_last_accessed ON cache_entries(last_accessed DESC);
CREATE INDEX IF NOT EXISTS idx_cache_entries_favorite ON cache_entries(is_favorite);
"#;

pub(super) const COLUMNS: &str =
    "cid, name, size, mime_type, access_count, last_accessed, is_favorite, tags, local_path, notes";

pub(super) fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}

/// Apply connection pragmas; memory databases ignore WAL
pub(super) fn configure(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    Ok(())
}

/// Map a row selected with [`COLUMNS`]
pub(super) fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<CacheEntry> {
    let size: i64 = row.get(2)?;
    let access_count: i64 = row.get(4)?;
    let last_accessed: i64 = row.get(5)?;
    let tags: String = row.get(7)?;
    let local_path: Option<String> = row.get(8)?;
    Ok(CacheEntry {
        cid: row.get(0)?,
        name: row.get(1)?,
        size: u64::try_from(size).unwrap_or(0),
        mime_type: row.get(3)?,
        access_count: u32::try_from(access_count).unwrap_or(u32::MAX),
        last_accessed: from_millis(last_accessed),
        is_favorite: row.get(6)?,
        tags: split_tags(&tags),
        local_path: local_path.filter(|p| !p.is_empty()).map(PathBuf::from),
        notes: row.get(9)?,
    })
}

pub(super) fn size_to_sql(size: u64) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}
