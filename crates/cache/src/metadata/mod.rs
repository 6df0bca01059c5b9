//! Persistent per-CID metadata backed by SQLite
//!
//! Every statement runs on the blocking pool while holding the single
//! connection lock, so each operation is atomic with respect to the
//! others. Writes that target a CID without a row create one with
//! defaults first.

mod schema;

use crate::entry::{join_tags, normalize_tags, CacheEntry, ImageMetadata, UNKNOWN_NAME};
use crate::errors::{CacheError, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};
use schema::{entry_from_row, size_to_sql, COLUMNS};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;

struct StoreInner {
    conn: Mutex<Option<Connection>>,
    /// Bumped after every successful write
    revision: watch::Sender<u64>,
    location: String,
}

/// Handle to the metadata database; clones share one connection
#[derive(Clone)]
pub struct MetadataStore {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataStore")
            .field("location", &self.inner.location)
            .field("open", &self.is_open())
            .finish()
    }
}

impl MetadataStore {
    /// Open (or create) the database file at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CacheError::filesystem(parent, "create database directory", e))?;
        }
        let location = path.display().to_string();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection> {
            let conn = Connection::open(&path).map_err(|e| CacheError::persistence("open", e))?;
            schema::configure(&conn).map_err(|e| CacheError::persistence("configure", e))?;
            schema::migrate(&conn).map_err(|e| CacheError::persistence("migrate", e))?;
            Ok(conn)
        })
        .await
        .map_err(|e| CacheError::persistence_message("open", format!("blocking task failed: {e}")))??;

        tracing::debug!(database = %location, "opened metadata store");
        Ok(Self::from_connection(conn, location))
    }

    /// Private in-memory database, mainly for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| CacheError::persistence("open", e))?;
        schema::migrate(&conn).map_err(|e| CacheError::persistence("migrate", e))?;
        Ok(Self::from_connection(conn, ":memory:".to_string()))
    }

    fn from_connection(conn: Connection, location: String) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(StoreInner {
                conn: Mutex::new(Some(conn)),
                revision,
                location,
            }),
        }
    }

    /// Close the connection; later calls fail with a persistence error
    pub fn close(&self) -> Result<()> {
        let conn = self.inner.conn.lock().take();
        if let Some(conn) = conn {
            conn.close()
                .map_err(|(_, e)| CacheError::persistence("close", e))?;
            tracing::debug!(database = %self.inner.location, "closed metadata store");
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.inner.conn.lock().is_some()
    }

    /// Receiver that changes after every write
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let guard = inner.conn.lock();
            let conn = guard
                .as_ref()
                .ok_or_else(|| CacheError::persistence_message(operation, "store is closed"))?;
            f(conn).map_err(|e| CacheError::persistence(operation, e))
        })
        .await
        .map_err(|e| CacheError::persistence_message(operation, format!("blocking task failed: {e}")))?
    }

    async fn mutate<T, F>(&self, operation: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let result = self.with_conn(operation, f).await?;
        self.inner.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
        Ok(result)
    }

    pub async fn get(&self, cid: &str) -> Result<Option<CacheEntry>> {
        let cid = cid.to_string();
        self.with_conn("get", move |conn| select_one(conn, &cid)).await
    }

    /// Rows for every listed CID that exists, in the order given
    pub async fn get_many(&self, cids: Vec<String>) -> Result<Vec<CacheEntry>> {
        self.with_conn("get many", move |conn| {
            let mut found = Vec::with_capacity(cids.len());
            for cid in &cids {
                if let Some(entry) = select_one(conn, cid)? {
                    found.push(entry);
                }
            }
            Ok(found)
        })
        .await
    }

    /// Insert a row, replacing any existing row for the same CID
    pub async fn insert(&self, entry: CacheEntry) -> Result<()> {
        self.mutate("insert", move |conn| {
            conn.execute(
                &format!(
                    "INSERT OR REPLACE INTO cache_entries ({COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                params![
                    entry.cid,
                    entry.name,
                    size_to_sql(entry.size),
                    entry.mime_type,
                    i64::from(entry.access_count),
                    entry.last_accessed.timestamp_millis(),
                    entry.is_favorite,
                    join_tags(&normalize_tags(&entry.tags)),
                    entry.local_path.as_ref().map(|p| p.display().to_string()),
                    entry.notes,
                ],
            )
            .map(|_| ())
        })
        .await
    }

    /// Overwrite an existing row; returns false when no row matched
    pub async fn update(&self, entry: CacheEntry) -> Result<bool> {
        self.mutate("update", move |conn| {
            let changed = conn.execute(
                "UPDATE cache_entries SET name = ?2, size = ?3, mime_type = ?4, access_count = ?5, \
                 last_accessed = ?6, is_favorite = ?7, tags = ?8, local_path = ?9, notes = ?10 \
                 WHERE cid = ?1",
                params![
                    entry.cid,
                    entry.name,
                    size_to_sql(entry.size),
                    entry.mime_type,
                    i64::from(entry.access_count),
                    entry.last_accessed.timestamp_millis(),
                    entry.is_favorite,
                    join_tags(&normalize_tags(&entry.tags)),
                    entry.local_path.as_ref().map(|p| p.display().to_string()),
                    entry.notes,
                ],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    pub async fn delete(&self, cid: &str) -> Result<bool> {
        let cid = cid.to_string();
        self.mutate("delete", move |conn| {
            Ok(conn.execute("DELETE FROM cache_entries WHERE cid = ?1", [&cid])? > 0)
        })
        .await
    }

    /// Every row, most recently accessed first
    pub async fn list_recent(&self) -> Result<Vec<CacheEntry>> {
        self.with_conn("list", |conn| {
            select_many(
                conn,
                &format!(
                    "SELECT {COLUMNS} FROM cache_entries ORDER BY last_accessed DESC, cid ASC"
                ),
            )
        })
        .await
    }

    pub async fn list_favorites(&self) -> Result<Vec<CacheEntry>> {
        self.with_conn("list favorites", |conn| {
            select_many(
                conn,
                &format!(
                    "SELECT {COLUMNS} FROM cache_entries WHERE is_favorite = 1 \
                     ORDER BY last_accessed DESC, cid ASC"
                ),
            )
        })
        .await
    }

    /// Case-insensitive substring search over names and individual tags
    pub async fn search(&self, query: &str) -> Result<Vec<CacheEntry>> {
        let query = query.trim().to_string();
        let entries = self.list_recent().await?;
        Ok(entries.into_iter().filter(|e| e.matches(&query)).collect())
    }

    pub async fn favorite_cids(&self) -> Result<HashSet<String>> {
        self.with_conn("list favorites", |conn| {
            let mut stmt = conn.prepare("SELECT cid FROM cache_entries WHERE is_favorite = 1")?;
            let cids = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<HashSet<_>>>()?;
            Ok(cids)
        })
        .await
    }

    pub async fn count(&self) -> Result<u64> {
        self.with_conn("count", |conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |r| r.get(0))?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
        .await
    }

    /// Increment the access counter and set `last_accessed` in one statement
    ///
    /// Creates a placeholder row when none exists. Returns the new count.
    pub async fn record_access(&self, cid: &str, at: DateTime<Utc>) -> Result<u32> {
        let cid = cid.to_string();
        self.mutate("record access", move |conn| {
            let count: i64 = conn.query_row(
                "INSERT INTO cache_entries (cid, name, access_count, last_accessed) \
                 VALUES (?1, ?2, 1, ?3) \
                 ON CONFLICT(cid) DO UPDATE SET \
                    access_count = access_count + 1, \
                    last_accessed = excluded.last_accessed \
                 RETURNING access_count",
                params![cid, UNKNOWN_NAME, at.timestamp_millis()],
                |row| row.get(0),
            )?;
            Ok(u32::try_from(count).unwrap_or(u32::MAX))
        })
        .await
    }

    /// Upsert the details produced by an upload and count it as an access
    pub async fn upsert_image(&self, image: ImageMetadata, at: DateTime<Utc>) -> Result<CacheEntry> {
        self.mutate("cache image metadata", move |conn| {
            conn.query_row(
                &format!(
                    "INSERT INTO cache_entries (cid, name, size, mime_type, access_count, last_accessed) \
                     VALUES (?1, ?2, ?3, ?4, 1, ?5) \
                     ON CONFLICT(cid) DO UPDATE SET \
                        name = excluded.name, \
                        size = excluded.size, \
                        mime_type = excluded.mime_type, \
                        access_count = access_count + 1, \
                        last_accessed = excluded.last_accessed \
                     RETURNING {COLUMNS}"
                ),
                params![
                    image.cid,
                    image.name,
                    size_to_sql(image.size),
                    image.mime_type,
                    at.timestamp_millis()
                ],
                entry_from_row,
            )
        })
        .await
    }

    /// Set the favorite flag, creating a default row when needed
    pub async fn set_favorite(&self, cid: &str, favorite: bool) -> Result<CacheEntry> {
        let cid = cid.to_string();
        self.upsert_column("set favorite", cid, "is_favorite", Value::Integer(i64::from(favorite)))
            .await
    }

    /// Record where the downloaded copy lives, creating a default row when needed
    pub async fn set_local_path(&self, cid: &str, path: &Path) -> Result<CacheEntry> {
        let cid = cid.to_string();
        let path = path.display().to_string();
        self.upsert_column("set local path", cid, "local_path", Value::Text(path))
            .await
    }

    pub async fn set_tags(&self, cid: &str, tags: BTreeSet<String>) -> Result<CacheEntry> {
        let cid = cid.to_string();
        self.upsert_column("set tags", cid, "tags", Value::Text(join_tags(&tags)))
            .await
    }

    pub async fn set_notes(&self, cid: &str, notes: &str) -> Result<CacheEntry> {
        let cid = cid.to_string();
        self.upsert_column("set notes", cid, "notes", Value::Text(notes.to_string()))
            .await
    }

    /// Forget the local copy of one row; returns false when nothing changed
    pub async fn clear_local_path(&self, cid: &str) -> Result<bool> {
        let cid = cid.to_string();
        self.mutate("clear local path", move |conn| {
            let changed = conn.execute(
                "UPDATE cache_entries SET local_path = NULL WHERE cid = ?1 AND local_path IS NOT NULL",
                [&cid],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    /// Forget every local copy, returning the number of rows changed
    pub async fn clear_all_local_paths(&self) -> Result<usize> {
        self.mutate("clear local paths", |conn| {
            conn.execute(
                "UPDATE cache_entries SET local_path = NULL WHERE local_path IS NOT NULL",
                [],
            )
        })
        .await
    }

    /// Upsert a single column, inserting a placeholder row first if needed
    async fn upsert_column(
        &self,
        operation: &'static str,
        cid: String,
        column: &'static str,
        value: Value,
    ) -> Result<CacheEntry> {
        let now = crate::entry::now_millis().timestamp_millis();
        self.mutate(operation, move |conn| {
            conn.execute(
                "INSERT INTO cache_entries (cid, name, last_accessed) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(cid) DO NOTHING",
                params![cid, UNKNOWN_NAME, now],
            )?;
            conn.execute(
                &format!("UPDATE cache_entries SET {column} = ?2 WHERE cid = ?1"),
                params![cid, value],
            )?;
            select_one(conn, &cid)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
        })
        .await
    }
}

fn select_one(conn: &Connection, cid: &str) -> rusqlite::Result<Option<CacheEntry>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM cache_entries WHERE cid = ?1"),
        [cid],
        entry_from_row,
    )
    .optional()
}

fn select_many(conn: &Connection, sql: &str) -> rusqlite::Result<Vec<CacheEntry>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], entry_from_row)?;
    rows.collect()
}

#[cfg(test)]
mod tests;
