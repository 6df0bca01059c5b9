//! Persisted per-CID metadata records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Name given to rows created implicitly (favorite toggles, preloads, accesses)
pub const UNKNOWN_NAME: &str = "Unknown";

/// Metadata tracked for one CID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub cid: String,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub access_count: u32,
    pub last_accessed: DateTime<Utc>,
    pub is_favorite: bool,
    pub tags: BTreeSet<String>,
    /// Backing file, if a local copy has been downloaded
    pub local_path: Option<PathBuf>,
    pub notes: String,
}

impl CacheEntry {
    /// Entry with the given name and every other field at its default
    pub fn new(cid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            cid: cid.into(),
            name: name.into(),
            size: 0,
            mime_type: String::new(),
            access_count: 0,
            last_accessed: now_millis(),
            is_favorite: false,
            tags: BTreeSet::new(),
            local_path: None,
            notes: String::new(),
        }
    }

    /// Row created when a CID is first touched without a known name
    pub fn placeholder(cid: impl Into<String>) -> Self {
        Self::new(cid, UNKNOWN_NAME)
    }

    /// Case-insensitive substring match over name and individual tags
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(&needle))
    }
}

/// Metadata handed over by the upload flow for a freshly published CID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub cid: String,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

/// Join tags for the `tags` column
pub(crate) fn join_tags(tags: &BTreeSet<String>) -> String {
    tags.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

/// Split the `tags` column; empty segments are dropped
pub(crate) fn split_tags(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalize caller-supplied tags so they survive the comma-joined column
pub fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .flat_map(|tag| split_tags(tag.as_ref()))
        .collect()
}

/// Current time truncated to the millisecond precision the store keeps
pub(crate) fn now_millis() -> DateTime<Utc> {
    from_millis(Utc::now().timestamp_millis())
}

pub(crate) fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}
