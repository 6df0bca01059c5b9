//! Read-side queries over the metadata store

use super::resolve::is_valid_file;
use super::CacheCoordinator;
use crate::disk::{validate_cid, DiskStore};
use crate::entry::CacheEntry;
use crate::errors::Result;
use crate::gateway::{check_all, GatewayHealth};
use pincache_utils::tracing::cache_event;
use serde::Serialize;

/// An entry paired with the URL to display it from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedItem {
    pub entry: CacheEntry,
    /// Local file URL when a valid copy exists, else the default gateway URL
    pub display_url: String,
    pub is_local: bool,
}

impl CacheCoordinator {
    /// Metadata for `cid`, served from memory when possible
    pub async fn entry(&self, cid: &str) -> Result<Option<CacheEntry>> {
        validate_cid(cid)?;
        if let Some(entry) = self.inner.memory.entry(cid) {
            cache_event(cid, true, "memory_metadata");
            return Ok(Some(entry));
        }
        let entry = self.inner.metadata.get(cid).await?;
        if let Some(entry) = &entry {
            self.inner.memory.put_entry(entry.clone());
        }
        Ok(entry)
    }

    /// All entries, most recently accessed first
    pub async fn entries(&self) -> Result<Vec<CacheEntry>> {
        self.inner.metadata.list_recent().await
    }

    pub async fn favorites(&self) -> Result<Vec<CacheEntry>> {
        self.inner.metadata.list_favorites().await
    }

    /// Case-insensitive substring search over names and tags
    pub async fn search(&self, query: &str) -> Result<Vec<CacheEntry>> {
        self.inner.metadata.search(query).await
    }

    /// Entries for the listed CIDs that have a row, in the given order
    pub async fn entries_for<I, S>(&self, cids: I) -> Result<Vec<CacheEntry>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cids = cids.into_iter().map(Into::into).collect();
        self.inner.metadata.get_many(cids).await
    }

    pub async fn count(&self) -> Result<u64> {
        self.inner.metadata.count().await
    }

    /// Bytes currently held in the cache directory
    pub async fn disk_usage(&self) -> Result<u64> {
        self.inner.disk.total_bytes().await
    }

    /// Every entry with a URL suitable for display
    pub async fn cached_items(&self) -> Result<Vec<CachedItem>> {
        let entries = self.inner.metadata.list_recent().await?;
        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            let local = match &entry.local_path {
                Some(path) if is_valid_file(path).await => Some(DiskStore::file_url(path)),
                _ => None,
            };
            let (display_url, is_local) = match local {
                Some(url) => (url, true),
                None => (self.default_gateway_url(&entry.cid)?, false),
            };
            items.push(CachedItem {
                entry,
                display_url,
                is_local,
            });
        }
        Ok(items)
    }

    /// Probe every gateway with the configured test CID
    pub async fn check_gateways(&self) -> Vec<GatewayHealth> {
        let inner = &self.inner;
        let results = check_all(
            &inner.registry,
            &inner.client,
            &inner.config.health_check_cid,
            inner.config.slow_gateway_threshold(),
        )
        .await;
        tracing::info!(
            reachable = results.iter().filter(|h| h.response_time_ms.is_some()).count(),
            total = results.len(),
            "gateway health check complete"
        );
        results
    }
}
