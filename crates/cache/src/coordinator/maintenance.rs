//! Preloading, eviction and metadata writes

use super::CacheCoordinator;
use crate::disk::validate_cid;
use crate::entry::{normalize_tags, now_millis, CacheEntry, ImageMetadata};
use crate::errors::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "path", rename_all = "lowercase")]
pub enum PreloadOutcome {
    /// The network policy did not allow a speculative download
    Skipped,
    Cached(PathBuf),
}

/// Summary of one prune pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneReport {
    pub bytes_before: u64,
    pub bytes_after: u64,
    pub limit: u64,
    pub removed: Vec<String>,
    pub favorites_kept: usize,
}

impl PruneReport {
    pub fn freed(&self) -> u64 {
        self.bytes_before.saturating_sub(self.bytes_after)
    }

    pub fn within_limit(&self) -> bool {
        self.bytes_after <= self.limit
    }
}

impl CacheCoordinator {
    /// Download `cid` ahead of demand when the network allows it
    pub async fn preload(&self, cid: &str) -> Result<PreloadOutcome> {
        self.preload_with_cancel(cid, &CancellationToken::new()).await
    }

    pub async fn preload_with_cancel(
        &self,
        cid: &str,
        cancel: &CancellationToken,
    ) -> Result<PreloadOutcome> {
        let inner = &self.inner;
        if inner.config.preload_requires_unmetered_network && !inner.network.is_unmetered() {
            tracing::info!(cid = %cid, "preload skipped on metered network");
            return Ok(PreloadOutcome::Skipped);
        }

        let path = self.fetch_with_cancel(cid, cancel).await?;
        inner.metadata.set_local_path(cid, &path).await?;
        inner.memory.invalidate_entry(cid);
        Ok(PreloadOutcome::Cached(path))
    }

    /// Delete the oldest non-favorite files until the cache fits in `max_bytes`
    ///
    /// Each deleted file also loses its recorded local path. Favorites are
    /// never deleted, so the result may stay above the limit when only
    /// favorites remain.
    pub async fn prune_to_limit(&self, max_bytes: u64) -> Result<PruneReport> {
        let inner = &self.inner;
        let mut files = inner.disk.list_files().await?;
        let bytes_before: u64 = files.iter().map(|f| f.size).sum();
        let mut report = PruneReport {
            bytes_before,
            bytes_after: bytes_before,
            limit: max_bytes,
            ..PruneReport::default()
        };
        if bytes_before <= max_bytes {
            tracing::debug!(total = bytes_before, limit = max_bytes, "cache within limit");
            return Ok(report);
        }

        let favorites = inner.metadata.favorite_cids().await?;
        files.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.cid.cmp(&b.cid)));

        let mut total = bytes_before;
        for file in files {
            if total <= max_bytes {
                break;
            }
            if favorites.contains(&file.cid) {
                report.favorites_kept += 1;
                continue;
            }
            let freed = inner.disk.remove(&file.cid).await?.unwrap_or(file.size);
            total = total.saturating_sub(freed);
            inner.metadata.clear_local_path(&file.cid).await?;
            inner.memory.forget(&file.cid);
            report.removed.push(file.cid);
        }
        report.bytes_after = total;

        if report.within_limit() {
            tracing::info!(
                removed = report.removed.len(),
                freed = report.freed(),
                total,
                limit = max_bytes,
                "pruned cache"
            );
        } else {
            tracing::warn!(
                total,
                limit = max_bytes,
                favorites = report.favorites_kept,
                "cache above limit, only favorites remain"
            );
        }
        Ok(report)
    }

    /// Prune against the configured `maxCacheSizeMB`
    pub async fn prune_to_configured_limit(&self) -> Result<PruneReport> {
        self.prune_to_limit(self.inner.config.max_cache_bytes()).await
    }

    /// Delete every non-favorite row together with its file
    ///
    /// Files with no row are not favorites and go too. Returns the number
    /// of CIDs removed.
    pub async fn clear_non_favorite_cache(&self) -> Result<usize> {
        let inner = &self.inner;
        let mut removed = HashSet::new();

        for entry in inner.metadata.list_recent().await? {
            if entry.is_favorite {
                continue;
            }
            inner.disk.remove(&entry.cid).await?;
            inner.metadata.delete(&entry.cid).await?;
            inner.memory.forget(&entry.cid);
            removed.insert(entry.cid);
        }

        let favorites = inner.metadata.favorite_cids().await?;
        for file in inner.disk.list_files().await? {
            if favorites.contains(&file.cid) || removed.contains(&file.cid) {
                continue;
            }
            inner.disk.remove(&file.cid).await?;
            inner.memory.forget(&file.cid);
            removed.insert(file.cid);
        }

        tracing::info!(removed = removed.len(), "cleared non-favorite cache");
        Ok(removed.len())
    }

    /// Wipe memory and every cached file, favorites included
    ///
    /// Rows are kept but no longer reference a local copy.
    pub async fn clear_cache(&self) -> Result<usize> {
        let inner = &self.inner;
        inner.memory.clear();
        let removed = inner.disk.clear().await?;
        inner.metadata.clear_all_local_paths().await?;
        tracing::info!(removed, "cleared cache");
        Ok(removed)
    }

    /// Remove the row, file and memory records for `cid`
    pub async fn delete(&self, cid: &str) -> Result<bool> {
        validate_cid(cid)?;
        let inner = &self.inner;
        let file = inner.disk.remove(cid).await?;
        let row = inner.metadata.delete(cid).await?;
        inner.memory.forget(cid);
        tracing::debug!(cid = %cid, file = file.is_some(), row, "deleted");
        Ok(file.is_some() || row)
    }

    pub async fn set_favorite(&self, cid: &str, favorite: bool) -> Result<CacheEntry> {
        validate_cid(cid)?;
        let entry = self.inner.metadata.set_favorite(cid, favorite).await?;
        self.inner.memory.invalidate_entry(cid);
        Ok(entry)
    }

    /// Replace the tag set of `cid`
    pub async fn set_tags<I, S>(&self, cid: &str, tags: I) -> Result<CacheEntry>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        validate_cid(cid)?;
        let entry = self.inner.metadata.set_tags(cid, normalize_tags(tags)).await?;
        self.inner.memory.invalidate_entry(cid);
        Ok(entry)
    }

    pub async fn set_notes(&self, cid: &str, notes: &str) -> Result<CacheEntry> {
        validate_cid(cid)?;
        let entry = self.inner.metadata.set_notes(cid, notes).await?;
        self.inner.memory.invalidate_entry(cid);
        Ok(entry)
    }

    /// Record details for a freshly uploaded CID and keep them in memory
    pub async fn cache_image_metadata(&self, image: ImageMetadata) -> Result<CacheEntry> {
        validate_cid(&image.cid)?;
        let entry = self.inner.metadata.upsert_image(image, now_millis()).await?;
        self.inner.memory.put_entry(entry.clone());
        Ok(entry)
    }
}
