//! Disk layer: one file per CID under a single cache directory
//!
//! Files are named by their CID. Downloads land in a hidden `.part` file
//! in the same directory and are renamed into place only once complete,
//! so a visible file is always a whole body.

mod partial;

pub use partial::PartialFile;

use crate::errors::{CacheError, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;

const PART_SUFFIX: &str = ".part";

/// A cached content file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskFile {
    pub cid: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Open the store, creating `root` and sweeping interrupted downloads
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root)
            .await
            .map_err(|e| CacheError::filesystem(root, "create cache directory", e))?;
        let root = fs::canonicalize(root)
            .await
            .map_err(|e| CacheError::filesystem(root, "resolve cache directory", e))?;

        let store = Self { root };
        let swept = store.sweep_partials().await?;
        if swept > 0 {
            tracing::info!(count = swept, dir = %store.root.display(), "removed interrupted downloads");
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the file for `cid`, whether or not it exists
    pub fn path_for(&self, cid: &str) -> Result<PathBuf> {
        validate_cid(cid)?;
        Ok(self.root.join(cid))
    }

    /// Path of the cached file for `cid` if present and non-empty
    pub async fn cached_file(&self, cid: &str) -> Result<Option<PathBuf>> {
        let path = self.path_for(cid)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(Some(path)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::filesystem(path, "stat cached file", e)),
        }
    }

    pub async fn is_cached(&self, cid: &str) -> Result<bool> {
        Ok(self.cached_file(cid).await?.is_some())
    }

    /// Start writing a new copy of `cid`
    pub async fn begin_write(&self, cid: &str) -> Result<PartialFile> {
        let target = self.path_for(cid)?;
        let temp = self
            .root
            .join(format!(".{cid}.{}{PART_SUFFIX}", uuid::Uuid::new_v4()));
        PartialFile::create(temp, target).await
    }

    /// Every visible file in the cache directory
    pub async fn list_files(&self) -> Result<Vec<DiskFile>> {
        let mut dir = fs::read_dir(&self.root)
            .await
            .map_err(|e| CacheError::filesystem(&self.root, "list cache directory", e))?;

        let mut files = Vec::new();
        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| CacheError::filesystem(&self.root, "list cache directory", e))?
        {
            let Ok(cid) = item.file_name().into_string() else {
                continue;
            };
            if cid.starts_with('.') {
                continue;
            }
            let meta = match item.metadata().await {
                Ok(meta) if meta.is_file() => meta,
                Ok(_) => continue,
                // Removed concurrently
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(CacheError::filesystem(item.path(), "stat cached file", e)),
            };
            let modified = meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            files.push(DiskFile {
                cid,
                path: item.path(),
                size: meta.len(),
                modified,
            });
        }
        Ok(files)
    }

    /// Sum of all visible file sizes
    pub async fn total_bytes(&self) -> Result<u64> {
        Ok(self.list_files().await?.iter().map(|f| f.size).sum())
    }

    /// Delete the file for `cid`, returning the bytes freed if it existed
    pub async fn remove(&self, cid: &str) -> Result<Option<u64>> {
        let path = self.path_for(cid)?;
        let size = match fs::metadata(&path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::filesystem(path, "stat cached file", e)),
        };
        match fs::remove_file(&path).await {
            Ok(()) => Ok(Some(size)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::filesystem(path, "remove cached file", e)),
        }
    }

    /// Delete every visible file, returning how many were removed
    pub async fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for file in self.list_files().await? {
            if self.remove(&file.cid).await?.is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// `file://` URL for a local path
    pub fn file_url(path: &Path) -> String {
        url::Url::from_file_path(path)
            .map(String::from)
            .unwrap_or_else(|()| format!("file://{}", path.display()))
    }

    async fn sweep_partials(&self) -> Result<usize> {
        let mut dir = fs::read_dir(&self.root)
            .await
            .map_err(|e| CacheError::filesystem(&self.root, "list cache directory", e))?;
        let mut swept = 0;
        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| CacheError::filesystem(&self.root, "list cache directory", e))?
        {
            let name = item.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') && name.ends_with(PART_SUFFIX) {
                match fs::remove_file(item.path()).await {
                    Ok(()) => swept += 1,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        tracing::warn!(path = %item.path().display(), error = %e, "failed to remove partial download");
                    }
                }
            }
        }
        Ok(swept)
    }
}

/// Reject CIDs that would escape the cache directory or collide with
/// temporary files
pub(crate) fn validate_cid(cid: &str) -> Result<()> {
    if cid.is_empty() {
        return Err(CacheError::invalid_cid(cid, "empty"));
    }
    if cid.starts_with('.') {
        return Err(CacheError::invalid_cid(cid, "must not start with '.'"));
    }
    if cid.contains(['/', '\\', '\0']) {
        return Err(CacheError::invalid_cid(cid, "contains a path separator"));
    }
    if cid.chars().any(char::is_whitespace) {
        return Err(CacheError::invalid_cid(cid, "contains whitespace"));
    }
    Ok(())
}
