//! In-progress download file, renamed into place on commit

use crate::errors::{CacheError, Result};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

/// Hidden temporary file that becomes the cached copy on [`commit`]
///
/// Dropping it without committing removes the temporary file.
///
/// [`commit`]: PartialFile::commit
#[derive(Debug)]
pub struct PartialFile {
    file: Option<File>,
    temp: PathBuf,
    target: PathBuf,
    written: u64,
    committed: bool,
}

impl PartialFile {
    pub(super) async fn create(temp: PathBuf, target: PathBuf) -> Result<Self> {
        let file = File::create(&temp)
            .await
            .map_err(|e| CacheError::filesystem(&temp, "create partial file", e))?;
        Ok(Self {
            file: Some(file),
            temp,
            target,
            written: 0,
            committed: false,
        })
    }

    pub async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        let file = self.file.as_mut().ok_or_else(|| {
            CacheError::filesystem(
                &self.temp,
                "write partial file",
                std::io::Error::other("file already closed"),
            )
        })?;
        file.write_all(chunk)
            .await
            .map_err(|e| CacheError::filesystem(&self.temp, "write partial file", e))?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    /// Flush, sync and atomically rename onto the final path
    pub async fn commit(mut self) -> Result<PathBuf> {
        if let Some(mut file) = self.file.take() {
            file.flush()
                .await
                .map_err(|e| CacheError::filesystem(&self.temp, "flush partial file", e))?;
            file.sync_all()
                .await
                .map_err(|e| CacheError::filesystem(&self.temp, "sync partial file", e))?;
        }
        fs::rename(&self.temp, &self.target)
            .await
            .map_err(|e| CacheError::filesystem(&self.target, "rename partial file", e))?;
        self.committed = true;
        Ok(self.target.clone())
    }

    /// Remove the temporary file now instead of on drop
    pub async fn discard(mut self) {
        self.file.take();
        if let Err(e) = fs::remove_file(&self.temp).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.temp.display(), error = %e, "failed to discard partial file");
            }
        }
        self.committed = true;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed {
            self.file.take();
            let _ = std::fs::remove_file(&self.temp);
        }
    }
}
