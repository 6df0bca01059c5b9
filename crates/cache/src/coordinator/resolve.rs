//! URL resolution: memory, local copy, probed gateway, then fallback

use super::CacheCoordinator;
use crate::disk::{validate_cid, DiskStore};
use crate::entry::now_millis;
use crate::errors::{CacheError, Result};
use crate::gateway::{GatewayRegistry, ProbeOutcome};
use pincache_utils::tracing::cache_event;
use serde::Serialize;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Where a resolved URL came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResolutionSource {
    Memory,
    Local,
    Gateway { endpoint: String },
    /// No gateway answered; the URL points at the default gateway anyway
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub url: String,
    pub source: ResolutionSource,
}

impl Resolution {
    pub fn is_degraded(&self) -> bool {
        self.source == ResolutionSource::Fallback
    }
}

impl CacheCoordinator {
    /// Produce a usable URL for `cid`
    ///
    /// Gateway failures never surface: when every gateway fails the URL
    /// for the default gateway is returned. Storage errors propagate.
    pub async fn resolve(&self, cid: &str) -> Result<Resolution> {
        self.resolve_with_cancel(cid, &CancellationToken::new()).await
    }

    /// [`resolve`](Self::resolve), checking `cancel` between gateway probes
    pub async fn resolve_with_cancel(
        &self,
        cid: &str,
        cancel: &CancellationToken,
    ) -> Result<Resolution> {
        validate_cid(cid)?;
        let inner = &self.inner;

        if let Some(url) = inner.memory.url(cid) {
            cache_event(cid, true, "memory");
            return Ok(Resolution {
                url,
                source: ResolutionSource::Memory,
            });
        }
        cache_event(cid, false, "memory");

        if let Some(url) = self.resolve_local(cid).await? {
            cache_event(cid, true, "disk");
            return Ok(Resolution {
                url,
                source: ResolutionSource::Local,
            });
        }
        cache_event(cid, false, "disk");

        for endpoint in inner.registry.rank() {
            if cancel.is_cancelled() {
                return Err(CacheError::cancelled(cid));
            }
            let base = endpoint.base_url;
            let url = GatewayRegistry::url_for(&base, cid);
            match inner.client.probe(&base, &url).await {
                Ok(elapsed) => {
                    inner.registry.record_probe(&base, ProbeOutcome::Success(elapsed));
                    tracing::debug!(
                        cid = %cid,
                        endpoint = %base,
                        latency_ms = elapsed.as_millis() as u64,
                        "gateway probe succeeded"
                    );
                    self.touch(cid).await?;
                    inner.memory.put_url(cid, url.clone());
                    return Ok(Resolution {
                        url,
                        source: ResolutionSource::Gateway { endpoint: base },
                    });
                }
                Err(error) => {
                    tracing::warn!(cid = %cid, endpoint = %base, error = %error, "gateway probe failed");
                    inner.registry.record_probe(&base, ProbeOutcome::Failure);
                }
            }
        }

        let url = self.default_gateway_url(cid)?;
        tracing::warn!(cid = %cid, url = %url, "no gateway reachable, using default gateway URL");
        Ok(Resolution {
            url,
            source: ResolutionSource::Fallback,
        })
    }

    /// Local file URL for `cid` when a valid copy exists
    ///
    /// A recorded path whose file is gone or empty is cleared from the store.
    /// A file present on disk without a recorded path is adopted.
    async fn resolve_local(&self, cid: &str) -> Result<Option<String>> {
        let inner = &self.inner;

        if let Some(entry) = inner.metadata.get(cid).await? {
            if let Some(path) = entry.local_path {
                if is_valid_file(&path).await {
                    return self.adopt_local(cid, &path, false).await.map(Some);
                }
                tracing::debug!(cid = %cid, path = %path.display(), "recorded local copy is missing");
                inner.metadata.clear_local_path(cid).await?;
                inner.memory.invalidate_entry(cid);
            }
        }

        match inner.disk.cached_file(cid).await? {
            Some(path) => self.adopt_local(cid, &path, true).await.map(Some),
            None => Ok(None),
        }
    }

    async fn adopt_local(&self, cid: &str, path: &Path, record_path: bool) -> Result<String> {
        if record_path {
            self.inner.metadata.set_local_path(cid, path).await?;
        }
        self.touch(cid).await?;
        let url = DiskStore::file_url(path);
        self.inner.memory.put_url(cid, url.clone());
        Ok(url)
    }

    /// Count one access to `cid`
    pub(crate) async fn touch(&self, cid: &str) -> Result<()> {
        self.inner.metadata.record_access(cid, now_millis()).await?;
        self.inner.memory.invalidate_entry(cid);
        Ok(())
    }

    pub(crate) fn default_gateway_url(&self, cid: &str) -> Result<String> {
        self.inner
            .registry
            .default_endpoint()
            .map(|base| GatewayRegistry::url_for(base, cid))
            .ok_or_else(|| CacheError::configuration("no gateways configured"))
    }
}

pub(crate) async fn is_valid_file(path: &Path) -> bool {
    matches!(tokio::fs::metadata(path).await, Ok(meta) if meta.is_file() && meta.len() > 0)
}
