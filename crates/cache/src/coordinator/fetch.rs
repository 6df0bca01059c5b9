//! Guaranteed local copies with coalesced downloads

use super::{CacheCoordinator, Flight};
use crate::disk::validate_cid;
use crate::errors::{CacheError, Result};
use crate::gateway::{GatewayRegistry, ProbeOutcome};
use dashmap::DashMap;
use pincache_utils::tracing::cache_event;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

/// Drops a flight from the table once it settles or its last caller goes away
struct FlightGuard<'a> {
    in_flight: &'a DashMap<String, Flight>,
    cid: &'a str,
    flight: Flight,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        // One reference lives in the table and one here; more means other waiters
        self.in_flight.remove_if(self.cid, |_, current| {
            Arc::ptr_eq(current, &self.flight)
                && (current.initialized() || Arc::strong_count(current) <= 2)
        });
    }
}

struct Downloaded {
    path: PathBuf,
    latency: Duration,
    bytes: u64,
}

impl CacheCoordinator {
    /// Make sure the bytes for `cid` are on disk and return their path
    ///
    /// Concurrent calls for the same CID share one download.
    pub async fn fetch(&self, cid: &str) -> Result<PathBuf> {
        self.fetch_with_cancel(cid, &CancellationToken::new()).await
    }

    /// [`fetch`](Self::fetch), checking `cancel` between gateway attempts
    pub async fn fetch_with_cancel(&self, cid: &str, cancel: &CancellationToken) -> Result<PathBuf> {
        validate_cid(cid)?;
        if let Some(path) = self.inner.disk.cached_file(cid).await? {
            cache_event(cid, true, "disk");
            return Ok(path);
        }

        loop {
            let flight = Arc::clone(
                self.inner
                    .in_flight
                    .entry(cid.to_string())
                    .or_insert_with(|| Arc::new(OnceCell::new()))
                    .value(),
            );
            let guard = FlightGuard {
                in_flight: &self.inner.in_flight,
                cid,
                flight,
            };
            let outcome = guard
                .flight
                .get_or_init(|| self.download(cid, cancel))
                .await
                .clone();
            drop(guard);

            match outcome {
                // Whoever drove the shared download gave up; try again on our own terms
                Err(CacheError::Cancelled { .. }) if !cancel.is_cancelled() => {
                    tracing::debug!(cid = %cid, "shared download was cancelled, retrying");
                }
                outcome => return outcome,
            }
        }
    }

    async fn download(&self, cid: &str, cancel: &CancellationToken) -> Result<PathBuf> {
        let inner = &self.inner;
        if let Some(path) = inner.disk.cached_file(cid).await? {
            return Ok(path);
        }
        cache_event(cid, false, "disk");

        let ranked = inner.registry.rank();
        for endpoint in &ranked {
            if cancel.is_cancelled() {
                tracing::info!(cid = %cid, "download cancelled");
                return Err(CacheError::cancelled(cid));
            }
            let base = &endpoint.base_url;
            match self.download_from(base, cid).await {
                Ok(done) => {
                    inner.registry.record_probe(base, ProbeOutcome::Success(done.latency));
                    tracing::info!(
                        cid = %cid,
                        endpoint = %base,
                        bytes = done.bytes,
                        latency_ms = done.latency.as_millis() as u64,
                        "download complete"
                    );
                    return Ok(done.path);
                }
                Err(error) if error.is_gateway_failure() => {
                    tracing::warn!(cid = %cid, endpoint = %base, error = %error, "download failed");
                    inner.registry.record_probe(base, ProbeOutcome::Failure);
                }
                Err(error) => return Err(error),
            }
        }

        tracing::error!(cid = %cid, attempts = ranked.len(), "all gateways failed");
        Err(CacheError::AllGatewaysFailed {
            cid: cid.to_string(),
            attempts: ranked.len(),
        })
    }

    /// One attempt against one gateway; the temporary file is removed on any error
    async fn download_from(&self, base: &str, cid: &str) -> Result<Downloaded> {
        let url = GatewayRegistry::url_for(base, cid);
        let started = Instant::now();
        let mut response = self.inner.client.open(base, &url).await?;
        let latency = started.elapsed();
        let expected = response.content_length();

        let mut part = self.inner.disk.begin_write(cid).await?;
        while let Some(chunk) = response.next_chunk().await? {
            part.write(&chunk).await?;
        }

        let bytes = part.bytes_written();
        if bytes == 0 {
            part.discard().await;
            return Err(CacheError::gateway(base, "empty response body"));
        }
        if let Some(expected) = expected.filter(|expected| *expected != bytes) {
            part.discard().await;
            return Err(CacheError::gateway(
                base,
                format!("body truncated: expected {expected} bytes, got {bytes}"),
            ));
        }

        let path = part.commit().await?;
        Ok(Downloaded {
            path,
            latency,
            bytes,
        })
    }
}
