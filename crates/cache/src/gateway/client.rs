//! HTTP access to gateways: connectivity probes and streamed downloads

use crate::config::CacheConfig;
use crate::errors::{CacheError, Result};
use bytes::Bytes;
use std::time::{Duration, Instant};

/// Thin wrapper over two `reqwest` clients tuned for probing and downloading
#[derive(Debug, Clone)]
pub struct GatewayClient {
    probe: reqwest::Client,
    download: reqwest::Client,
    probe_timeout: Duration,
    read_timeout: Duration,
}

impl GatewayClient {
    pub fn new(config: &CacheConfig) -> Result<Self> {
        let probe_timeout = config.connect_probe_timeout();
        let probe = reqwest::Client::builder()
            .connect_timeout(probe_timeout)
            .timeout(probe_timeout)
            .build()
            .map_err(|e| CacheError::configuration(format!("failed to build HTTP client: {e}")))?;

        let download = reqwest::Client::builder()
            .connect_timeout(config.download_connect_timeout())
            .build()
            .map_err(|e| CacheError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            probe,
            download,
            probe_timeout,
            read_timeout: config.download_read_timeout(),
        })
    }

    /// Issue `GET url` and wait for a 2xx status line; the body is not read
    ///
    /// Returns the time taken until headers arrived.
    pub async fn probe(&self, endpoint: &str, url: &str) -> Result<Duration> {
        let started = Instant::now();
        let response = tokio::time::timeout(self.probe_timeout, self.probe.get(url).send())
            .await
            .map_err(|_| {
                CacheError::gateway(endpoint, format!("probe timed out after {:?}", self.probe_timeout))
            })?
            .map_err(|e| CacheError::gateway(endpoint, e))?;

        check_status(endpoint, &response)?;
        Ok(started.elapsed())
    }

    /// Start a download; headers must arrive within the read timeout
    pub async fn open(&self, endpoint: &str, url: &str) -> Result<GatewayDownload> {
        let response = tokio::time::timeout(self.read_timeout, self.download.get(url).send())
            .await
            .map_err(|_| {
                CacheError::gateway(
                    endpoint,
                    format!("no response within {:?}", self.read_timeout),
                )
            })?
            .map_err(|e| CacheError::gateway(endpoint, e))?;

        check_status(endpoint, &response)?;
        Ok(GatewayDownload {
            endpoint: endpoint.to_string(),
            response,
            read_timeout: self.read_timeout,
        })
    }
}

fn check_status(endpoint: &str, response: &reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(CacheError::gateway(endpoint, format!("HTTP status {status}")))
    }
}

/// An open response body read chunk by chunk
#[derive(Debug)]
pub struct GatewayDownload {
    endpoint: String,
    response: reqwest::Response,
    read_timeout: Duration,
}

impl GatewayDownload {
    /// Next body chunk, `None` at end of stream
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        let chunk = tokio::time::timeout(self.read_timeout, self.response.chunk())
            .await
            .map_err(|_| {
                CacheError::gateway(
                    &self.endpoint,
                    format!("read stalled for {:?}", self.read_timeout),
                )
            })?
            .map_err(|e| CacheError::gateway(&self.endpoint, e))?;
        Ok(chunk)
    }

    /// Declared body length, when the gateway sent one
    pub fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }
}
