//! Ordered gateway endpoints with last-measured latency

use dashmap::DashMap;
use serde::Serialize;
use std::time::Duration;

/// One configured gateway and its most recent successful latency
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayEndpoint {
    pub base_url: String,
    pub last_latency_ms: Option<u64>,
}

/// Result of contacting a gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Success(Duration),
    Failure,
}

/// Static list of gateway base URLs plus a shared latency map
///
/// The list never changes after construction. Latencies are written by
/// probes and downloads running concurrently; a failed probe keeps the
/// previous measurement rather than clearing it.
#[derive(Debug)]
pub struct GatewayRegistry {
    endpoints: Vec<String>,
    latencies: DashMap<String, u64>,
}

impl GatewayRegistry {
    /// Create a registry; base URLs are normalized to end with `/`
    pub fn new<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = Vec::new();
        for endpoint in endpoints {
            let endpoint = normalize_base_url(endpoint.into());
            if !seen.contains(&endpoint) {
                seen.push(endpoint);
            }
        }
        Self {
            endpoints: seen,
            latencies: DashMap::new(),
        }
    }

    /// Endpoints in configured order
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// First configured endpoint, used for the last-resort URL
    pub fn default_endpoint(&self) -> Option<&str> {
        self.endpoints.first().map(String::as_str)
    }

    pub fn latency_of(&self, base_url: &str) -> Option<u64> {
        self.latencies.get(base_url).map(|entry| *entry.value())
    }

    /// All endpoints, fastest measured first
    ///
    /// Unmeasured endpoints follow every measured one and keep their
    /// configured relative order; with no measurements at all this is the
    /// configured order unchanged.
    pub fn rank(&self) -> Vec<GatewayEndpoint> {
        let mut ranked: Vec<GatewayEndpoint> = self
            .endpoints
            .iter()
            .map(|base_url| GatewayEndpoint {
                base_url: base_url.clone(),
                last_latency_ms: self.latency_of(base_url),
            })
            .collect();

        // Stable sort keeps configured order among ties and unmeasured endpoints
        ranked.sort_by_key(|endpoint| match endpoint.last_latency_ms {
            Some(ms) => (0u8, ms),
            None => (1u8, 0),
        });
        ranked
    }

    /// Record the outcome of contacting `base_url`
    ///
    /// Unknown endpoints are ignored: the configured list is authoritative.
    pub fn record_probe(&self, base_url: &str, outcome: ProbeOutcome) {
        if !self.endpoints.iter().any(|e| e == base_url) {
            tracing::debug!(endpoint = %base_url, "ignoring probe for unconfigured gateway");
            return;
        }
        match outcome {
            ProbeOutcome::Success(elapsed) => {
                let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
                self.latencies.insert(base_url.to_string(), ms);
            }
            ProbeOutcome::Failure => {
                // Stale-but-measured ranks better than unknown
            }
        }
    }

    /// Full URL for `cid` on `base_url`
    pub fn url_for(base_url: &str, cid: &str) -> String {
        format!("{base_url}{cid}")
    }
}

fn normalize_base_url(mut base_url: String) -> String {
    if !base_url.ends_with('/') {
        base_url.push('/');
    }
    base_url
}
