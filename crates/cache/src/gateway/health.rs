//! Connectivity checks across every configured gateway

use super::client::GatewayClient;
use super::registry::{GatewayRegistry, ProbeOutcome};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayStatus {
    Online,
    Slow,
    Offline,
}

impl GatewayStatus {
    /// Classify a probe result against the slow threshold
    pub fn classify(response_time: Option<Duration>, slow_threshold: Duration) -> Self {
        match response_time {
            None => Self::Offline,
            Some(elapsed) if elapsed >= slow_threshold => Self::Slow,
            Some(_) => Self::Online,
        }
    }
}

impl std::fmt::Display for GatewayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Online => "online",
            Self::Slow => "slow",
            Self::Offline => "offline",
        };
        f.pad(label)
    }
}

/// Outcome of probing one gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayHealth {
    pub endpoint: String,
    pub status: GatewayStatus,
    pub response_time_ms: Option<u64>,
    pub last_tested_at: DateTime<Utc>,
}

/// Probe every gateway concurrently with `test_cid`
///
/// Results come back in configured order. Successful probes also refresh
/// the latency used for ranking.
pub async fn check_all(
    registry: &GatewayRegistry,
    client: &GatewayClient,
    test_cid: &str,
    slow_threshold: Duration,
) -> Vec<GatewayHealth> {
    let probes = registry.endpoints().iter().map(|endpoint| async move {
        let url = GatewayRegistry::url_for(endpoint, test_cid);
        let result = client.probe(endpoint, &url).await;
        let elapsed = match result {
            Ok(elapsed) => {
                registry.record_probe(endpoint, ProbeOutcome::Success(elapsed));
                Some(elapsed)
            }
            Err(error) => {
                tracing::debug!(endpoint = %endpoint, error = %error, "health probe failed");
                registry.record_probe(endpoint, ProbeOutcome::Failure);
                None
            }
        };
        GatewayHealth {
            endpoint: endpoint.clone(),
            status: GatewayStatus::classify(elapsed, slow_threshold),
            response_time_ms: elapsed.map(|e| u64::try_from(e.as_millis()).unwrap_or(u64::MAX)),
            last_tested_at: Utc::now(),
        }
    });
    join_all(probes).await
}
