//! Gateway layer: endpoint registry, HTTP client and health checks

mod client;
mod health;
mod registry;

pub use client::{GatewayClient, GatewayDownload};
pub use health::{check_all, GatewayHealth, GatewayStatus};
pub use registry::{GatewayEndpoint, GatewayRegistry, ProbeOutcome};

#[cfg(test)]
mod tests;
