//! Shared helpers for gateway integration tests

#![allow(dead_code)]

use pincache_cache::{CacheConfig, CacheCoordinator};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::MockServer;

/// Gateway base URL served by `server`
pub fn gateway(server: &MockServer) -> String {
    format!("{}/ipfs/", server.uri())
}

pub fn config(temp: &TempDir, gateways: Vec<String>) -> CacheConfig {
    CacheConfig::builder()
        .with_cache_dir(temp.path().join("ipfs_cache"))
        .with_database_path(temp.path().join("cid_metadata.sqlite"))
        .with_gateways(gateways)
        .with_connect_probe_timeout(Duration::from_millis(500))
        .with_download_timeouts(Duration::from_millis(500), Duration::from_millis(500))
        .build()
        .expect("valid test configuration")
}

pub async fn coordinator(temp: &TempDir, gateways: Vec<String>) -> CacheCoordinator {
    CacheCoordinator::open(config(temp, gateways))
        .await
        .expect("failed to open cache")
}

/// Names of every file in `dir`, hidden ones included
pub fn dir_listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read cache dir")
        .map(|entry| entry.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Gateway that announces `declared` bytes, sends `sent` of them and hangs up
///
/// Returns the gateway base URL. The server runs until the test runtime stops.
pub async fn truncating_gateway(declared: usize, sent: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {declared}\r\nConnection: close\r\n\r\n"
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&vec![b'x'; sent]).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{addr}/ipfs/")
}
