//! resolve, fetch and preload

use super::Context;
use pincache_cache::{CacheError, PreloadOutcome};
use serde::Serialize;
use std::path::PathBuf;

pub async fn resolve(ctx: &Context, cid: &str) -> eyre::Result<()> {
    let resolution = ctx.cache.resolve_with_cancel(cid, &ctx.cancel).await?;
    if resolution.is_degraded() {
        tracing::warn!(cid = %cid, "no gateway reachable, URL may not load");
    }
    ctx.output.value(&resolution, || resolution.url.clone())
}

pub async fn fetch(ctx: &Context, cid: &str) -> eyre::Result<()> {
    let path = ctx.cache.fetch_with_cancel(cid, &ctx.cancel).await?;
    ctx.output
        .value(&serde_json::json!({ "cid": cid, "path": path }), || {
            path.display().to_string()
        })
}

/// Outcome of preloading one CID
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PreloadRecord {
    cid: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl PreloadRecord {
    fn new(cid: &str, result: Result<PreloadOutcome, CacheError>) -> Self {
        let (status, path, error) = match result {
            Ok(PreloadOutcome::Cached(path)) => ("cached", Some(path), None),
            Ok(PreloadOutcome::Skipped) => ("skipped", None, None),
            Err(error) => ("failed", None, Some(error.to_string())),
        };
        Self {
            cid: cid.to_string(),
            status,
            path,
            error,
        }
    }

    fn failed(&self) -> bool {
        self.error.is_some()
    }

    fn human(&self) -> String {
        match (&self.path, &self.error) {
            (Some(path), _) => format!("{}\tcached\t{}", self.cid, path.display()),
            (None, Some(error)) => format!("{}\tfailed\t{error}", self.cid),
            (None, None) => format!("{}\tskipped (metered network)", self.cid),
        }
    }
}

pub async fn preload(ctx: &Context, cids: &[String]) -> eyre::Result<()> {
    let mut records = Vec::with_capacity(cids.len());
    for cid in cids {
        if ctx.cancel.is_cancelled() {
            break;
        }
        let result = ctx.cache.preload_with_cancel(cid, &ctx.cancel).await;
        if let Err(error) = &result {
            tracing::error!(cid = %cid, error = %error, "preload failed");
        }
        records.push(PreloadRecord::new(cid, result));
    }

    ctx.output.value(&records, || {
        records
            .iter()
            .map(PreloadRecord::human)
            .collect::<Vec<_>>()
            .join("\n")
    })?;

    let failures = records.iter().filter(|record| record.failed()).count();
    if failures > 0 {
        eyre::bail!("{failures} of {} preloads failed", cids.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preload_record_serializes_each_outcome() {
        let cached = PreloadRecord::new("QmA", Ok(PreloadOutcome::Cached("/c/QmA".into())));
        assert_eq!(
            serde_json::to_value(&cached).unwrap(),
            serde_json::json!({ "cid": "QmA", "status": "cached", "path": "/c/QmA" })
        );

        let skipped = PreloadRecord::new("QmB", Ok(PreloadOutcome::Skipped));
        assert_eq!(
            serde_json::to_value(&skipped).unwrap(),
            serde_json::json!({ "cid": "QmB", "status": "skipped" })
        );
        assert!(skipped.human().contains("skipped"));

        let failed = PreloadRecord::new("QmC", Err(CacheError::cancelled("QmC")));
        assert!(failed.failed());
        assert_eq!(serde_json::to_value(&failed).unwrap()["status"], "failed");
        assert!(failed.human().starts_with("QmC\tfailed"));
    }
}
