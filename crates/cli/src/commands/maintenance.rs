//! prune, clear and stats

use super::Context;
use crate::output::format_bytes;

const MIB: u64 = 1024 * 1024;

pub async fn prune(ctx: &Context, max_mb: Option<u64>) -> eyre::Result<()> {
    let report = match max_mb {
        Some(mb) => ctx.cache.prune_to_limit(mb.saturating_mul(MIB)).await?,
        None => ctx.cache.prune_to_configured_limit().await?,
    };
    ctx.output.value(&report, || {
        let mut summary = format!(
            "removed {} files, freed {} ({} of {} limit in use)",
            report.removed.len(),
            format_bytes(report.freed()),
            format_bytes(report.bytes_after),
            format_bytes(report.limit),
        );
        if !report.within_limit() {
            summary.push_str(&format!(
                "\nstill above limit: {} favorites are never pruned",
                report.favorites_kept
            ));
        }
        summary
    })
}

pub async fn clear(ctx: &Context, all: bool) -> eyre::Result<()> {
    let removed = if all {
        ctx.cache.clear_cache().await?
    } else {
        ctx.cache.clear_non_favorite_cache().await?
    };
    let scope = if all { "cached files" } else { "non-favorite entries" };
    let status = serde_json::json!({ "removed": removed, "all": all });
    ctx.output.value(&status, || format!("removed {removed} {scope}"))
}

pub async fn stats(ctx: &Context) -> eyre::Result<()> {
    let entries = ctx.cache.count().await?;
    let bytes = ctx.cache.disk_usage().await?;
    let limit = ctx.cache.config().max_cache_bytes();
    let stats = serde_json::json!({
        "entries": entries,
        "diskBytes": bytes,
        "limitBytes": limit,
        "cacheDir": ctx.cache.disk().root(),
    });
    ctx.output.value(&stats, || {
        format!(
            "entries:    {entries}\ndisk usage: {} of {}\ncache dir:  {}",
            format_bytes(bytes),
            format_bytes(limit),
            ctx.cache.disk().root().display()
        )
    })
}
