//! Metadata commands: favorites, tags, notes and listings

use super::Context;

pub async fn favorite(ctx: &Context, cid: &str, favorite: bool) -> eyre::Result<()> {
    let entry = ctx.cache.set_favorite(cid, favorite).await?;
    let state = if entry.is_favorite { "favorite" } else { "not favorite" };
    ctx.output.value(&entry, || format!("{cid}: {state}"))
}

pub async fn tag(ctx: &Context, cid: &str, tags: &[String]) -> eyre::Result<()> {
    let entry = ctx.cache.set_tags(cid, tags).await?;
    ctx.output.value(&entry, || {
        let tags: Vec<&str> = entry.tags.iter().map(String::as_str).collect();
        format!("{cid}: [{}]", tags.join(", "))
    })
}

pub async fn note(ctx: &Context, cid: &str, text: &str) -> eyre::Result<()> {
    let entry = ctx.cache.set_notes(cid, text).await?;
    ctx.output.value(&entry, || format!("{cid}: notes updated"))
}

pub async fn show(ctx: &Context, cid: &str) -> eyre::Result<()> {
    match ctx.cache.entry(cid).await? {
        Some(entry) => ctx.output.entry(&entry),
        None => eyre::bail!("no metadata recorded for {cid}"),
    }
}

pub async fn list(ctx: &Context, favorites: bool) -> eyre::Result<()> {
    let entries = if favorites {
        ctx.cache.favorites().await?
    } else {
        ctx.cache.entries().await?
    };
    ctx.output.entries(&entries)
}

pub async fn search(ctx: &Context, query: &str) -> eyre::Result<()> {
    let entries = ctx.cache.search(query).await?;
    ctx.output.entries(&entries)
}

pub async fn delete(ctx: &Context, cid: &str) -> eyre::Result<()> {
    let deleted = ctx.cache.delete(cid).await?;
    ctx.output
        .value(&serde_json::json!({ "cid": cid, "deleted": deleted }), || {
            if deleted {
                format!("{cid}: deleted")
            } else {
                format!("{cid}: nothing to delete")
            }
        })
}
