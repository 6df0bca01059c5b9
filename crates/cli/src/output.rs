//! Human and JSON rendering of command results

use chrono::{DateTime, Local, Utc};
use pincache_cache::CacheEntry;
use serde::Serialize;

#[derive(Debug, Clone, Copy)]
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Print `value` as JSON, or the text produced by `human`
    pub fn value<T: Serialize>(
        &self,
        value: &T,
        human: impl FnOnce() -> String,
    ) -> eyre::Result<()> {
        println!("{}", self.render(value, human)?);
        Ok(())
    }

    fn render<T: Serialize>(
        &self,
        value: &T,
        human: impl FnOnce() -> String,
    ) -> eyre::Result<String> {
        if self.json {
            Ok(serde_json::to_string_pretty(value)?)
        } else {
            Ok(human())
        }
    }

    pub fn entry(&self, entry: &CacheEntry) -> eyre::Result<()> {
        self.value(entry, || describe_entry(entry))
    }

    pub fn entries(&self, entries: &[CacheEntry]) -> eyre::Result<()> {
        self.value(&entries, || {
            if entries.is_empty() {
                return "no entries".to_string();
            }
            entries.iter().map(entry_row).collect::<Vec<_>>().join("\n")
        })
    }
}

/// One line per entry for listings
fn entry_row(entry: &CacheEntry) -> String {
    let star = if entry.is_favorite { "*" } else { " " };
    let local = if entry.local_path.is_some() { "local" } else { "remote" };
    format!(
        "{star} {:<46} {:<24} {:>6}x {:<6} {}",
        entry.cid,
        truncate(&entry.name, 24),
        entry.access_count,
        local,
        format_time(entry.last_accessed)
    )
}

fn describe_entry(entry: &CacheEntry) -> String {
    let tags: Vec<&str> = entry.tags.iter().map(String::as_str).collect();
    let mut lines = vec![
        format!("cid:           {}", entry.cid),
        format!("name:          {}", entry.name),
        format!("size:          {}", format_bytes(entry.size)),
        format!("mime type:     {}", entry.mime_type),
        format!("accesses:      {}", entry.access_count),
        format!("last accessed: {}", format_time(entry.last_accessed)),
        format!("favorite:      {}", entry.is_favorite),
        format!("tags:          {}", tags.join(", ")),
    ];
    if let Some(path) = &entry.local_path {
        lines.push(format!("local path:    {}", path.display()));
    }
    if !entry.notes.is_empty() {
        lines.push(format!("notes:         {}", entry.notes));
    }
    lines.join("\n")
}

fn format_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
