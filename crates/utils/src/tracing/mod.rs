use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing system
///
/// Honours `RUST_LOG`, falling back to `default_directive` when unset or
/// unparsable. Output goes to stderr so stdout stays free for command results;
/// ANSI colouring is only enabled when stderr is a terminal.
pub fn init(default_directive: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = env_filter(default_directive)?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

fn env_filter(
    default_directive: &str,
) -> Result<EnvFilter, tracing_subscriber::filter::ParseError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .or_else(|_| EnvFilter::try_new("info"))
}

fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Emit a structured event for a cache layer lookup
pub fn cache_event(cid: &str, hit: bool, layer: &str) {
    if hit {
        ::tracing::debug!(cid = %cid, layer = %layer, "cache_hit");
    } else {
        ::tracing::debug!(cid = %cid, layer = %layer, "cache_miss");
    }
}
