use clap::Parser;
use pincache_cache::{
    CacheConfigLoader, CacheCoordinator, CancellationToken, StaticNetworkPolicy,
};
use std::path::PathBuf;
use std::sync::Arc;

mod commands;
mod output;

use commands::{Commands, Context};
use output::Output;

/// Log filter used when `RUST_LOG` is unset
const DEFAULT_LOG_DIRECTIVE: &str = "info";

#[derive(Parser)]
#[command(name = "pincache")]
#[command(about = "Resolve, fetch and manage content-addressed files", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to $XDG_CONFIG_HOME/pincache/config.json)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the cache directory
    #[arg(long, global = true, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Treat the current network as metered
    #[arg(long, global = true)]
    metered: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    pincache_utils::tracing::init(DEFAULT_LOG_DIRECTIVE)
        .map_err(|e| eyre::eyre!("failed to initialise logging: {e}"))?;

    let (mut config, source) = CacheConfigLoader::load(cli.config.as_deref())?;
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = dir;
    }
    tracing::debug!(?source, cache_dir = %config.cache_dir.display(), "configuration loaded");

    let cache = CacheCoordinator::builder(config)
        .network_policy(Arc::new(StaticNetworkPolicy::new(!cli.metered)))
        .open()
        .await?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, stopping after the current gateway attempt");
            on_interrupt.cancel();
        }
    });

    let ctx = Context {
        cache,
        cancel,
        output: Output::new(cli.json),
    };
    let result = cli.command.execute(&ctx).await;
    ctx.cache.close()?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["pincache", "preload", "QmA", "QmB", "--metered", "--json"])
            .unwrap();
        assert!(cli.metered);
        assert!(cli.json);
        match cli.command {
            Commands::Preload { cids } => assert_eq!(cids, ["QmA", "QmB"]),
            _ => panic!("expected preload"),
        }
    }

    #[test]
    fn test_prune_limit_is_optional() {
        let cli = Cli::try_parse_from(["pincache", "prune"]).unwrap();
        assert!(matches!(cli.command, Commands::Prune { max_mb: None }));

        let cli = Cli::try_parse_from(["pincache", "prune", "--max-mb", "25"]).unwrap();
        assert!(matches!(cli.command, Commands::Prune { max_mb: Some(25) }));
    }

    #[test]
    fn test_favorite_toggle() {
        let cli = Cli::try_parse_from(["pincache", "favorite", "QmA", "--off"]).unwrap();
        assert!(matches!(cli.command, Commands::Favorite { off: true, .. }));
    }
}
