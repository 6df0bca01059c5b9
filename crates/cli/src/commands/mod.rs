use clap::Subcommand;
use pincache_cache::{CacheCoordinator, CancellationToken};

use crate::output::Output;

mod gateways;
mod library;
mod maintenance;
mod retrieve;

/// Everything a command needs to run
pub struct Context {
    pub cache: CacheCoordinator,
    pub cancel: CancellationToken,
    pub output: Output,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print a usable URL for a CID
    Resolve { cid: String },

    /// Download a CID into the cache and print its path
    Fetch { cid: String },

    /// Download CIDs ahead of time when the network allows it
    Preload {
        #[arg(required = true)]
        cids: Vec<String>,
    },

    /// Mark a CID as favorite; favorites survive pruning and clearing
    Favorite {
        cid: String,
        /// Remove the favorite mark instead
        #[arg(long)]
        off: bool,
    },

    /// Replace the tags of a CID
    Tag {
        cid: String,
        tags: Vec<String>,
    },

    /// Attach free-form notes to a CID
    Note { cid: String, text: String },

    /// Show the stored metadata for a CID
    Show { cid: String },

    /// List known CIDs, most recently accessed first
    #[command(visible_alias = "ls")]
    List {
        /// Only favorites
        #[arg(short, long)]
        favorites: bool,
    },

    /// Search names and tags
    Search { query: String },

    /// Forget a CID: metadata row, cached file and memory entries
    #[command(visible_alias = "rm")]
    Delete { cid: String },

    /// Delete the oldest non-favorite files until the cache fits
    Prune {
        /// Limit in MiB (defaults to maxCacheSizeMB)
        #[arg(long)]
        max_mb: Option<u64>,
    },

    /// Delete non-favorite entries and their files
    Clear {
        /// Delete every cached file, favorites included; metadata is kept
        #[arg(long)]
        all: bool,
    },

    /// Show entry count and disk usage
    Stats,

    /// List configured gateways in rank order
    Gateways {
        /// Probe every gateway with the health-check CID
        #[arg(long)]
        check: bool,
    },
}

impl Commands {
    pub async fn execute(self, ctx: &Context) -> eyre::Result<()> {
        match self {
            Commands::Resolve { cid } => retrieve::resolve(ctx, &cid).await,
            Commands::Fetch { cid } => retrieve::fetch(ctx, &cid).await,
            Commands::Preload { cids } => retrieve::preload(ctx, &cids).await,
            Commands::Favorite { cid, off } => library::favorite(ctx, &cid, !off).await,
            Commands::Tag { cid, tags } => library::tag(ctx, &cid, &tags).await,
            Commands::Note { cid, text } => library::note(ctx, &cid, &text).await,
            Commands::Show { cid } => library::show(ctx, &cid).await,
            Commands::List { favorites } => library::list(ctx, favorites).await,
            Commands::Search { query } => library::search(ctx, &query).await,
            Commands::Delete { cid } => library::delete(ctx, &cid).await,
            Commands::Prune { max_mb } => maintenance::prune(ctx, max_mb).await,
            Commands::Clear { all } => maintenance::clear(ctx, all).await,
            Commands::Stats => maintenance::stats(ctx).await,
            Commands::Gateways { check } => gateways::gateways(ctx, check).await,
        }
    }
}
