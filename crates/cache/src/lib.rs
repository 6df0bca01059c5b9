//! Content-addressable retrieval cache
//!
//! Content is named by its CID and looked up through three layers:
//!
//! - an in-memory LRU of validated URLs and metadata records
//! - a cache directory holding one file per CID, plus a SQLite table of
//!   per-CID metadata (access counts, favorites, tags, notes)
//! - a ranked list of HTTP gateways, fastest measured first
//!
//! [`CacheCoordinator`] is the entry point and owns every layer.
//!
//! ```no_run
//! # async fn demo() -> pincache_cache::Result<()> {
//! use pincache_cache::{CacheConfig, CacheCoordinator};
//!
//! let cache = CacheCoordinator::open(CacheConfig::default()).await?;
//! let resolution = cache.resolve("QmYgtfMBZW5B5bWgwHXvDyDwHXxG8yf6xgULYANpBnz7Kf").await?;
//! println!("{}", resolution.url);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod coordinator;
pub mod disk;
pub mod entry;
pub mod errors;
pub mod gateway;
pub mod memory;
pub mod metadata;
pub mod network;
pub mod state;

pub use config::{CacheConfig, CacheConfigBuilder, CacheConfigLoader, ConfigSource};
pub use coordinator::{
    CacheCoordinator, CachedItem, CoordinatorBuilder, EntryStream, PreloadOutcome, PruneReport,
    Resolution, ResolutionSource,
};
pub use disk::{DiskFile, DiskStore};
pub use entry::{CacheEntry, ImageMetadata, UNKNOWN_NAME};
pub use errors::{CacheError, RecoveryHint, Result};
pub use gateway::{GatewayEndpoint, GatewayHealth, GatewayRegistry, GatewayStatus, ProbeOutcome};
pub use memory::{BoundedLru, MemoryCache};
pub use metadata::MetadataStore;
pub use network::{NetworkPolicy, StaticNetworkPolicy};
pub use state::LoadState;
pub use tokio_util::sync::CancellationToken;
