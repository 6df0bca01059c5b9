//! The public face of the cache
//!
//! [`CacheCoordinator`] owns every layer and orchestrates lookups across
//! them: memory first, then disk and the metadata store, then gateways in
//! rank order. Clones share the same state.

mod fetch;
mod maintenance;
mod queries;
mod resolve;
mod watch;

pub use maintenance::{PreloadOutcome, PruneReport};
pub use queries::CachedItem;
pub use resolve::{Resolution, ResolutionSource};
pub use watch::EntryStream;

use crate::config::CacheConfig;
use crate::disk::DiskStore;
use crate::errors::{CacheError, Result};
use crate::gateway::{GatewayClient, GatewayRegistry};
use crate::memory::MemoryCache;
use crate::metadata::MetadataStore;
use crate::network::{NetworkPolicy, StaticNetworkPolicy};
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Shared outcome of one in-flight download
pub(crate) type Flight = Arc<OnceCell<Result<PathBuf>>>;

pub(crate) struct CoordinatorInner {
    pub(crate) config: CacheConfig,
    pub(crate) registry: GatewayRegistry,
    pub(crate) client: GatewayClient,
    pub(crate) memory: MemoryCache,
    pub(crate) disk: DiskStore,
    pub(crate) metadata: MetadataStore,
    pub(crate) network: Arc<dyn NetworkPolicy>,
    pub(crate) in_flight: DashMap<String, Flight>,
}

#[derive(Clone)]
pub struct CacheCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl std::fmt::Debug for CacheCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheCoordinator")
            .field("cache_dir", &self.inner.disk.root())
            .field("metadata", &self.inner.metadata)
            .field("memory", &self.inner.memory)
            .field("in_flight", &self.inner.in_flight.len())
            .finish()
    }
}

impl CacheCoordinator {
    /// Open every layer with the given configuration
    pub async fn open(config: CacheConfig) -> Result<Self> {
        Self::builder(config).open().await
    }

    pub fn builder(config: CacheConfig) -> CoordinatorBuilder {
        CoordinatorBuilder {
            config,
            network: None,
            metadata: None,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &GatewayRegistry {
        &self.inner.registry
    }

    pub fn disk(&self) -> &DiskStore {
        &self.inner.disk
    }

    /// Close the metadata store and drop in-memory state
    ///
    /// Later calls that touch metadata fail with a persistence error.
    pub fn close(&self) -> Result<()> {
        self.inner.memory.clear();
        self.inner.metadata.close()?;
        tracing::info!(cache_dir = %self.inner.disk.root().display(), "cache closed");
        Ok(())
    }
}

/// Builder for [`CacheCoordinator`]
pub struct CoordinatorBuilder {
    config: CacheConfig,
    network: Option<Arc<dyn NetworkPolicy>>,
    metadata: Option<MetadataStore>,
}

impl CoordinatorBuilder {
    /// Policy consulted before preloading; defaults to always unmetered
    pub fn network_policy(mut self, policy: Arc<dyn NetworkPolicy>) -> Self {
        self.network = Some(policy);
        self
    }

    /// Use an already opened store instead of `databasePath`
    pub fn metadata_store(mut self, store: MetadataStore) -> Self {
        self.metadata = Some(store);
        self
    }

    pub async fn open(self) -> Result<CacheCoordinator> {
        let config = self.config;
        config.validate()?;

        let registry = GatewayRegistry::new(config.gateways.iter().cloned());
        if registry.default_endpoint().is_none() {
            return Err(CacheError::configuration("no gateways configured"));
        }
        let client = GatewayClient::new(&config)?;
        let disk = DiskStore::open(&config.cache_dir).await?;
        let metadata = match self.metadata {
            Some(store) => store,
            None => MetadataStore::open(&config.database_path).await?,
        };
        let memory = MemoryCache::new(config.memory_metadata_capacity, config.memory_url_capacity);
        let network = self
            .network
            .unwrap_or_else(|| Arc::new(StaticNetworkPolicy::default()));

        tracing::info!(
            cache_dir = %disk.root().display(),
            gateways = registry.endpoints().len(),
            max_cache_mb = config.max_cache_size_mb,
            "cache opened"
        );

        Ok(CacheCoordinator {
            inner: Arc::new(CoordinatorInner {
                config,
                registry,
                client,
                memory,
                disk,
                metadata,
                network,
                in_flight: DashMap::new(),
            }),
        })
    }
}
