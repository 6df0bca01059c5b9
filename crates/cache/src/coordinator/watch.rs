//! Live views that re-run a query after every metadata change

use super::CacheCoordinator;
use crate::entry::CacheEntry;
use crate::errors::Result;
use crate::metadata::MetadataStore;
use crate::state::LoadState;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use std::future::Future;
use tokio_stream::wrappers::WatchStream;

/// Stream of query results: `Loading`, then one result per store revision
pub type EntryStream = BoxStream<'static, LoadState<Vec<CacheEntry>>>;

impl CacheCoordinator {
    /// All entries, most recent first
    pub fn watch_entries(&self) -> EntryStream {
        self.watch_query(|store| async move { store.list_recent().await })
    }

    pub fn watch_favorites(&self) -> EntryStream {
        self.watch_query(|store| async move { store.list_favorites().await })
    }

    pub fn watch_search(&self, query: impl Into<String>) -> EntryStream {
        let query = query.into();
        self.watch_query(move |store| {
            let query = query.clone();
            async move { store.search(&query).await }
        })
    }

    fn watch_query<F, Fut>(&self, mut query: F) -> EntryStream
    where
        F: FnMut(MetadataStore) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<CacheEntry>>> + Send + 'static,
    {
        let store = self.inner.metadata.clone();
        let revisions = WatchStream::new(store.subscribe());
        let results = revisions.then(move |_| {
            let pending = query(store.clone());
            async move { LoadState::from(pending.await) }
        });
        stream::once(async { LoadState::Loading })
            .chain(results)
            .boxed()
    }
}
