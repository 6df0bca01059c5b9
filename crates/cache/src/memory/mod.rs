//! In-memory layer: bounded LRU containers for metadata and validated URLs
//!
//! Nothing here is persisted; both containers start empty on every process
//! start.

use crate::entry::CacheEntry;
use lru::LruCache;
use parking_lot::Mutex;
use std::hash::Hash;
use std::num::NonZeroUsize;

/// Thread-safe, fixed-capacity map evicting the least recently used key
pub struct BoundedLru<K, V> {
    inner: Mutex<LruCache<K, V>>,
}

impl<K: Hash + Eq, V: Clone> BoundedLru<K, V> {
    /// Create a container; a zero capacity is raised to one
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Look up a value, marking it most recently used
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get(key).cloned()
    }

    /// Look up a value without touching recency
    pub fn peek(&self, key: &K) -> Option<V> {
        self.inner.lock().peek(key).cloned()
    }

    /// Insert a value, evicting the least recently used entry when full
    ///
    /// Returns the displaced pair: the previous value for `key`, or the
    /// entry evicted to make room.
    pub fn put(&self, key: K, value: V) -> Option<(K, V)> {
        self.inner.lock().push(key, value)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.lock().pop(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains(key)
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().cap().get()
    }
}

impl<K: Hash + Eq, V> std::fmt::Debug for BoundedLru<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.inner.lock();
        f.debug_struct("BoundedLru")
            .field("len", &guard.len())
            .field("capacity", &guard.cap())
            .finish()
    }
}

/// Metadata and URL containers shared by concurrent resolve/fetch calls
#[derive(Debug)]
pub struct MemoryCache {
    entries: BoundedLru<String, CacheEntry>,
    urls: BoundedLru<String, String>,
}

impl MemoryCache {
    pub fn new(metadata_capacity: usize, url_capacity: usize) -> Self {
        Self {
            entries: BoundedLru::new(metadata_capacity),
            urls: BoundedLru::new(url_capacity),
        }
    }

    pub fn entry(&self, cid: &str) -> Option<CacheEntry> {
        self.entries.get(&cid.to_string())
    }

    pub fn put_entry(&self, entry: CacheEntry) {
        self.entries.put(entry.cid.clone(), entry);
    }

    /// Drop the metadata copy after the persisted row changed
    pub fn invalidate_entry(&self, cid: &str) {
        self.entries.remove(&cid.to_string());
    }

    pub fn url(&self, cid: &str) -> Option<String> {
        self.urls.get(&cid.to_string())
    }

    pub fn put_url(&self, cid: &str, url: String) {
        self.urls.put(cid.to_string(), url);
    }

    /// Forget everything known about a CID
    pub fn forget(&self, cid: &str) {
        let key = cid.to_string();
        self.entries.remove(&key);
        self.urls.remove(&key);
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.urls.clear();
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn url_count(&self) -> usize {
        self.urls.len()
    }
}
