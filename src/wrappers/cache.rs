//! Whole-object caching wrapper.
//!
//! [`CachingStore`] caches entire objects on first access in a byte-bounded
//! LRU. All read operations, including range requests, are then served
//! from the cached bytes, which turns the many small reads issued by
//! binary-format libraries into at most one backend fetch per object.
//!
//! The cache is local to the process. Workers in multi-process pools clone
//! the wrapper and start with an empty cache; since objects are immutable, a
//! cold cache is merely slower, never incorrect.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::error::StoreError;
use crate::store::{
    check_preconditions, slice_object, GetOptions, GetResult, ObjectMeta, ObjectStore, RangeSpec,
};

/// Default cache capacity: 256 MB.
pub const DEFAULT_CACHE_MAX_SIZE: usize = 256 * 1024 * 1024;

/// A wrapper that caches full objects on first access.
///
/// On any `get`/`get_range`/`get_ranges` miss, the wrapper fetches the whole
/// object via the inner store's `get`, inserts it, and serves the request
/// from the cached bytes. `head` always delegates and never populates the
/// cache.
///
/// # Thread safety
///
/// All cache bookkeeping holds a mutex, but the mutex is released while the
/// backend fetch is in flight. Two tasks missing the same key concurrently
/// will both fetch; the loser of the race finds the entry already present
/// and discards its copy. Both observe identical bytes (objects are
/// immutable), so states never diverge.
///
/// # Cloning
///
/// `Clone` reproduces the configuration (inner store, `max_size`) with a
/// fresh, empty cache: the value-type equivalent of shipping the wrapper to
/// a worker process.
pub struct CachingStore<S: ObjectStore> {
    inner: Arc<S>,
    max_size: usize,
    state: Mutex<CacheState>,
}

struct CacheState {
    entries: LruCache<String, CachedObject>,
    current_size: usize,
}

#[derive(Clone)]
struct CachedObject {
    data: Bytes,
    meta: ObjectMeta,
}

impl<S: ObjectStore> CachingStore<S> {
    /// Wrap `inner` with the default cache capacity (256 MB).
    pub fn new(inner: S) -> Self {
        Self::with_max_size(inner, DEFAULT_CACHE_MAX_SIZE)
    }

    /// Wrap `inner` with a cache bounded at `max_size` bytes.
    pub fn with_max_size(inner: S, max_size: usize) -> Self {
        Self {
            inner: Arc::new(inner),
            max_size,
            state: Mutex::new(CacheState {
                entries: LruCache::unbounded(),
                current_size: 0,
            }),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Maximum cache capacity in bytes.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Current cache size in bytes.
    pub async fn cache_size(&self) -> usize {
        self.state.lock().await.current_size
    }

    /// Currently cached paths, oldest first.
    pub async fn cached_paths(&self) -> Vec<String> {
        let state = self.state.lock().await;
        // LruCache iterates most-recent first; report LRU order instead.
        let mut paths: Vec<String> = state.entries.iter().map(|(k, _)| k.clone()).collect();
        paths.reverse();
        paths
    }

    /// Drop all cached objects.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.entries.clear();
        state.current_size = 0;
    }

    /// Return the cached object for `path`, fetching and inserting it on a
    /// miss. The lock is not held across the fetch.
    async fn ensure_cached(&self, path: &str) -> Result<CachedObject, StoreError> {
        {
            let mut state = self.state.lock().await;
            if let Some(object) = state.entries.get(path) {
                trace!(path, "object cache hit");
                return Ok(object.clone());
            }
        }

        trace!(path, "object cache miss, fetching full object");
        let result = self.inner.get(path).await?;
        let object = CachedObject {
            meta: result.meta.clone(),
            data: result.into_bytes(),
        };

        let mut state = self.state.lock().await;
        // A concurrent task may have populated the entry while we fetched;
        // its bytes are identical, so just refresh recency.
        if let Some(existing) = state.entries.get(path) {
            return Ok(existing.clone());
        }

        state.current_size += object.data.len();
        state.entries.put(path.to_string(), object.clone());
        while state.current_size > self.max_size {
            match state.entries.pop_lru() {
                Some((evicted_path, evicted)) => {
                    state.current_size -= evicted.data.len();
                    debug!(path = %evicted_path, size = evicted.data.len(), "evicted cached object");
                }
                None => break,
            }
        }

        Ok(object)
    }
}

impl<S: ObjectStore> Clone for CachingStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            max_size: self.max_size,
            state: Mutex::new(CacheState {
                entries: LruCache::unbounded(),
                current_size: 0,
            }),
        }
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for CachingStore<S> {
    async fn get_opts(&self, path: &str, options: GetOptions) -> Result<GetResult, StoreError> {
        let object = self.ensure_cached(path).await?;
        check_preconditions(path, object.meta.e_tag.as_deref(), &options)?;
        match options.range {
            Some(range) => {
                let payload = slice_object(path, &object.data, range)?;
                Ok(GetResult::new(payload, object.meta, range.as_range()))
            }
            None => {
                let size = object.data.len() as u64;
                Ok(GetResult::new(object.data, object.meta, 0..size))
            }
        }
    }

    async fn get_range(&self, path: &str, range: RangeSpec) -> Result<Bytes, StoreError> {
        if range.is_empty() {
            return Ok(Bytes::new());
        }
        let object = self.ensure_cached(path).await?;
        slice_object(path, &object.data, range)
    }

    async fn get_ranges(
        &self,
        path: &str,
        ranges: &[RangeSpec],
    ) -> Result<Vec<Bytes>, StoreError> {
        let object = self.ensure_cached(path).await?;
        ranges
            .iter()
            .map(|range| slice_object(path, &object.data, *range))
            .collect()
    }

    async fn head(&self, path: &str) -> Result<ObjectMeta, StoreError> {
        self.inner.head(path).await
    }

    fn prefix(&self) -> Option<&str> {
        self.inner.prefix()
    }
}
