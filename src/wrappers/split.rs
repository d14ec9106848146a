//! Request-splitting wrapper.
//!
//! [`SplittingStore`] accelerates large full-object fetches by fanning one
//! `get` out into a single `get_ranges` call of contiguous parts, which
//! typical backends execute in parallel. Range requests pass through
//! unchanged; their callers already sized them.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::error::StoreError;
use crate::store::{GetOptions, GetResult, ObjectMeta, ObjectStore, RangeSpec};

/// Default target size for each part: 12 MB, tuned for cloud storage
/// throughput.
pub const DEFAULT_REQUEST_SIZE: u64 = 12 * 1024 * 1024;

/// Default cap on the number of parts per fetch.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: u64 = 18;

/// A wrapper that splits large `get` requests into parallel range fetches.
///
/// The part count is `ceil(size / request_size)`, capped at
/// `max_concurrent_requests`; when capped, the part size grows so the parts
/// still cover the object. Objects that fit in a single part are fetched
/// with a plain `get`.
///
/// Composes naturally under [`super::CachingStore`]: the split fetch fills
/// the cache, and later accesses skip the network entirely.
#[derive(Debug, Clone)]
pub struct SplittingStore<S: ObjectStore> {
    inner: S,
    request_size: u64,
    max_concurrent_requests: u64,
}

impl<S: ObjectStore> SplittingStore<S> {
    /// Wrap `inner` with the default part size (12 MB) and cap (18).
    pub fn new(inner: S) -> Self {
        Self::with_options(inner, DEFAULT_REQUEST_SIZE, DEFAULT_MAX_CONCURRENT_REQUESTS)
    }

    /// Wrap `inner` with a custom part size and part-count cap.
    pub fn with_options(inner: S, request_size: u64, max_concurrent_requests: u64) -> Self {
        Self {
            inner,
            request_size: request_size.max(1),
            max_concurrent_requests: max_concurrent_requests.max(1),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Contiguous, non-overlapping parts covering `[0, size)`, or `None`
    /// when splitting brings no benefit.
    fn compute_parts(&self, size: u64) -> Option<Vec<RangeSpec>> {
        if size == 0 {
            return None;
        }

        let mut request_size = self.request_size;
        let mut num_requests = size.div_ceil(request_size);
        if num_requests <= 1 {
            return None;
        }
        if num_requests > self.max_concurrent_requests {
            num_requests = self.max_concurrent_requests;
            request_size = size.div_ceil(num_requests);
        }

        let parts = (0..num_requests)
            .map(|i| {
                let start = i * request_size;
                RangeSpec::with_length(start, request_size.min(size - start))
            })
            .collect();
        Some(parts)
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for SplittingStore<S> {
    async fn get_opts(&self, path: &str, options: GetOptions) -> Result<GetResult, StoreError> {
        // Splitting only applies to plain full-object fetches; restricted or
        // conditional gets delegate unchanged.
        if options.range.is_some() || options.if_match.is_some() || options.if_none_match.is_some()
        {
            return self.inner.get_opts(path, options).await;
        }

        let meta = self.inner.head(path).await?;
        let Some(parts) = self.compute_parts(meta.size) else {
            return self.inner.get_opts(path, options).await;
        };

        debug!(path, size = meta.size, parts = parts.len(), "splitting get");
        let results = self.inner.get_ranges(path, &parts).await?;

        let mut data = BytesMut::with_capacity(meta.size as usize);
        for part in results {
            data.extend_from_slice(&part);
        }
        let size = meta.size;
        Ok(GetResult::new(data.freeze(), meta, 0..size))
    }

    async fn get_range(&self, path: &str, range: RangeSpec) -> Result<Bytes, StoreError> {
        self.inner.get_range(path, range).await
    }

    async fn get_ranges(
        &self,
        path: &str,
        ranges: &[RangeSpec],
    ) -> Result<Vec<Bytes>, StoreError> {
        self.inner.get_ranges(path, ranges).await
    }

    async fn head(&self, path: &str) -> Result<ObjectMeta, StoreError> {
        self.inner.head(path).await
    }

    fn prefix(&self) -> Option<&str> {
        self.inner.prefix()
    }
}
