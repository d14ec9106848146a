//! Store abstraction for read-only byte-range access to remote objects.
//!
//! The [`ObjectStore`] trait is the contract everything else in this crate is
//! built on: wrappers proxy it, readers consume it, and the registry routes
//! URLs to implementations of it. Backends are intentionally thin; all fetch
//! optimization lives in the wrappers and readers.

mod http;
mod memory;
mod s3;

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::StoreError;

pub use http::HttpStore;
pub use memory::MemoryStore;
pub use s3::S3Store;

// =============================================================================
// Data Model
// =============================================================================

/// Metadata for an object, as returned by [`ObjectStore::head`].
///
/// `size` is authoritative; the remaining fields are opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Path of the object within its store.
    pub path: String,
    /// Object size in bytes.
    pub size: u64,
    /// Last-modified timestamp reported by the backend.
    pub last_modified: DateTime<Utc>,
    /// Entity tag, when the backend provides one.
    pub e_tag: Option<String>,
    /// Version identifier, when the backend provides one.
    pub version: Option<String>,
}

/// A half-open byte range `[start, end)`, expressed either by its exclusive
/// end offset or by its length.
///
/// The two constructors carry the caller's choice through to trace records
/// (see [`crate::wrappers::RequestRecord::range_style`]); the covered
/// interval is otherwise identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// `[start, end)`.
    End { start: u64, end: u64 },
    /// `[start, start + length)`.
    Length { start: u64, length: u64 },
}

/// Which form a [`RangeSpec`] was expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeStyle {
    End,
    Length,
}

impl RangeSpec {
    /// Range bounded by an exclusive end offset.
    pub fn end_at(start: u64, end: u64) -> Self {
        Self::End { start, end }
    }

    /// Range bounded by a length.
    pub fn with_length(start: u64, length: u64) -> Self {
        Self::Length { start, length }
    }

    /// Start offset (inclusive).
    pub fn start(&self) -> u64 {
        match *self {
            Self::End { start, .. } | Self::Length { start, .. } => start,
        }
    }

    /// End offset (exclusive). An `End` range with `end < start` is treated
    /// as empty.
    pub fn end(&self) -> u64 {
        match *self {
            Self::End { start, end } => end.max(start),
            Self::Length { start, length } => start + length,
        }
    }

    /// Number of bytes covered.
    pub fn len(&self) -> u64 {
        self.end() - self.start()
    }

    /// True when the range covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The style the caller expressed this range in.
    pub fn style(&self) -> RangeStyle {
        match self {
            Self::End { .. } => RangeStyle::End,
            Self::Length { .. } => RangeStyle::Length,
        }
    }

    /// The covered interval as a `std::ops::Range`.
    pub fn as_range(&self) -> Range<u64> {
        self.start()..self.end()
    }
}

/// Options for [`ObjectStore::get_opts`].
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    /// Restrict the fetch to a byte range. When set, the returned
    /// [`GetResult::range`] reflects the restriction.
    pub range: Option<RangeSpec>,
    /// Fail with [`StoreError::Precondition`] unless the object's ETag
    /// matches.
    pub if_match: Option<String>,
    /// Fail with [`StoreError::Precondition`] if the object's ETag matches.
    pub if_none_match: Option<String>,
}

/// Result of a [`ObjectStore::get`] call: the payload, the object metadata,
/// and the byte range the payload covers.
#[derive(Debug, Clone)]
pub struct GetResult {
    payload: Bytes,
    /// Metadata of the fetched object.
    pub meta: ObjectMeta,
    /// Byte range covered by `payload`. Equal to `0..meta.size` unless the
    /// request was range-restricted.
    pub range: Range<u64>,
    /// Backend response attributes (e.g. forwarded HTTP headers). Empty for
    /// backends that have none.
    pub attributes: HashMap<String, String>,
}

impl GetResult {
    /// Build a result covering `range` of the object described by `meta`.
    pub fn new(payload: Bytes, meta: ObjectMeta, range: Range<u64>) -> Self {
        Self {
            payload,
            meta,
            range,
            attributes: HashMap::new(),
        }
    }

    /// The fetched bytes. `Bytes` is reference-counted, so this is cheap.
    pub fn bytes(&self) -> Bytes {
        self.payload.clone()
    }

    /// Consume the result, returning the payload.
    pub fn into_bytes(self) -> Bytes {
        self.payload
    }

    /// Length of the payload in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// True when the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

// =============================================================================
// Store Traits
// =============================================================================

/// Read-only access to objects addressed by path.
///
/// Implementations must be thread-safe; stores are long-lived and may be
/// shared by many readers. All methods treat objects as immutable: once a
/// byte range has been observed, it is stable for the lifetime of the store.
///
/// Failure modes (missing object, permission denied, transport failure,
/// conditional-match failure) propagate as [`StoreError`]; the core performs
/// no retry.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the entire object.
    async fn get(&self, path: &str) -> Result<GetResult, StoreError> {
        self.get_opts(path, GetOptions::default()).await
    }

    /// Fetch the object, honoring [`GetOptions`].
    async fn get_opts(&self, path: &str, options: GetOptions) -> Result<GetResult, StoreError>;

    /// Fetch a single byte range. An empty range returns empty bytes without
    /// issuing a request.
    async fn get_range(&self, path: &str, range: RangeSpec) -> Result<Bytes, StoreError>;

    /// Fetch multiple byte ranges. The result aligns 1:1 with `ranges`; the
    /// backend is free to parallelize or coalesce internally.
    ///
    /// The default implementation fans the ranges out concurrently over
    /// [`ObjectStore::get_range`].
    async fn get_ranges(
        &self,
        path: &str,
        ranges: &[RangeSpec],
    ) -> Result<Vec<Bytes>, StoreError> {
        let futures = ranges.iter().map(|range| self.get_range(path, *range));
        futures::future::try_join_all(futures).await
    }

    /// Fetch object metadata without transferring the body.
    async fn head(&self, path: &str) -> Result<ObjectMeta, StoreError>;

    /// The store's internal path prefix, if it advertises one.
    ///
    /// The registry strips this prefix from resolved paths so that callers
    /// hand the store paths relative to its root.
    fn prefix(&self) -> Option<&str> {
        None
    }
}

impl std::fmt::Debug for dyn ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<dyn ObjectStore>")
    }
}

/// Listing access, consumed by [`crate::glob`].
///
/// Kept separate from [`ObjectStore`] because several backends (plain HTTP)
/// cannot enumerate objects.
#[async_trait]
pub trait ObjectList: Send + Sync {
    /// List objects whose path starts with `prefix` (all objects when
    /// `None`). Order is backend-defined.
    async fn list(&self, prefix: Option<&str>) -> Result<Vec<ObjectMeta>, StoreError>;
}

#[async_trait]
impl<S: ObjectStore + ?Sized> ObjectStore for Arc<S> {
    async fn get_opts(&self, path: &str, options: GetOptions) -> Result<GetResult, StoreError> {
        self.as_ref().get_opts(path, options).await
    }

    async fn get_range(&self, path: &str, range: RangeSpec) -> Result<Bytes, StoreError> {
        self.as_ref().get_range(path, range).await
    }

    async fn get_ranges(
        &self,
        path: &str,
        ranges: &[RangeSpec],
    ) -> Result<Vec<Bytes>, StoreError> {
        self.as_ref().get_ranges(path, ranges).await
    }

    async fn head(&self, path: &str) -> Result<ObjectMeta, StoreError> {
        self.as_ref().head(path).await
    }

    fn prefix(&self) -> Option<&str> {
        self.as_ref().prefix()
    }
}

#[async_trait]
impl<S: ObjectList + ?Sized> ObjectList for Arc<S> {
    async fn list(&self, prefix: Option<&str>) -> Result<Vec<ObjectMeta>, StoreError> {
        self.as_ref().list(prefix).await
    }
}

/// Check [`GetOptions`] preconditions against an object's ETag.
///
/// Shared by backends that evaluate conditionals locally (the in-memory
/// store, the caching wrapper). Network backends let the service evaluate
/// them instead.
pub(crate) fn check_preconditions(
    path: &str,
    e_tag: Option<&str>,
    options: &GetOptions,
) -> Result<(), StoreError> {
    let e_tag = e_tag.unwrap_or("");
    if let Some(expected) = &options.if_match {
        if expected != e_tag {
            return Err(StoreError::Precondition {
                path: path.to_string(),
                reason: format!("if-match `{expected}` does not match etag `{e_tag}`"),
            });
        }
    }
    if let Some(absent) = &options.if_none_match {
        if absent == e_tag {
            return Err(StoreError::Precondition {
                path: path.to_string(),
                reason: format!("if-none-match `{absent}` matches etag `{e_tag}`"),
            });
        }
    }
    Ok(())
}

/// Slice `data` (the full object at `path`) at `range`, validating bounds.
///
/// Shared by the in-memory backend and the caching wrapper so both enforce
/// the same `0 <= start <= end <= size` contract.
pub(crate) fn slice_object(
    path: &str,
    data: &Bytes,
    range: RangeSpec,
) -> Result<Bytes, StoreError> {
    if range.is_empty() {
        return Ok(Bytes::new());
    }
    let size = data.len() as u64;
    let (start, end) = (range.start(), range.end());
    if start > size || end > size {
        return Err(StoreError::OutOfRange {
            path: path.to_string(),
            start,
            end,
            size,
        });
    }
    Ok(data.slice(start as usize..end as usize))
}
