use std::collections::HashMap;
use std::io::SeekFrom;
use std::num::NonZeroUsize;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use lru::LruCache;
use tracing::trace;

use crate::error::StoreError;
use crate::store::{ObjectStore, RangeSpec};

use super::{resolve_seek, StoreReader};

/// Default block size: 1 MB, tuned for cloud object stores where request
/// overhead is significant.
pub const DEFAULT_BLOCK_SIZE: u64 = 1024 * 1024;

/// Default cache capacity in blocks (64 MB with the default block size).
pub const DEFAULT_MAX_CACHED_BLOCKS: usize = 64;

/// A reader with a block-aligned LRU cache.
///
/// The object is divided into fixed-size blocks addressed by
/// `block_index = offset / block_size`; the block at the tail may be
/// shorter. A read computes the covering block range, fetches all uncached
/// blocks in a single `get_ranges` call, and assembles the result by
/// slicing each block at its overlap with the requested interval.
///
/// Memory stays bounded at `block_size * max_cached_blocks` regardless of
/// object size, which makes this the reader of choice for sparse access to
/// large files (HDF5/NetCDF/Zarr chunk reads). Seeking never invalidates
/// the cache; `close` clears it.
pub struct BlockReader<S: ObjectStore> {
    store: S,
    path: String,
    block_size: u64,
    position: u64,
    size: Option<u64>,
    cache: LruCache<u64, Bytes>,
}

impl<S: ObjectStore> BlockReader<S> {
    /// Create a reader with 1 MB blocks and a 64-block cache.
    pub fn new(store: S, path: impl Into<String>) -> Self {
        Self::with_options(store, path, DEFAULT_BLOCK_SIZE, DEFAULT_MAX_CACHED_BLOCKS)
    }

    /// Create a reader with a custom block size and cache capacity.
    pub fn with_options(
        store: S,
        path: impl Into<String>,
        block_size: u64,
        max_cached_blocks: usize,
    ) -> Self {
        Self {
            store,
            path: path.into(),
            block_size: block_size.max(1),
            position: 0,
            size: None,
            cache: LruCache::new(
                NonZeroUsize::new(max_cached_blocks.max(1)).unwrap(),
            ),
        }
    }

    /// Number of blocks currently cached.
    pub fn cached_blocks(&self) -> usize {
        self.cache.len()
    }

    /// Object size, fetched lazily via `head` and cached for the reader's
    /// lifetime.
    async fn file_size(&mut self) -> Result<u64, StoreError> {
        if let Some(size) = self.size {
            return Ok(size);
        }
        let meta = self.store.head(&self.path).await?;
        self.size = Some(meta.size);
        Ok(meta.size)
    }

    /// Collect the blocks covering `[first, last]`, fetching all uncached
    /// ones in one `get_ranges` call. Touched blocks (hits and fresh
    /// fetches alike) end up most-recently used.
    async fn collect_blocks(
        &mut self,
        first: u64,
        last: u64,
        file_size: u64,
    ) -> Result<HashMap<u64, Bytes>, StoreError> {
        let mut blocks = HashMap::new();
        let mut needed = Vec::new();
        for index in first..=last {
            match self.cache.get(&index) {
                Some(block) => {
                    blocks.insert(index, block.clone());
                }
                None => needed.push(index),
            }
        }

        if !needed.is_empty() {
            let ranges: Vec<RangeSpec> = needed
                .iter()
                .map(|&index| {
                    let start = index * self.block_size;
                    RangeSpec::with_length(start, self.block_size.min(file_size - start))
                })
                .collect();
            trace!(
                path = %self.path,
                hits = blocks.len(),
                misses = needed.len(),
                "fetching uncached blocks"
            );
            let results = self.store.get_ranges(&self.path, &ranges).await?;
            for (index, data) in needed.into_iter().zip(results) {
                self.cache.put(index, data.clone());
                blocks.insert(index, data);
            }
        }

        Ok(blocks)
    }
}

#[async_trait]
impl<S: ObjectStore> StoreReader for BlockReader<S> {
    async fn read(&mut self, len: usize) -> Result<Bytes, StoreError> {
        if len == 0 {
            return Ok(Bytes::new());
        }

        let file_size = self.file_size().await?;
        if self.position >= file_size {
            return Ok(Bytes::new());
        }

        let start = self.position;
        let end = (start + len as u64).min(file_size);
        let first_block = start / self.block_size;
        let last_block = (end - 1) / self.block_size;

        let blocks = self.collect_blocks(first_block, last_block, file_size).await?;

        let mut out = BytesMut::with_capacity((end - start) as usize);
        for index in first_block..=last_block {
            let block = &blocks[&index];
            let block_start = index * self.block_size;
            let local_start = start.saturating_sub(block_start) as usize;
            let local_end = ((end - block_start) as usize).min(block.len());
            out.extend_from_slice(&block[local_start..local_end]);
        }

        self.position += out.len() as u64;
        Ok(out.freeze())
    }

    async fn read_to_end(&mut self) -> Result<Bytes, StoreError> {
        // A full-object read bypasses (and does not populate) the block cache.
        let result = self.store.get(&self.path).await?;
        let data = result.into_bytes();
        let size = data.len() as u64;
        self.size = Some(size);
        let start = self.position.min(size) as usize;
        self.position = size;
        Ok(data.slice(start..))
    }

    async fn seek(&mut self, pos: SeekFrom) -> Result<u64, StoreError> {
        let size = match pos {
            SeekFrom::End(_) => self.file_size().await?,
            _ => 0,
        };
        self.position = resolve_seek(self.position, size, pos);
        Ok(self.position)
    }

    fn tell(&self) -> u64 {
        self.position
    }

    fn close(&mut self) {
        self.cache.clear();
    }
}

/// Deprecated alias for [`BlockReader`], kept for back-compatibility with
/// code written against the chunk-based parameter names.
#[deprecated(since = "0.1.0", note = "use `BlockReader` instead")]
pub type ParallelReader<S> = BlockReader<S>;

impl<S: ObjectStore> BlockReader<S> {
    /// Create a reader using the legacy `chunk_size` / `max_cached_chunks`
    /// parameter names. Behavior is identical to
    /// [`BlockReader::with_options`].
    #[deprecated(
        since = "0.1.0",
        note = "use `BlockReader::with_options` with `block_size`/`max_cached_blocks` instead"
    )]
    pub fn with_chunk_options(
        store: S,
        path: impl Into<String>,
        chunk_size: u64,
        max_cached_chunks: usize,
    ) -> Self {
        Self::with_options(store, path, chunk_size, max_cached_chunks)
    }
}
