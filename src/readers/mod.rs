//! File-like readers over object stores.
//!
//! Readers adapt the store's byte-range interface to the `read`/`seek`/`tell`
//! contract expected by binary-format libraries (HDF5, NetCDF, Zarr). Each
//! strategy is tuned to an access pattern:
//!
//! - [`BufferedReader`]: mostly-sequential reads with a single read-ahead
//!   buffer.
//! - [`EagerReader`]: loads the whole object up front for repeated random
//!   access.
//! - [`BlockReader`]: block-aligned LRU cache for sparse access to large
//!   objects; the primary random-access reader.
//! - [`BlockingReader`]: bridges any reader to `std::io::Read + Seek` via a
//!   dedicated background runtime.
//!
//! Readers are not thread-safe; share a store between readers, not a reader
//! between threads.

mod block;
mod blocking;
mod buffered;
mod eager;

use std::io::SeekFrom;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;

pub use block::{BlockReader, DEFAULT_BLOCK_SIZE, DEFAULT_MAX_CACHED_BLOCKS};
#[allow(deprecated)]
pub use block::ParallelReader;
pub use blocking::BlockingReader;
pub use buffered::{BufferedReader, DEFAULT_BUFFER_SIZE};
pub use eager::{EagerOptions, EagerReader};

/// File-like read access to a single object.
///
/// For any successful `read`, the returned bytes are exactly
/// `object[position .. min(position + len, size)]` and the position advances
/// by the returned length. `tell` reports the position the next `read` will
/// start from.
#[async_trait]
pub trait StoreReader: Send {
    /// Read up to `len` bytes from the current position, clamped to the end
    /// of the object. `read(0)` and reads at or past EOF return empty bytes
    /// without touching the store.
    async fn read(&mut self, len: usize) -> Result<Bytes, StoreError>;

    /// Read from the current position to the end of the object, leaving the
    /// position at EOF.
    async fn read_to_end(&mut self) -> Result<Bytes, StoreError>;

    /// Move the position. Positions resolving below zero clamp to 0; seeking
    /// past the end is permitted and makes the next `read` return empty.
    /// Returns the new absolute position.
    async fn seek(&mut self, pos: SeekFrom) -> Result<u64, StoreError>;

    /// The current position.
    fn tell(&self) -> u64;

    /// Release internal buffers and caches. Reading after `close` behaves as
    /// if the caches were simply cold.
    fn close(&mut self);
}

/// Resolve a seek target against the current position and object size,
/// clamping below-zero results to 0.
pub(crate) fn resolve_seek(position: u64, size: u64, pos: SeekFrom) -> u64 {
    let target: i128 = match pos {
        SeekFrom::Start(offset) => offset as i128,
        SeekFrom::Current(delta) => position as i128 + delta as i128,
        SeekFrom::End(delta) => size as i128 + delta as i128,
    };
    target.max(0) as u64
}
