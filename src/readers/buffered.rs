use std::io::SeekFrom;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::trace;

use crate::error::StoreError;
use crate::store::{ObjectStore, RangeSpec};

use super::{resolve_seek, StoreReader};

/// Default read-ahead buffer size: 1 MB.
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// A reader with a single contiguous read-ahead buffer.
///
/// Best for forward-sequential workloads with small backward seeks: reads
/// fully contained in the current buffer are served without a request, and
/// every miss replaces the buffer with one `get_range` of
/// `max(len, buffer_size)` bytes starting at the current position (clamped
/// to the end of the object). A seek beyond the buffer simply discards it on
/// the next read.
pub struct BufferedReader<S: ObjectStore> {
    store: S,
    path: String,
    buffer_size: usize,
    position: u64,
    size: Option<u64>,
    buffer: Bytes,
    buffer_start: u64,
}

impl<S: ObjectStore> BufferedReader<S> {
    /// Create a reader with the default 1 MB read-ahead buffer.
    pub fn new(store: S, path: impl Into<String>) -> Self {
        Self::with_buffer_size(store, path, DEFAULT_BUFFER_SIZE)
    }

    /// Create a reader with a custom read-ahead buffer size.
    pub fn with_buffer_size(store: S, path: impl Into<String>, buffer_size: usize) -> Self {
        Self {
            store,
            path: path.into(),
            buffer_size,
            position: 0,
            size: None,
            buffer: Bytes::new(),
            buffer_start: 0,
        }
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
}

#[async_trait]
impl<S: ObjectStore> StoreReader for BufferedReader<S> {
    async fn read(&mut self, len: usize) -> Result<Bytes, StoreError> {
        if len == 0 {
            return Ok(Bytes::new());
        }

        // Serve from the buffer when the request is fully contained.
        let buffer_end = self.buffer_start + self.buffer.len() as u64;
        if self.position >= self.buffer_start && self.position < buffer_end {
            let offset = (self.position - self.buffer_start) as usize;
            let available = self.buffer.len() - offset;
            if available >= len {
                let data = self.buffer.slice(offset..offset + len);
                self.position += len as u64;
                return Ok(data);
            }
        }

        let size = self.file_size().await?;
        if self.position >= size {
            return Ok(Bytes::new());
        }

        // Fetch at least the buffer size ahead, clamped to EOF.
        let remaining = size - self.position;
        let fetch_len = (len.max(self.buffer_size) as u64).min(remaining);
        trace!(
            path = %self.path,
            position = self.position,
            fetch_len,
            "read-ahead fetch"
        );
        let data = self
            .store
            .get_range(&self.path, RangeSpec::with_length(self.position, fetch_len))
            .await?;

        self.buffer = data.clone();
        self.buffer_start = self.position;

        let result = data.slice(0..len.min(data.len()));
        self.position += result.len() as u64;
        Ok(result)
    }

    async fn read_to_end(&mut self) -> Result<Bytes, StoreError> {
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
        self.buffer = Bytes::new();
        self.buffer_start = 0;
    }
}
