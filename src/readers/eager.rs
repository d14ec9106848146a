use std::io::SeekFrom;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::error::StoreError;
use crate::store::{ObjectStore, RangeSpec};

use super::{resolve_seek, StoreReader};

/// Construction options for [`EagerReader`].
///
/// The defaults (12 MB parts, at most 18 concurrent requests) are tuned for
/// cloud storage throughput.
#[derive(Debug, Clone)]
pub struct EagerOptions {
    /// Target size for each parallel range request.
    pub request_size: u64,
    /// Object size, when already known. Skips the `head` request.
    pub file_size: Option<u64>,
    /// Cap on the number of parallel range requests. When the object would
    /// need more parts than this, part sizes grow to fit.
    pub max_concurrent_requests: u64,
}

impl Default for EagerOptions {
    fn default() -> Self {
        Self {
            request_size: 12 * 1024 * 1024,
            file_size: None,
            max_concurrent_requests: 18,
        }
    }
}

/// A reader that loads the entire object into memory on construction.
///
/// The object is fetched up front, in parallel parts via `get_ranges` when
/// it spans more than one `request_size`, and every subsequent
/// `read`/`seek`/`tell` is served from the resident buffer with no network
/// traffic. Best when most of the object will be read anyway, or when access
/// is repeated and random.
pub struct EagerReader {
    path: String,
    buffer: Bytes,
    position: u64,
}

impl EagerReader {
    /// Fetch `path` with default options.
    pub async fn new<S: ObjectStore>(store: S, path: impl Into<String>) -> Result<Self, StoreError> {
        Self::with_options(store, path, EagerOptions::default()).await
    }

    /// Fetch `path` with explicit options.
    pub async fn with_options<S: ObjectStore>(
        store: S,
        path: impl Into<String>,
        options: EagerOptions,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        let size = match options.file_size {
            Some(size) => size,
            None => store.head(&path).await?.size,
        };

        if size == 0 {
            return Ok(Self {
                path,
                buffer: Bytes::new(),
                position: 0,
            });
        }

        let mut request_size = options.request_size.max(1);
        let mut num_requests = size.div_ceil(request_size);
        if num_requests > options.max_concurrent_requests.max(1) {
            num_requests = options.max_concurrent_requests.max(1);
            request_size = size.div_ceil(num_requests);
        }

        let buffer = if num_requests == 1 {
            // Single request: skip the fan-out overhead.
            store.get(&path).await?.into_bytes()
        } else {
            let parts: Vec<RangeSpec> = (0..num_requests)
                .map(|i| {
                    let start = i * request_size;
                    RangeSpec::with_length(start, request_size.min(size - start))
                })
                .collect();
            debug!(path = %path, size, parts = parts.len(), "eager parallel fetch");
            let results = store.get_ranges(&path, &parts).await?;

            let mut data = BytesMut::with_capacity(size as usize);
            for part in results {
                data.extend_from_slice(&part);
            }
            data.freeze()
        };

        Ok(Self {
            path,
            buffer,
            position: 0,
        })
    }

    /// The object's size (length of the resident buffer).
    pub fn size(&self) -> u64 {
        self.buffer.len() as u64
    }

    /// The path this reader was created for.
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl StoreReader for EagerReader {
    async fn read(&mut self, len: usize) -> Result<Bytes, StoreError> {
        let size = self.buffer.len() as u64;
        if len == 0 || self.position >= size {
            return Ok(Bytes::new());
        }
        let start = self.position as usize;
        let end = (start + len).min(self.buffer.len());
        self.position = end as u64;
        Ok(self.buffer.slice(start..end))
    }

    async fn read_to_end(&mut self) -> Result<Bytes, StoreError> {
        let start = (self.position as usize).min(self.buffer.len());
        self.position = self.buffer.len() as u64;
        Ok(self.buffer.slice(start..))
    }

    async fn seek(&mut self, pos: SeekFrom) -> Result<u64, StoreError> {
        self.position = resolve_seek(self.position, self.buffer.len() as u64, pos);
        Ok(self.position)
    }

    fn tell(&self) -> u64 {
        self.position
    }

    fn close(&mut self) {
        self.buffer = Bytes::new();
    }
}
