//! # rangestore
//!
//! High-throughput read access to immutable objects in remote blob stores
//! (S3, HTTPS, in-memory) through three composable layers:
//!
//! - **Stores** ([`store`]): a minimal read-only interface (`get`,
//!   `get_range`, `get_ranges`, `head`) over opaque backends.
//! - **Wrappers** ([`wrappers`]): transparent proxies that cache whole
//!   objects, split large fetches into parallel range requests, and trace
//!   every call, without the layers above noticing.
//! - **Readers** ([`readers`]): file-like `read`/`seek`/`tell` adapters
//!   that translate the access patterns of binary-format libraries (HDF5,
//!   NetCDF, Zarr) into efficient range fetches.
//!
//! A [`registry::ObjectStoreRegistry`] routes URLs to configured stores, and
//! [`glob`](glob()) matches shell-style patterns against store listings.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rangestore::{
//!     BlockReader, CachingStore, ObjectStoreRegistry, S3Store, StoreReader,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = CachingStore::new(S3Store::connect("my-bucket", "us-east-1").await);
//!
//! let mut registry = ObjectStoreRegistry::new();
//! registry.register("s3://my-bucket", Arc::new(store))?;
//!
//! let (store, path) = registry.resolve("s3://my-bucket/data/file.nc")?;
//! let mut reader = BlockReader::new(store, path);
//! let header = reader.read(8).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod glob;
pub mod readers;
pub mod registry;
pub mod store;
pub mod wrappers;

// Re-export commonly used types
pub use config::{ClientOptions, DEFAULT_TIMEOUT};
pub use error::{RegistryError, StoreError};
pub use glob::{glob, glob_objects};
pub use readers::{
    BlockReader, BlockingReader, BufferedReader, EagerOptions, EagerReader, StoreReader,
    DEFAULT_BLOCK_SIZE, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_CACHED_BLOCKS,
};
#[allow(deprecated)]
pub use readers::ParallelReader;
pub use registry::{ObjectStoreRegistry, UrlKey};
pub use store::{
    GetOptions, GetResult, HttpStore, MemoryStore, ObjectList, ObjectMeta, ObjectStore, RangeSpec,
    RangeStyle, S3Store,
};
pub use wrappers::{
    CachingStore, RequestCallback, RequestRecord, RequestTrace, SplittingStore, TraceMethod,
    TraceSummary, TracingStore, DEFAULT_CACHE_MAX_SIZE, DEFAULT_MAX_CONCURRENT_REQUESTS,
    DEFAULT_REQUEST_SIZE,
};
