//! Transparent store wrappers.
//!
//! Each wrapper implements [`crate::store::ObjectStore`] over another store,
//! so they compose freely:
//!
//! ```ignore
//! let store = S3Store::new(client, "my-bucket");
//! let store = SplittingStore::new(store);   // parallel full-object fetches
//! let store = CachingStore::new(store);     // cache the results
//! let store = TracingStore::new(store, trace.clone()); // observe everything
//! ```
//!
//! Wrappers expose the wrapped store through `inner()` and forward
//! [`crate::store::ObjectStore::prefix`], so registry resolution works
//! through any stack of them.

mod cache;
mod split;
mod trace;

pub use cache::{CachingStore, DEFAULT_CACHE_MAX_SIZE};
pub use split::{SplittingStore, DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_REQUEST_SIZE};
pub use trace::{
    RequestCallback, RequestRecord, RequestTrace, TraceMethod, TraceSummary, TracingStore,
};
