//! Shared test utilities: counting mock stores over in-memory objects.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use bytes::Bytes;
use rangestore::{
    GetOptions, GetResult, MemoryStore, ObjectList, ObjectMeta, ObjectStore, RangeSpec, StoreError,
};

static TRACING: Once = Once::new();

/// Install a log subscriber once, honoring `RUST_LOG` for test debugging.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// A store that serves objects from memory while counting every call that
/// reaches the backend and recording `get_ranges` fan-out geometry.
pub struct MockStore {
    inner: MemoryStore,
    prefix: Option<String>,
    get_calls: AtomicUsize,
    get_range_calls: AtomicUsize,
    get_ranges_calls: AtomicUsize,
    head_calls: AtomicUsize,
    fanouts: Mutex<Vec<Vec<(u64, u64)>>>,
}

impl MockStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new(),
            prefix: None,
            get_calls: AtomicUsize::new(0),
            get_range_calls: AtomicUsize::new(0),
            get_ranges_calls: AtomicUsize::new(0),
            head_calls: AtomicUsize::new(0),
            fanouts: Mutex::new(Vec::new()),
        })
    }

    /// A store advertising an internal prefix, for registry tests.
    pub fn with_prefix(prefix: &str) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new(),
            prefix: Some(prefix.to_string()),
            get_calls: AtomicUsize::new(0),
            get_range_calls: AtomicUsize::new(0),
            get_ranges_calls: AtomicUsize::new(0),
            head_calls: AtomicUsize::new(0),
            fanouts: Mutex::new(Vec::new()),
        })
    }

    pub fn put(&self, path: &str, data: impl Into<Bytes>) {
        self.inner.put(path, data.into());
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn get_range_calls(&self) -> usize {
        self.get_range_calls.load(Ordering::SeqCst)
    }

    pub fn get_ranges_calls(&self) -> usize {
        self.get_ranges_calls.load(Ordering::SeqCst)
    }

    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }

    /// Total data-transferring requests (head excluded).
    pub fn data_requests(&self) -> usize {
        self.get_calls() + self.get_range_calls() + self.get_ranges_calls()
    }

    /// The `(start, length)` geometry of every `get_ranges` call, in order.
    pub fn fanouts(&self) -> Vec<Vec<(u64, u64)>> {
        self.fanouts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MockStore {
    async fn get_opts(&self, path: &str, options: GetOptions) -> Result<GetResult, StoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_opts(path, options).await
    }

    async fn get_range(&self, path: &str, range: RangeSpec) -> Result<Bytes, StoreError> {
        self.get_range_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_range(path, range).await
    }

    async fn get_ranges(&self, path: &str, ranges: &[RangeSpec]) -> Result<Vec<Bytes>, StoreError> {
        self.get_ranges_calls.fetch_add(1, Ordering::SeqCst);
        self.fanouts
            .lock()
            .unwrap()
            .push(ranges.iter().map(|r| (r.start(), r.len())).collect());
        self.inner.get_ranges(path, ranges).await
    }

    async fn head(&self, path: &str) -> Result<ObjectMeta, StoreError> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.head(path).await
    }

    fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }
}

#[async_trait]
impl ObjectList for MockStore {
    async fn list(&self, prefix: Option<&str>) -> Result<Vec<ObjectMeta>, StoreError> {
        self.inner.list(prefix).await
    }
}

/// A mock store pre-seeded with one object.
pub fn store_with_object(path: &str, data: impl Into<Bytes>) -> Arc<MockStore> {
    let store = MockStore::new();
    store.put(path, data.into());
    store
}

/// Deterministic test payload of `len` bytes.
pub fn pattern_data(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
