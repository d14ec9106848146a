//! Wrapper composition tests: caching, splitting, and tracing stacked in
//! the arrangements the library is designed around.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rangestore::{
    BlockReader, CachingStore, ObjectStore, RangeSpec, RequestTrace, SplittingStore, StoreReader,
    TraceMethod, TracingStore,
};

use super::test_utils::{init_tracing, pattern_data, store_with_object};

// =============================================================================
// Scenario S4: caching wrapper eviction order
// =============================================================================

#[tokio::test]
async fn test_caching_wrapper_eviction_scenario() {
    init_tracing();
    let backend = store_with_object("1", pattern_data(100));
    backend.put("2", pattern_data(100));
    backend.put("3", pattern_data(100));
    let cached = CachingStore::with_max_size(backend.clone(), 200);

    cached.get("1").await.unwrap();
    cached.get("2").await.unwrap();
    cached.get("1").await.unwrap();
    cached.get("3").await.unwrap();

    // Survivors are {1, 3}: 1 is the older entry, 3 the newest.
    assert_eq!(cached.cached_paths().await, vec!["1", "3"]);
    assert!(cached.cache_size().await <= 200);
}

// =============================================================================
// Splitting under caching (the recommended composition)
// =============================================================================

#[tokio::test]
async fn test_split_fetch_fills_cache_once() {
    let data = pattern_data(100);
    let backend = store_with_object("big.bin", data.clone());
    let store = CachingStore::new(SplittingStore::with_options(backend.clone(), 25, 18));

    // First access: head + one parallel fan-out, then cached.
    let first = store.get("big.bin").await.unwrap();
    assert_eq!(&first.bytes()[..], &data[..]);
    assert_eq!(backend.fanouts(), vec![vec![(0, 25), (25, 25), (50, 25), (75, 25)]]);

    // Second access and range reads: served from cache, no new backend work.
    let data_requests = backend.data_requests();
    store.get("big.bin").await.unwrap();
    let slice = store
        .get_range("big.bin", RangeSpec::with_length(30, 40))
        .await
        .unwrap();
    assert_eq!(&slice[..], &data[30..70]);
    assert_eq!(backend.data_requests(), data_requests);
}

#[tokio::test]
async fn test_block_reader_over_full_wrapper_stack() {
    let data = pattern_data(64);
    let backend = store_with_object("f", data.clone());
    let trace = Arc::new(RequestTrace::new());
    let store = TracingStore::new(
        CachingStore::new(SplittingStore::with_options(backend.clone(), 16, 8)),
        trace.clone(),
    );

    let mut reader = BlockReader::with_options(store, "f", 8, 4);
    let mut out = Vec::new();
    for _ in 0..8 {
        out.extend_from_slice(&reader.read(8).await.unwrap());
    }
    assert_eq!(out, data);

    // The trace observed the reader's calls; the backend served exactly one
    // split fetch regardless of how many block requests arrived above it.
    assert!(trace.len() > 0);
    assert_eq!(backend.get_ranges_calls(), 1);
}

// =============================================================================
// Tracing across wrapper layers
// =============================================================================

#[tokio::test]
async fn test_trace_between_reader_and_cache_sees_hits_disappear() {
    // Tracing placed *above* the cache: once the object is cached, repeated
    // range requests still appear in the trace but no longer reach the
    // backend.
    let data = pattern_data(50);
    let backend = store_with_object("f", data.clone());
    let trace = Arc::new(RequestTrace::new());
    let store = TracingStore::new(CachingStore::new(backend.clone()), trace.clone());

    store
        .get_range("f", RangeSpec::with_length(0, 10))
        .await
        .unwrap();
    store
        .get_range("f", RangeSpec::with_length(10, 10))
        .await
        .unwrap();

    let records = trace.records();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.method == TraceMethod::GetRange));
    // Only the first range request triggered a backend fetch.
    assert_eq!(backend.get_calls(), 1);
    assert_eq!(backend.get_range_calls(), 0);
}

#[tokio::test]
async fn test_trace_callback_streams_records_live() {
    let backend = store_with_object("f", pattern_data(40));
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let trace = Arc::new(RequestTrace::new());
    let store = TracingStore::new(backend, trace.clone()).with_callback(Arc::new(move |record| {
        assert_eq!(record.path, "f");
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    store.head("f").await.unwrap();
    store
        .get_ranges(
            "f",
            &[RangeSpec::with_length(0, 8), RangeSpec::with_length(8, 8)],
        )
        .await
        .unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 3);
    assert_eq!(trace.len(), 3);
}

// =============================================================================
// Wrapper transparency
// =============================================================================

#[tokio::test]
async fn test_wrappers_forward_head_and_metadata() {
    let data = pattern_data(77);
    let backend = store_with_object("f", data);
    let store = TracingStore::new(
        CachingStore::new(SplittingStore::new(backend.clone())),
        Arc::new(RequestTrace::new()),
    );

    let meta = store.head("f").await.unwrap();
    assert_eq!(meta.size, 77);
    // head never populates the cache.
    assert_eq!(backend.get_calls(), 0);
}

#[tokio::test]
async fn test_wrapped_results_match_plain_results() {
    let data = pattern_data(200);
    let backend = store_with_object("f", data.clone());
    let wrapped = CachingStore::new(SplittingStore::with_options(backend.clone(), 32, 4));

    let ranges = [
        RangeSpec::with_length(0, 10),
        RangeSpec::end_at(50, 120),
        RangeSpec::with_length(190, 10),
    ];
    let plain = backend.get_ranges("f", &ranges).await.unwrap();
    let via_wrappers = wrapped.get_ranges("f", &ranges).await.unwrap();
    assert_eq!(plain, via_wrappers);
}
