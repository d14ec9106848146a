//! Reader strategy tests: the shared read/seek/tell contract across all
//! reader types, plus the fetch patterns each strategy is tuned for.

use std::io::SeekFrom;
use std::sync::Arc;

use rangestore::{
    BlockReader, BufferedReader, EagerOptions, EagerReader, RequestTrace, StoreReader,
    TracingStore,
};

use super::test_utils::{init_tracing, pattern_data, store_with_object, MockStore};

// =============================================================================
// Universal reader contract
// =============================================================================

/// Check the read/seek/tell contract shared by every reader against the
/// known object contents.
async fn check_reader_contract(reader: &mut dyn StoreReader, data: &[u8]) {
    let size = data.len() as u64;

    // Content fidelity at assorted positions and lengths.
    for &(pos, len) in &[
        (0u64, 1usize),
        (0, 16),
        (3, 7),
        (10, 64),
        (size - 1, 1),
        (size / 2, data.len()),
    ] {
        reader.seek(SeekFrom::Start(pos)).await.unwrap();
        let out = reader.read(len).await.unwrap();
        let expected_end = (pos as usize + len).min(data.len());
        assert_eq!(
            &out[..],
            &data[pos as usize..expected_end],
            "read({len}) at {pos}"
        );
        // Position advances by the returned length.
        assert_eq!(reader.tell(), pos + out.len() as u64);
    }

    // Seek resolution from all three reference points.
    assert_eq!(reader.seek(SeekFrom::Start(7)).await.unwrap(), 7);
    assert_eq!(reader.seek(SeekFrom::Current(5)).await.unwrap(), 12);
    assert_eq!(reader.seek(SeekFrom::Current(-12)).await.unwrap(), 0);
    assert_eq!(reader.seek(SeekFrom::End(-3)).await.unwrap(), size - 3);

    // Seeking below zero clamps to 0.
    assert_eq!(reader.seek(SeekFrom::Current(-1000)).await.unwrap(), 0);

    // Seeking past the end is permitted; the read there is empty and the
    // position does not move.
    reader.seek(SeekFrom::Start(size + 100)).await.unwrap();
    assert!(reader.read(10).await.unwrap().is_empty());
    assert_eq!(reader.tell(), size + 100);

    // read(0) returns empty everywhere.
    reader.seek(SeekFrom::Start(0)).await.unwrap();
    assert!(reader.read(0).await.unwrap().is_empty());
    assert_eq!(reader.tell(), 0);

    // read_to_end returns the tail and parks the position at EOF.
    reader.seek(SeekFrom::Start(5)).await.unwrap();
    let tail = reader.read_to_end().await.unwrap();
    assert_eq!(&tail[..], &data[5..]);
    assert_eq!(reader.tell(), size);
}

#[tokio::test]
async fn test_buffered_reader_contract() {
    init_tracing();
    let data = pattern_data(300);
    let store = store_with_object("f", data.clone());
    let mut reader = BufferedReader::with_buffer_size(store, "f", 32);
    check_reader_contract(&mut reader, &data).await;
}

#[tokio::test]
async fn test_block_reader_contract() {
    let data = pattern_data(300);
    let store = store_with_object("f", data.clone());
    let mut reader = BlockReader::with_options(store, "f", 16, 4);
    check_reader_contract(&mut reader, &data).await;
}

#[tokio::test]
async fn test_eager_reader_contract() {
    let data = pattern_data(300);
    let store = store_with_object("f", data.clone());
    let options = EagerOptions {
        request_size: 64,
        ..Default::default()
    };
    let mut reader = EagerReader::with_options(store, "f", options).await.unwrap();
    check_reader_contract(&mut reader, &data).await;
}

#[tokio::test]
async fn test_close_releases_reader_state() {
    let data = pattern_data(128);
    let store = store_with_object("f", data.clone());

    let mut block = BlockReader::with_options(store.clone(), "f", 16, 8);
    block.read(64).await.unwrap();
    assert!(block.cached_blocks() > 0);
    block.close();
    assert_eq!(block.cached_blocks(), 0);

    let mut buffered = BufferedReader::with_buffer_size(store.clone(), "f", 32);
    buffered.read(16).await.unwrap();
    let requests_before = store.get_range_calls();
    buffered.close();
    buffered.seek(SeekFrom::Start(0)).await.unwrap();
    buffered.read(16).await.unwrap();
    assert_eq!(store.get_range_calls(), requests_before + 1);
}

// =============================================================================
// Scenario S1: block reader over a 16-byte object
// =============================================================================

#[tokio::test]
async fn test_block_reader_sixteen_byte_scenario() {
    let store = store_with_object("f", &b"0123456789ABCDEF"[..]);
    let mut reader = BlockReader::with_options(store.clone(), "f", 4, 2);

    reader.seek(SeekFrom::Start(2)).await.unwrap();
    assert_eq!(&reader.read(6).await.unwrap()[..], b"234567");

    reader.seek(SeekFrom::Start(0)).await.unwrap();
    assert_eq!(&reader.read(10).await.unwrap()[..], b"0123456789");
}

#[tokio::test]
async fn test_block_reader_cache_hits_issue_no_requests_through_trace() {
    // Re-reading blocks already in the reader's cache must not reach the
    // store at all, observed through a tracing wrapper.
    let backend = store_with_object("f", &b"0123456789ABCDEF"[..]);
    let trace = Arc::new(RequestTrace::new());
    let traced = TracingStore::new(backend, trace.clone());
    let mut reader = BlockReader::with_options(traced, "f", 4, 4);

    // First round: blocks 0 and 1.
    reader.read(8).await.unwrap();
    let records_after_first = trace.len();
    assert!(records_after_first > 0);

    // Second round over the same blocks: zero new requests.
    reader.seek(SeekFrom::Start(0)).await.unwrap();
    assert_eq!(&reader.read(8).await.unwrap()[..], b"01234567");
    assert_eq!(trace.len(), records_after_first);
}

// =============================================================================
// Scenarios S2 / S3: eager reader part sizing
// =============================================================================

#[tokio::test]
async fn test_eager_reader_part_sizes() {
    // 10 bytes, request_size 4, known size: exactly 3 parts of 4, 4, 2.
    let data = pattern_data(10);
    let store = store_with_object("f", data.clone());
    let options = EagerOptions {
        request_size: 4,
        file_size: Some(10),
        ..Default::default()
    };
    let mut reader = EagerReader::with_options(store.clone(), "f", options)
        .await
        .unwrap();

    assert_eq!(store.fanouts(), vec![vec![(0, 4), (4, 4), (8, 2)]]);
    assert_eq!(store.head_calls(), 0);
    assert_eq!(&reader.read_to_end().await.unwrap()[..], &data[..]);
}

#[tokio::test]
async fn test_eager_reader_concurrency_cap() {
    // 100 bytes, request_size 10 capped at 4 requests: 4 parts of 25.
    let data = pattern_data(100);
    let store = store_with_object("f", data.clone());
    let options = EagerOptions {
        request_size: 10,
        file_size: Some(100),
        max_concurrent_requests: 4,
    };
    let mut reader = EagerReader::with_options(store.clone(), "f", options)
        .await
        .unwrap();

    assert_eq!(
        store.fanouts(),
        vec![vec![(0, 25), (25, 25), (50, 25), (75, 25)]]
    );
    assert_eq!(&reader.read_to_end().await.unwrap()[..], &data[..]);
}

// =============================================================================
// Strategy-specific fetch patterns
// =============================================================================

#[tokio::test]
async fn test_block_reader_batches_misses_into_one_fanout() {
    let data = pattern_data(256);
    let store = store_with_object("f", data.clone());
    let mut reader = BlockReader::with_options(store.clone(), "f", 16, 32);

    // 5 blocks in one read: one get_ranges call with 5 parts.
    reader.seek(SeekFrom::Start(8)).await.unwrap();
    let out = reader.read(72).await.unwrap();
    assert_eq!(&out[..], &data[8..80]);
    let fanouts = store.fanouts();
    assert_eq!(fanouts.len(), 1);
    assert_eq!(fanouts[0].len(), 5);
}

#[tokio::test]
async fn test_buffered_reader_single_fetch_for_sequential_scan() {
    let data = pattern_data(100);
    let store = store_with_object("f", data.clone());
    let mut reader = BufferedReader::with_buffer_size(store.clone(), "f", 100);

    let mut assembled = Vec::new();
    loop {
        let chunk = reader.read(10).await.unwrap();
        if chunk.is_empty() {
            break;
        }
        assembled.extend_from_slice(&chunk);
    }
    assert_eq!(assembled, data);
    assert_eq!(store.get_range_calls(), 1);
}

#[tokio::test]
async fn test_size_fetched_once_per_reader() {
    let store = store_with_object("f", pattern_data(64));
    let mut reader = BlockReader::with_options(store.clone(), "f", 16, 8);

    reader.read(8).await.unwrap();
    reader.seek(SeekFrom::End(0)).await.unwrap();
    reader.seek(SeekFrom::End(-10)).await.unwrap();
    reader.read(4).await.unwrap();
    assert_eq!(store.head_calls(), 1);
}

#[tokio::test]
async fn test_reader_error_leaves_position_unchanged() {
    let store = MockStore::new();
    let mut reader = BlockReader::new(store, "does-not-exist");

    assert!(reader.read(10).await.is_err());
    assert_eq!(reader.tell(), 0);
    assert_eq!(reader.cached_blocks(), 0);
}
