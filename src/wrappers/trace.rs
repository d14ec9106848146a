//! Request tracing wrapper.
//!
//! [`TracingStore`] records every store call into an append-only
//! [`RequestTrace`], useful for debugging, profiling, and visualizing access
//! patterns. Records are appended even when the delegate fails, so traces
//! reflect failed attempts.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::StoreError;
use crate::store::{
    GetOptions, GetResult, ObjectMeta, ObjectStore, RangeSpec, RangeStyle,
};

/// The store operation a trace record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceMethod {
    Get,
    GetRange,
    GetRanges,
    Head,
}

/// Record of a single logical range request.
///
/// `duration` measures the time spent in the store method call, in seconds.
/// A `get_ranges` call producing N records carries `total_duration / N` on
/// each.
#[derive(Debug, Clone, Serialize)]
pub struct RequestRecord {
    pub path: String,
    pub start: u64,
    pub length: u64,
    /// `start + length`.
    pub end: u64,
    /// Wall-clock timestamp at call entry.
    pub timestamp: DateTime<Utc>,
    /// Seconds spent in the delegate.
    pub duration: Option<f64>,
    pub method: TraceMethod,
    /// How the caller expressed the range, when the operation had one.
    pub range_style: Option<RangeStyle>,
}

/// Aggregate statistics over a trace, derived on demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceSummary {
    pub total_requests: usize,
    pub total_bytes: u64,
    pub unique_paths: usize,
    pub min_request_size: Option<u64>,
    pub max_request_size: Option<u64>,
    pub mean_request_size: Option<f64>,
}

/// An append-only log of request records.
///
/// Appends are thread-safe; stop issuing traced calls before reading
/// aggregate statistics if a consistent snapshot matters.
#[derive(Debug, Default)]
pub struct RequestTrace {
    records: Mutex<Vec<RequestRecord>>,
}

impl RequestTrace {
    /// Create an empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn add(&self, record: RequestRecord) {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).push(record);
    }

    /// Remove all recorded requests.
    pub fn clear(&self) {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Number of recorded requests.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all records, in append order.
    pub fn records(&self) -> Vec<RequestRecord> {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Total bytes requested across all records.
    pub fn total_bytes(&self) -> u64 {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|r| r.length)
            .sum()
    }

    /// Aggregate statistics.
    pub fn summary(&self) -> TraceSummary {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        if records.is_empty() {
            return TraceSummary {
                total_requests: 0,
                total_bytes: 0,
                unique_paths: 0,
                min_request_size: None,
                max_request_size: None,
                mean_request_size: None,
            };
        }

        let paths: HashSet<&str> = records.iter().map(|r| r.path.as_str()).collect();
        let lengths: Vec<u64> = records.iter().map(|r| r.length).collect();
        let total: u64 = lengths.iter().sum();
        TraceSummary {
            total_requests: records.len(),
            total_bytes: total,
            unique_paths: paths.len(),
            min_request_size: lengths.iter().min().copied(),
            max_request_size: lengths.iter().max().copied(),
            mean_request_size: Some(total as f64 / lengths.len() as f64),
        }
    }

    /// Tabular export as a JSON array with columns
    /// `path, start, length, end, timestamp, duration, method, range_style`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let records = self.records();
        serde_json::to_string(&records)
    }
}

/// Callback invoked for every appended record.
pub type RequestCallback = Arc<dyn Fn(&RequestRecord) + Send + Sync>;

/// A wrapper that traces every call made to the wrapped store.
///
/// Each operation is wrapped in a timing scope; `get_ranges` appends one
/// record per requested range, splitting the total duration evenly across
/// them. Records land in the shared [`RequestTrace`] before any error
/// propagates, and the optional per-record callback fires for each.
pub struct TracingStore<S: ObjectStore> {
    inner: S,
    trace: Arc<RequestTrace>,
    on_request: Option<RequestCallback>,
}

impl<S: ObjectStore> TracingStore<S> {
    /// Wrap `inner`, recording into `trace`.
    pub fn new(inner: S, trace: Arc<RequestTrace>) -> Self {
        Self {
            inner,
            trace,
            on_request: None,
        }
    }

    /// Invoke `callback` for every appended record (e.g. live logging).
    pub fn with_callback(mut self, callback: RequestCallback) -> Self {
        self.on_request = Some(callback);
        self
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// The trace this store records into.
    pub fn trace(&self) -> Arc<RequestTrace> {
        self.trace.clone()
    }

    fn record(
        &self,
        path: &str,
        start: u64,
        length: u64,
        timestamp: DateTime<Utc>,
        duration: f64,
        method: TraceMethod,
        range_style: Option<RangeStyle>,
    ) {
        let record = RequestRecord {
            path: path.to_string(),
            start,
            length,
            end: start + length,
            timestamp,
            duration: Some(duration),
            method,
            range_style,
        };
        if let Some(callback) = &self.on_request {
            callback(&record);
        }
        self.trace.add(record);
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for TracingStore<S> {
    async fn get_opts(&self, path: &str, options: GetOptions) -> Result<GetResult, StoreError> {
        let timestamp = Utc::now();
        let started = Instant::now();
        let requested_range = options.range;
        let result = self.inner.get_opts(path, options).await;
        let duration = started.elapsed().as_secs_f64();

        let (start, length) = match (&result, requested_range) {
            (_, Some(range)) => (range.start(), range.len()),
            (Ok(r), None) => (0, r.meta.size),
            (Err(_), None) => (0, 0),
        };
        self.record(
            path,
            start,
            length,
            timestamp,
            duration,
            TraceMethod::Get,
            requested_range.map(|r| r.style()),
        );
        result
    }

    async fn get_range(&self, path: &str, range: RangeSpec) -> Result<Bytes, StoreError> {
        let timestamp = Utc::now();
        let started = Instant::now();
        let result = self.inner.get_range(path, range).await;
        let duration = started.elapsed().as_secs_f64();

        self.record(
            path,
            range.start(),
            range.len(),
            timestamp,
            duration,
            TraceMethod::GetRange,
            Some(range.style()),
        );
        result
    }

    async fn get_ranges(
        &self,
        path: &str,
        ranges: &[RangeSpec],
    ) -> Result<Vec<Bytes>, StoreError> {
        let timestamp = Utc::now();
        let started = Instant::now();
        let result = self.inner.get_ranges(path, ranges).await;
        let duration = started.elapsed().as_secs_f64();

        let per_request = if ranges.is_empty() {
            0.0
        } else {
            duration / ranges.len() as f64
        };
        for range in ranges {
            self.record(
                path,
                range.start(),
                range.len(),
                timestamp,
                per_request,
                TraceMethod::GetRanges,
                Some(range.style()),
            );
        }
        result
    }

    async fn head(&self, path: &str) -> Result<ObjectMeta, StoreError> {
        let timestamp = Utc::now();
        let started = Instant::now();
        let result = self.inner.head(path).await;
        let duration = started.elapsed().as_secs_f64();

        // HEAD transfers no body.
        self.record(path, 0, 0, timestamp, duration, TraceMethod::Head, None);
        result
    }

    fn prefix(&self) -> Option<&str> {
        self.inner.prefix()
    }
}
