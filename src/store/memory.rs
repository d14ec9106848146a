use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::StoreError;

use super::{
    check_preconditions, slice_object, GetOptions, GetResult, ObjectList, ObjectMeta, ObjectStore,
    RangeSpec,
};

/// An in-memory object store.
///
/// Primarily used in tests and as the reference implementation of the store
/// contract. Objects are seeded with [`MemoryStore::put`]; reads treat the
/// contents as immutable, matching the crate-wide assumption.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, Entry>>,
}

#[derive(Debug, Clone)]
struct Entry {
    data: Bytes,
    last_modified: DateTime<Utc>,
    e_tag: String,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object, replacing any previous object at `path`.
    pub fn put(&self, path: impl Into<String>, data: impl Into<Bytes>) {
        let path = path.into();
        let data = data.into();
        let e_tag = format!("\"{:x}-{}\"", fnv1a(&data), data.len());
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        objects.insert(
            path,
            Entry {
                data,
                last_modified: Utc::now(),
                e_tag,
            },
        );
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// True when no objects are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, path: &str) -> Result<Entry, StoreError> {
        self.objects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    fn meta_for(&self, path: &str, entry: &Entry) -> ObjectMeta {
        ObjectMeta {
            path: path.to_string(),
            size: entry.data.len() as u64,
            last_modified: entry.last_modified,
            e_tag: Some(entry.e_tag.clone()),
            version: None,
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_opts(&self, path: &str, options: GetOptions) -> Result<GetResult, StoreError> {
        let entry = self.entry(path)?;
        check_preconditions(path, Some(&entry.e_tag), &options)?;
        let meta = self.meta_for(path, &entry);
        match options.range {
            Some(range) => {
                let payload = slice_object(path, &entry.data, range)?;
                Ok(GetResult::new(payload, meta, range.as_range()))
            }
            None => {
                let size = entry.data.len() as u64;
                Ok(GetResult::new(entry.data, meta, 0..size))
            }
        }
    }

    async fn get_range(&self, path: &str, range: RangeSpec) -> Result<Bytes, StoreError> {
        if range.is_empty() {
            return Ok(Bytes::new());
        }
        let entry = self.entry(path)?;
        slice_object(path, &entry.data, range)
    }

    async fn get_ranges(
        &self,
        path: &str,
        ranges: &[RangeSpec],
    ) -> Result<Vec<Bytes>, StoreError> {
        let entry = self.entry(path)?;
        ranges
            .iter()
            .map(|range| slice_object(path, &entry.data, *range))
            .collect()
    }

    async fn head(&self, path: &str) -> Result<ObjectMeta, StoreError> {
        let entry = self.entry(path)?;
        Ok(self.meta_for(path, &entry))
    }
}

#[async_trait]
impl ObjectList for MemoryStore {
    async fn list(&self, prefix: Option<&str>) -> Result<Vec<ObjectMeta>, StoreError> {
        let objects = self.objects.read().unwrap_or_else(|e| e.into_inner());
        Ok(objects
            .iter()
            .filter(|(path, _)| prefix.map_or(true, |p| path.starts_with(p)))
            .map(|(path, entry)| self.meta_for(path, entry))
            .collect())
    }
}

/// FNV-1a, used to synthesize stable ETags for stored objects.
fn fnv1a(data: &[u8]) -> u64 {
    let mut hash = 0xcbf29ce484222325u64;
    for &byte in data {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}
