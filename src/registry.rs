//! URL-to-store routing.
//!
//! [`ObjectStoreRegistry`] maps URLs to pre-configured stores through a
//! per-`(scheme, authority)` trie of path segments. Registrations at nested
//! paths coexist; resolution picks the deepest registered node whose path is
//! a segment-bounded prefix of the URL's path.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::error::RegistryError;
use crate::store::ObjectStore;

/// A URL's scheme and authority, the primary key of the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UrlKey {
    pub scheme: String,
    pub authority: String,
}

impl UrlKey {
    /// Extract the key from a URL. Fails when the URL cannot be parsed
    /// (URLs without a scheme cannot).
    pub fn parse(url: &str) -> Result<(Self, Url), RegistryError> {
        let parsed = Url::parse(url).map_err(|e| RegistryError::InvalidUrl {
            url: url.to_string(),
            message: format!("urls must carry a scheme (e.g. `s3://` or `file://`): {e}"),
        })?;
        let key = Self {
            scheme: parsed.scheme().to_string(),
            authority: parsed.authority().to_string(),
        };
        Ok((key, parsed))
    }
}

/// A node in the path-segment trie.
///
/// Registering `/` => store1 and `/foo/bar` => store2 produces:
///
/// ```text
/// store: Some(store1)
/// children:
///   foo:
///     store: None
///     children:
///       bar:
///         store: Some(store2)
/// ```
#[derive(Default)]
struct PathEntry {
    store: Option<Arc<dyn ObjectStore>>,
    children: HashMap<String, PathEntry>,
}

impl PathEntry {
    /// Walk `path`, returning the store of the deepest node that has one.
    fn lookup(&self, path: &str) -> Option<Arc<dyn ObjectStore>> {
        let mut current = self;
        let mut found = self.store.clone();

        for segment in path_segments(path) {
            match current.children.get(segment) {
                Some(child) => {
                    current = child;
                    if current.store.is_some() {
                        found = current.store.clone();
                    }
                }
                None => break,
            }
        }
        found
    }

    fn iter_stores<'a>(&'a self, out: &mut Vec<&'a Arc<dyn ObjectStore>>) {
        if let Some(store) = &self.store {
            out.push(store);
        }
        for child in self.children.values() {
            child.iter_stores(out);
        }
    }
}

/// A registry that maps URLs to object stores.
///
/// Entries are created at configuration time and are read-only at runtime;
/// registered stores are shared (`Arc`) and long-lived.
///
/// ```ignore
/// let mut registry = ObjectStoreRegistry::new();
/// registry.register("s3://my-bucket", Arc::new(s3_store))?;
/// registry.register("https://example.com/data", Arc::new(http_store))?;
///
/// let (store, path) = registry.resolve("s3://my-bucket/group/file.nc")?;
/// let data = store.get_range(&path, RangeSpec::with_length(0, 1024)).await?;
/// ```
#[derive(Default)]
pub struct ObjectStoreRegistry {
    map: HashMap<UrlKey, PathEntry>,
}

impl ObjectStoreRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `store` under `url`, replacing any store previously
    /// registered at exactly that URL.
    pub fn register(
        &mut self,
        url: &str,
        store: Arc<dyn ObjectStore>,
    ) -> Result<(), RegistryError> {
        let (key, parsed) = UrlKey::parse(url)?;

        let mut entry = self.map.entry(key).or_default();
        for segment in path_segments(parsed.path()) {
            entry = entry.children.entry(segment.to_string()).or_default();
        }
        entry.store = Some(store);
        Ok(())
    }

    /// Resolve `url` to a registered store and the object path to hand it.
    ///
    /// Among overlapping registrations the longest segment-bounded prefix
    /// wins. The returned path is the URL's path with its leading `/`
    /// removed; when the store advertises an internal prefix
    /// ([`ObjectStore::prefix`]), that prefix is stripped as well.
    pub fn resolve(&self, url: &str) -> Result<(Arc<dyn ObjectStore>, String), RegistryError> {
        let (key, parsed) = UrlKey::parse(url)?;
        let path = parsed.path();

        let store = self
            .map
            .get(&key)
            .and_then(|entry| entry.lookup(path))
            .ok_or_else(|| RegistryError::NoMatchingStore(url.to_string()))?;

        let trailing = path.trim_start_matches('/');
        let trailing = match store.prefix() {
            // Strip only at a segment boundary: prefix `foo` must not eat
            // into `foobar/x`.
            Some(prefix) => match trailing.strip_prefix(prefix.trim_matches('/')) {
                Some(rest) if rest.is_empty() || rest.starts_with('/') => {
                    rest.trim_start_matches('/')
                }
                _ => trailing,
            },
            None => trailing,
        };

        debug!(url, path = trailing, "resolved url");
        Ok((store, trailing.to_string()))
    }

    /// All registered stores, in no particular order.
    pub fn stores(&self) -> Vec<Arc<dyn ObjectStore>> {
        let mut out = Vec::new();
        for entry in self.map.values() {
            entry.iter_stores(&mut out);
        }
        out.into_iter().cloned().collect()
    }

    /// Number of registered stores.
    pub fn len(&self) -> usize {
        self.stores().len()
    }

    /// True when nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// The non-empty segments of a path.
fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}
