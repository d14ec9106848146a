//! Registry resolution tests, including resolution through wrapper stacks.

use std::sync::Arc;

use rangestore::{
    CachingStore, ObjectStore, ObjectStoreRegistry, RangeSpec, RegistryError, SplittingStore,
};

use super::test_utils::{pattern_data, MockStore};

#[tokio::test]
async fn test_resolved_store_serves_reads() {
    let store = MockStore::new();
    store.put("data/file.nc", pattern_data(64));

    let mut registry = ObjectStoreRegistry::new();
    registry.register("s3://bucket", store.clone()).unwrap();

    let (resolved, path) = registry.resolve("s3://bucket/data/file.nc").unwrap();
    assert_eq!(path, "data/file.nc");

    let data = resolved
        .get_range(&path, RangeSpec::with_length(0, 16))
        .await
        .unwrap();
    assert_eq!(&data[..], &pattern_data(64)[..16]);
}

#[tokio::test]
async fn test_nested_registration_scenario() {
    // Registry holding both s3://b and s3://b/foo/bar: the deeper match
    // wins and the full trailing path comes back.
    let shallow = MockStore::new();
    let deep = MockStore::new();
    deep.put("foo/bar/baz.nc", pattern_data(4));

    let mut registry = ObjectStoreRegistry::new();
    registry.register("s3://b", shallow.clone()).unwrap();
    registry.register("s3://b/foo/bar", deep.clone()).unwrap();

    let (resolved, path) = registry.resolve("s3://b/foo/bar/baz.nc").unwrap();
    assert_eq!(path, "foo/bar/baz.nc");

    // The call lands on the deeper store.
    resolved.head(&path).await.unwrap();
    assert_eq!(deep.head_calls(), 1);
    assert_eq!(shallow.head_calls(), 0);
}

#[test]
fn test_store_prefix_stripped_from_resolution() {
    // A store that advertises its internal prefix gets paths relative to it.
    let store = MockStore::with_prefix("foo/bar");

    let mut registry = ObjectStoreRegistry::new();
    registry.register("s3://b/foo/bar", store).unwrap();

    let (_, path) = registry.resolve("s3://b/foo/bar/baz.nc").unwrap();
    assert_eq!(path, "baz.nc");
}

#[test]
fn test_prefix_forwarded_through_wrapper_stack() {
    // prefix() must survive wrapping, or registry resolution through
    // wrapped stores would hand them the wrong paths.
    let backend = MockStore::with_prefix("archive");
    let wrapped = CachingStore::new(SplittingStore::new(backend));

    let mut registry = ObjectStoreRegistry::new();
    registry
        .register("s3://b/archive", Arc::new(wrapped))
        .unwrap();

    let (_, path) = registry.resolve("s3://b/archive/2024/file.nc").unwrap();
    assert_eq!(path, "2024/file.nc");
}

#[test]
fn test_segment_boundary_and_errors() {
    let mut registry = ObjectStoreRegistry::new();
    registry.register("s3://b/foo", MockStore::new()).unwrap();

    // /foo does not match /foobar.
    assert!(matches!(
        registry.resolve("s3://b/foobar/x"),
        Err(RegistryError::NoMatchingStore(_))
    ));

    // Unknown authority.
    assert!(matches!(
        registry.resolve("s3://elsewhere/foo/x"),
        Err(RegistryError::NoMatchingStore(_))
    ));

    // Scheme is mandatory.
    assert!(matches!(
        registry.resolve("not a url"),
        Err(RegistryError::InvalidUrl { .. })
    ));
}

#[tokio::test]
async fn test_https_and_s3_coexist() {
    let s3 = MockStore::new();
    s3.put("x.nc", pattern_data(8));
    let https = MockStore::new();
    https.put("y.nc", pattern_data(8));

    let mut registry = ObjectStoreRegistry::new();
    registry.register("s3://bucket", s3).unwrap();
    registry
        .register("https://example.com/data", https)
        .unwrap();

    let (_, path) = registry.resolve("s3://bucket/x.nc").unwrap();
    assert_eq!(path, "x.nc");

    let (_, path) = registry
        .resolve("https://example.com/data/y.nc")
        .unwrap();
    assert_eq!(path, "data/y.nc");

    assert_eq!(registry.stores().len(), 2);
}
