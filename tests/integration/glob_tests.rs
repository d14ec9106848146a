//! Glob matching over store listings, checked against the file sets the
//! patterns are meant for.

use rangestore::{glob, glob_objects, MemoryStore};

fn seeded(paths: &[&str]) -> MemoryStore {
    let store = MemoryStore::new();
    for path in paths {
        store.put(*path, &b"payload"[..]);
    }
    store
}

async fn sorted_glob(store: &MemoryStore, pattern: &str) -> Vec<String> {
    let mut found = glob(store, pattern).await.unwrap();
    found.sort();
    found
}

#[tokio::test]
async fn test_year_and_recursive_pattern() {
    // data/202?/**/temp_*.nc over a mixed tree.
    let store = seeded(&[
        "data/2024/01/temp_x.nc",
        "data/2024/perm_x.nc",
        "data/2023/temp_y.nc",
        "data/2022/sub/temp_z.nc",
    ]);

    assert_eq!(
        sorted_glob(&store, "data/202?/**/temp_*.nc").await,
        vec![
            "data/2022/sub/temp_z.nc",
            "data/2023/temp_y.nc",
            "data/2024/01/temp_x.nc",
        ]
    );
}

#[tokio::test]
async fn test_double_star_matches_zero_segments() {
    let store = seeded(&["data/file.x", "data/a/b/file.x", "data/file.y"]);

    assert_eq!(
        sorted_glob(&store, "data/**/*.x").await,
        vec!["data/a/b/file.x", "data/file.x"]
    );
}

#[tokio::test]
async fn test_single_star_is_segment_bounded() {
    let store = seeded(&["data/a.nc", "data/sub/b.nc", "data/c.txt"]);

    assert_eq!(sorted_glob(&store, "data/*.nc").await, vec!["data/a.nc"]);
    assert_eq!(
        sorted_glob(&store, "data/*/*.nc").await,
        vec!["data/sub/b.nc"]
    );
}

#[tokio::test]
async fn test_character_classes_and_question_mark() {
    let store = seeded(&[
        "run_a/out.nc",
        "run_b/out.nc",
        "run_c/out.nc",
        "run_10/out.nc",
    ]);

    assert_eq!(
        sorted_glob(&store, "run_[ab]/out.nc").await,
        vec!["run_a/out.nc", "run_b/out.nc"]
    );
    assert_eq!(
        sorted_glob(&store, "run_[!ab]/out.nc").await,
        vec!["run_c/out.nc"]
    );
    assert_eq!(
        sorted_glob(&store, "run_?/out.nc").await,
        vec!["run_a/out.nc", "run_b/out.nc", "run_c/out.nc"]
    );
}

#[tokio::test]
async fn test_prefix_limits_listing() {
    // Objects outside the literal prefix never match.
    let store = seeded(&["data/2024/a.nc", "backup/data/2024/a.nc"]);

    assert_eq!(
        sorted_glob(&store, "data/2024/*.nc").await,
        vec!["data/2024/a.nc"]
    );
}

#[tokio::test]
async fn test_glob_objects_carries_sizes() {
    let store = MemoryStore::new();
    store.put("data/a.nc", vec![0u8; 123]);
    store.put("data/b.nc", vec![0u8; 456]);

    let mut objects = glob_objects(&store, "data/*.nc").await.unwrap();
    objects.sort_by(|a, b| a.path.cmp(&b.path));
    assert_eq!(objects.len(), 2);
    assert_eq!(objects[0].size, 123);
    assert_eq!(objects[1].size, 456);
    assert!(objects.iter().all(|m| m.e_tag.is_some()));
}

#[tokio::test]
async fn test_terminal_double_star() {
    let store = seeded(&["logs/a", "logs/x/y/z", "data/a"]);

    assert_eq!(
        sorted_glob(&store, "logs/**").await,
        vec!["logs/a", "logs/x/y/z"]
    );
}
