// tests/content_cache.rs

use std::path::Path;
use std::sync::Arc;

use autoscripts::watch::{ContentCache, ContentHash};

#[test]
fn should_run_once_per_content() {
    let cache = ContentCache::new();
    let path = Path::new("/ws/scripts/a.js");

    assert!(cache.should_run(path, "1"));
    assert!(!cache.should_run(path, "1"));
    assert!(cache.should_run(path, "2"));
    assert!(!cache.should_run(path, "2"));
    // Only the latest hash is remembered.
    assert!(cache.should_run(path, "1"));
}

#[test]
fn skip_leaves_the_stored_hash_alone() {
    let cache = ContentCache::new();
    let path = Path::new("/ws/a.js");

    cache.should_run(path, "same");
    let before = cache.hash_of(path);
    assert!(!cache.should_run(path, "same"));

    assert_eq!(cache.hash_of(path), before);
    assert_eq!(before, Some(ContentHash::of("same")));
}

#[test]
fn paths_are_independent() {
    let cache = ContentCache::new();

    assert!(cache.should_run(Path::new("/ws/a.js"), "x"));
    assert!(cache.should_run(Path::new("/ws/b.js"), "x"));
    assert_eq!(cache.len(), 2);
}

#[test]
fn clear_forgets_everything() {
    let cache = ContentCache::new();
    let path = Path::new("/ws/a.js");
    cache.should_run(path, "x");

    cache.clear();

    assert!(cache.is_empty());
    assert!(cache.should_run(path, "x"));
}

#[test]
fn identical_content_hashes_identically() {
    assert_eq!(ContentHash::of("echo hi\n"), ContentHash::of("echo hi\n"));
    assert_ne!(ContentHash::of("echo hi\n"), ContentHash::of("echo hi"));
    assert_eq!(ContentHash::of("").as_bytes().len(), 32);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_with_same_content_run_once() {
    let cache = Arc::new(ContentCache::new());
    let mut handles = Vec::new();

    for _ in 0..16 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            cache.should_run(Path::new("/ws/a.js"), "payload")
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}
