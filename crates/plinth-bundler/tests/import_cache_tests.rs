//! Import cache behavior: hits, forced reloads, corrupt entries, failures.

mod helpers;

use helpers::CountingFetcher;
use plinth_bundler::{Error, ImportCache};
use tempfile::TempDir;

const LOCATOR: &str = "https://example/plug.json";

#[tokio::test]
async fn second_resolution_reads_the_cache() {
    let dir = TempDir::new().expect("temp dir");
    let fetcher = CountingFetcher::new();
    fetcher.serve(LOCATOR, r#"{"name": "remote"}"#);
    let cache = ImportCache::new(dir.path().join("cache"), fetcher.clone());

    let first = cache.resolve(LOCATOR, false).await.expect("first");
    let second = cache.resolve(LOCATOR, false).await.expect("second");

    assert_eq!(first, second);
    assert_eq!(fetcher.calls(), 1);
    assert!(dir.path().join("cache/https___example_plug_json").exists());
}

#[tokio::test]
async fn existing_entry_means_no_fetch() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("https___example_plug_json"), r#"{"name": "cached"}"#)
        .expect("seed cache");
    let fetcher = CountingFetcher::new();
    let cache = ImportCache::new(dir.path(), fetcher.clone());

    let doc = cache.resolve(LOCATOR, false).await.expect("cached");
    assert_eq!(doc["name"], "cached");
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn forced_reload_always_fetches_and_overwrites() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("https___example_plug_json"), r#"{"name": "stale"}"#)
        .expect("seed cache");
    let fetcher = CountingFetcher::new();
    fetcher.serve(LOCATOR, r#"{"name": "fresh"}"#);
    let cache = ImportCache::new(dir.path(), fetcher.clone());

    let doc = cache.resolve(LOCATOR, true).await.expect("reload");
    assert_eq!(doc["name"], "fresh");
    cache.resolve(LOCATOR, true).await.expect("reload again");
    assert_eq!(fetcher.calls(), 2);

    let on_disk = cache.resolve(LOCATOR, false).await.expect("cached");
    assert_eq!(on_disk["name"], "fresh");
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn corrupt_entry_is_refetched() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("https___example_plug_json"), "{not json").expect("seed");
    let fetcher = CountingFetcher::new();
    fetcher.serve(LOCATOR, r#"{"name": "repaired"}"#);
    let cache = ImportCache::new(dir.path(), fetcher.clone());

    let doc = cache.resolve(LOCATOR, false).await.expect("refetch");
    assert_eq!(doc["name"], "repaired");
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn fetch_failure_aborts_and_writes_nothing() {
    let dir = TempDir::new().expect("temp dir");
    let fetcher = CountingFetcher::new();
    let cache = ImportCache::new(dir.path().join("cache"), fetcher.clone());

    let err = cache
        .resolve("https://example/missing.json", false)
        .await
        .expect_err("404");
    assert!(matches!(err, Error::Network { .. }));
    assert!(!dir.path().join("cache/https___example_missing_json").exists());
}
