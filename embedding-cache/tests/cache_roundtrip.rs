//! Disk round-trip and corruption-handling tests.

use embedding_cache::{CacheConfig, EmbeddingCache};
use tempfile::TempDir;

fn config(dir: &TempDir) -> CacheConfig {
    CacheConfig::new(dir.path().join("embeddings"), "nomic-embed-text", 4)
}

fn vector(seed: f32) -> Vec<f32> {
    vec![seed, seed + 0.5, -seed, seed * 2.0]
}

#[tokio::test]
async fn set_close_reopen_get_is_bit_exact() {
    let dir = TempDir::new().unwrap();
    let v = vector(1.25);

    let mut cache = EmbeddingCache::new(config(&dir));
    let id = cache.set("fn main() {}", &v).await.unwrap();
    cache.close().await.unwrap();

    let mut reopened = EmbeddingCache::new(config(&dir));
    let got = reopened.get("fn main() {}").await.unwrap().unwrap();
    assert_eq!(got, v);
    assert_eq!(reopened.id_for("fn main() {}"), id);
}

#[tokio::test]
async fn same_text_same_model_dedupes_to_one_entry() {
    let dir = TempDir::new().unwrap();
    let mut cache = EmbeddingCache::new(config(&dir));

    cache.set("abc", &vector(1.0)).await.unwrap();
    cache.set("abc", &vector(9.0)).await.unwrap();

    let got = cache.get("abc").await.unwrap().unwrap();
    assert_eq!(got, vector(9.0));
    assert_eq!(cache.stats().await.unwrap().total_entries, 1);
}

#[tokio::test]
async fn whitespace_variants_share_an_entry() {
    let dir = TempDir::new().unwrap();
    let mut cache = EmbeddingCache::new(config(&dir));

    cache.set("a  b\tc", &vector(2.0)).await.unwrap();
    assert!(cache.get(" a b c ").await.unwrap().is_some());
    assert_eq!(cache.stats().await.unwrap().total_entries, 1);
}

#[tokio::test]
async fn deleted_blob_turns_into_miss_and_entry_is_dropped() {
    let dir = TempDir::new().unwrap();
    let mut cache = EmbeddingCache::new(config(&dir));
    let id = cache.set("victim", &vector(3.0)).await.unwrap();
    cache.close().await.unwrap();

    let blob = dir
        .path()
        .join("embeddings")
        .join("vectors")
        .join(format!("{id}.bin"));
    std::fs::remove_file(&blob).unwrap();

    let mut reopened = EmbeddingCache::new(config(&dir));
    assert!(reopened.get("victim").await.unwrap().is_none());
    assert_eq!(reopened.stats().await.unwrap().total_entries, 0);
}

#[tokio::test]
async fn truncated_blob_is_treated_as_corruption() {
    let dir = TempDir::new().unwrap();
    let mut cache = EmbeddingCache::new(config(&dir));
    let id = cache.set("short", &vector(4.0)).await.unwrap();
    cache.close().await.unwrap();

    let blob = dir
        .path()
        .join("embeddings")
        .join("vectors")
        .join(format!("{id}.bin"));
    std::fs::write(&blob, [0u8; 3]).unwrap();

    let mut reopened = EmbeddingCache::new(config(&dir));
    assert!(reopened.get("short").await.unwrap().is_none());
    assert_eq!(reopened.stats().await.unwrap().total_entries, 0);
}

#[tokio::test]
async fn export_clear_import_round_trips() {
    let dir = TempDir::new().unwrap();
    let mut cache = EmbeddingCache::new(config(&dir));
    let v = vector(5.0);
    let id = cache.set("exported text", &v).await.unwrap();

    let bundle = cache.export(Some(&[id.clone()])).await.unwrap();
    assert_eq!(bundle.version, "1.0");
    assert_eq!(bundle.embeddings.len(), 1);

    cache.clear().await.unwrap();
    assert!(cache.get("exported text").await.unwrap().is_none());

    let outcome = cache.import(&bundle).await.unwrap();
    assert_eq!(outcome.imported, 1);
    assert_eq!(outcome.skipped, 0);
    assert_eq!(cache.get("exported text").await.unwrap().unwrap(), v);
}

#[tokio::test]
async fn import_skips_existing_ids_and_rejects_other_models() {
    let dir = TempDir::new().unwrap();
    let mut cache = EmbeddingCache::new(config(&dir));
    cache.set("kept", &vector(6.0)).await.unwrap();

    let bundle = cache.export(None).await.unwrap();
    let outcome = cache.import(&bundle).await.unwrap();
    assert_eq!(outcome.imported, 0);
    assert_eq!(outcome.skipped, 1);

    let mut foreign = bundle.clone();
    foreign.model = "all-minilm".into();
    assert!(cache.import(&foreign).await.is_err());
}

#[tokio::test]
async fn model_change_discards_the_whole_index() {
    let dir = TempDir::new().unwrap();
    let mut cache = EmbeddingCache::new(config(&dir));
    cache.set("old model text", &vector(7.0)).await.unwrap();
    cache.close().await.unwrap();

    let mut other = CacheConfig::new(dir.path().join("embeddings"), "all-minilm", 4);
    other.max_bytes = u64::MAX;
    let mut switched = EmbeddingCache::new(other);
    assert_eq!(switched.stats().await.unwrap().total_entries, 0);
    assert!(switched.get("old model text").await.unwrap().is_none());
}

#[tokio::test]
async fn lru_eviction_removes_least_recently_accessed_first() {
    let dir = TempDir::new().unwrap();
    let mut cache = EmbeddingCache::new(config(&dir));

    cache.set("first", &vector(1.0)).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    cache.set("second", &vector(2.0)).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    // Touch "first" so "second" becomes the LRU victim.
    cache.get("first").await.unwrap();

    // Keep room for exactly one 16-byte vector.
    let evicted = cache.evict_lru(Some(16)).await.unwrap();
    assert_eq!(evicted, 1);
    assert!(cache.get("first").await.unwrap().is_some());
    assert!(cache.get("second").await.unwrap().is_none());
}

#[tokio::test]
async fn batch_lookup_splits_hits_and_misses() {
    let dir = TempDir::new().unwrap();
    let mut cache = EmbeddingCache::new(config(&dir));
    cache.set("hit", &vector(8.0)).await.unwrap();

    let texts = vec!["hit".to_string(), "miss".to_string()];
    let lookup = cache.get_batch(&texts).await.unwrap();

    assert_eq!(lookup.cached.len(), 1);
    assert_eq!(lookup.missing, vec!["miss".to_string()]);
    assert_eq!(lookup.ids.len(), 2);
    assert_eq!(lookup.ids["hit"], cache.id_for("hit"));
}
