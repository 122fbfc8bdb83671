//! End-to-end sync against live backends.
//!
//! These tests need a local qdrant (QDRANT_URL) and a reachable embedding
//! backend; they are ignored by default and run explicitly with
//! `cargo test -- --ignored` on a machine with the services up.

use code_graph::CodeGraph;
use code_parser::{ParserOptions, ParserRegistry};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use sync_engine::{SyncEngine, SyncOptions};
use tempfile::TempDir;
use vector_store::{PayloadFilter, VectorConfig, VectorManager};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

async fn engine_for(dir: &TempDir) -> SyncEngine {
    let state_dir = dir.path().join(".cv");
    let registry = Arc::new(ParserRegistry::new(ParserOptions::default()));

    let mut config = VectorConfig::from_env().expect("QDRANT_URL must be set");
    config.repo_id = Some("e2e_test_repo".into());
    config.cache_dir = state_dir.join("embeddings");
    let mut vectors = VectorManager::new(config);
    vectors.connect().await.expect("vector backend");

    let graph = CodeGraph::connect(state_dir.join("graph"), "e2e_test_repo")
        .await
        .unwrap();

    SyncEngine::new(
        dir.path(),
        "e2e_test_repo",
        state_dir.join("sync-state.json"),
        registry,
        graph,
        vectors,
    )
}

#[tokio::test]
#[ignore = "requires local qdrant and an embedding backend"]
async fn full_sync_then_incremental_delete_empties_file_state() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "src/math.ts",
        "export function add(a: number, b: number): number {\n  return a + b;\n}\n",
    );
    write(
        dir.path(),
        "src/app.ts",
        "import { add } from './math';\n\nexport function main() {\n  return add(1, 2);\n}\n",
    );

    let mut engine = engine_for(&dir).await;
    let state = engine.full_sync(&SyncOptions::default()).await.unwrap();
    assert_eq!(state.files_indexed, 2);
    assert!(state.chunks_embedded >= 2);
    assert!(engine.graph().get_callers("add").len() == 1);

    // Remove a file and sync incrementally.
    fs::remove_file(dir.path().join("src/math.ts")).unwrap();
    let state = engine
        .incremental_sync(&["src/math.ts".to_string()], &SyncOptions::default())
        .await
        .unwrap();
    assert_eq!(state.files_indexed, 1);
    assert!(engine.graph().symbols_in_file("src/math.ts").is_empty());

    let vectors = engine.vectors_mut().unwrap();
    let collection = vectors.collection("code_chunks");
    let hits = vectors
        .search(
            &collection,
            "add two numbers",
            10,
            Some(PayloadFilter::ByFile("src/math.ts".into())),
            None,
        )
        .await
        .unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
#[ignore = "requires local qdrant and an embedding backend"]
async fn full_sync_twice_is_stable() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "lib.py",
        "def greet(name):\n    \"\"\"Say hello.\"\"\"\n    return f\"hi {name}\"\n",
    );

    let mut engine = engine_for(&dir).await;
    let first = engine.full_sync(&SyncOptions::default()).await.unwrap();
    let second = engine.full_sync(&SyncOptions::default()).await.unwrap();

    assert_eq!(first.files_indexed, second.files_indexed);
    assert_eq!(first.symbols_indexed, second.symbols_indexed);
    let stats = engine.graph().get_stats();
    assert_eq!(stats.files, 1);
    assert_eq!(stats.symbols, 1);
}
