//! Facade behavior: upserts, caller queries, deletion, persistence, ownership.

use code_graph::{
    CallTarget, CodeGraph, EdgeLabel, FileRecord, GraphQuery, ImportTarget, SymbolRecord,
};
use tempfile::TempDir;

fn file(path: &str) -> FileRecord {
    FileRecord {
        path: path.into(),
        language: "typescript".into(),
        lines_of_code: 40,
        complexity: 3,
    }
}

fn symbol(file: &str, name: &str) -> SymbolRecord {
    SymbolRecord {
        name: name.into(),
        qualified_name: format!("{file}:{name}"),
        kind: "function".into(),
        file: file.into(),
        start_line: 1,
        end_line: 5,
        signature: Some(format!("function {name}()")),
        visibility: Some("public".into()),
        is_async: false,
        is_static: false,
        complexity: 1,
    }
}

async fn seeded(dir: &TempDir) -> CodeGraph {
    let mut g = CodeGraph::connect(dir.path().join("graph"), "repo1").await.unwrap();
    g.upsert_file(file("src/a.ts"));
    g.upsert_file(file("src/b.ts"));
    g.upsert_symbol(symbol("src/a.ts", "alpha"));
    g.upsert_symbol(symbol("src/a.ts", "helper"));
    g.upsert_symbol(symbol("src/b.ts", "beta"));
    g.upsert_import("src/a.ts", ImportTarget::File("src/b.ts".into()));
    g.upsert_import("src/a.ts", ImportTarget::Module("react".into()));
    g.upsert_call("src/a.ts:alpha", CallTarget::Symbol("src/b.ts:beta".into()), 3, false);
    g.upsert_call("src/a.ts:alpha", CallTarget::Symbol("src/a.ts:helper".into()), 4, true);
    g.upsert_call("src/b.ts:beta", CallTarget::External("fetch".into()), 2, false);
    g
}

#[tokio::test]
async fn callers_are_exactly_the_calling_symbols() {
    let dir = TempDir::new().unwrap();
    let g = seeded(&dir).await;

    let callers = g.get_callers("beta");
    assert_eq!(callers.len(), 1);
    assert_eq!(callers[0].symbol.qualified_name, "src/a.ts:alpha");
    assert_eq!(callers[0].line, Some(3));

    // Qualified lookup works too.
    let callers = g.get_callers("src/b.ts:beta");
    assert_eq!(callers.len(), 1);

    assert!(g.get_callers("alpha").is_empty());
}

#[tokio::test]
async fn callees_include_externals() {
    let dir = TempDir::new().unwrap();
    let g = seeded(&dir).await;

    let callees = g.get_callees("alpha");
    assert_eq!(callees.len(), 2);
    assert!(callees.iter().any(|c| c.callee == "beta" && c.symbol.is_some()));
    let helper = callees.iter().find(|c| c.callee == "helper").unwrap();
    assert!(helper.is_conditional);

    let beta_callees = g.get_callees("beta");
    assert_eq!(beta_callees.len(), 1);
    assert!(beta_callees[0].symbol.is_none());
}

#[tokio::test]
async fn file_dependency_queries() {
    let dir = TempDir::new().unwrap();
    let g = seeded(&dir).await;

    assert_eq!(g.get_file_dependents("src/b.ts"), vec!["src/a.ts"]);
    let deps = g.get_file_dependencies("src/a.ts");
    assert!(deps.contains(&"src/b.ts".to_string()));
    assert!(deps.contains(&"react".to_string()));
}

#[tokio::test]
async fn delete_file_drops_owned_symbols() {
    let dir = TempDir::new().unwrap();
    let mut g = seeded(&dir).await;

    g.delete_file("src/b.ts");

    assert!(g.symbols_in_file("src/b.ts").is_empty());
    assert!(g.get_callers("beta").is_empty());
    // Symbols of other files stay.
    assert_eq!(g.symbols_in_file("src/a.ts").len(), 2);
}

#[tokio::test]
async fn save_and_reload_round_trips() {
    let dir = TempDir::new().unwrap();
    {
        let mut g = seeded(&dir).await;
        g.save().await.unwrap();
    }

    let g = CodeGraph::connect(dir.path().join("graph"), "repo1").await.unwrap();
    assert!(g.ownership_mismatch().is_none());
    let stats = g.get_stats();
    assert_eq!(stats.files, 2);
    assert_eq!(stats.symbols, 3);
    assert_eq!(stats.modules, 1);
    assert_eq!(stats.externals, 1);
    assert_eq!(stats.call_edges, 3);

    let callers = g.get_callers("beta");
    assert_eq!(callers.len(), 1);
    assert_eq!(callers[0].symbol.qualified_name, "src/a.ts:alpha");
}

#[tokio::test]
async fn foreign_ownership_is_surfaced_not_overwritten() {
    let dir = TempDir::new().unwrap();
    {
        let mut g = seeded(&dir).await;
        g.save().await.unwrap();
    }

    let g = CodeGraph::connect(dir.path().join("graph"), "other-repo").await.unwrap();
    let mismatch = g.ownership_mismatch().expect("mismatch expected");
    assert_eq!(mismatch.repo_id, "repo1");
    assert_eq!(g.get_ownership().unwrap().repo_id, "repo1");
}

#[tokio::test]
async fn multi_edge_calls_between_same_pair_are_kept() {
    let dir = TempDir::new().unwrap();
    let mut g = seeded(&dir).await;

    // Same pair, different call sites.
    g.upsert_call("src/a.ts:alpha", CallTarget::Symbol("src/b.ts:beta".into()), 9, true);
    let callers = g.get_callers("beta");
    assert_eq!(callers.len(), 2);

    // Re-upserting an identical site stays idempotent.
    g.upsert_call("src/a.ts:alpha", CallTarget::Symbol("src/b.ts:beta".into()), 9, true);
    assert_eq!(g.get_callers("beta").len(), 2);
}

#[tokio::test]
async fn bounded_depth_query_handles_cycles() {
    let dir = TempDir::new().unwrap();
    let mut g = CodeGraph::connect(dir.path().join("graph"), "repo1").await.unwrap();
    g.upsert_file(file("src/cycle.ts"));
    g.upsert_symbol(symbol("src/cycle.ts", "ping"));
    g.upsert_symbol(symbol("src/cycle.ts", "pong"));
    g.upsert_call("src/cycle.ts:ping", CallTarget::Symbol("src/cycle.ts:pong".into()), 2, false);
    g.upsert_call("src/cycle.ts:pong", CallTarget::Symbol("src/cycle.ts:ping".into()), 3, false);

    let rows = g.query(&GraphQuery::Callers {
        name: "ping".into(),
        depth: 100,
    });
    // Mutual recursion terminates and reports both directions once.
    assert!(!rows.is_empty());
    assert!(rows.len() <= 4);
}

#[tokio::test]
async fn relations_connect_symbols() {
    let dir = TempDir::new().unwrap();
    let mut g = CodeGraph::connect(dir.path().join("graph"), "repo1").await.unwrap();
    g.upsert_file(file("src/t.ts"));
    let mut base = symbol("src/t.ts", "Base");
    base.kind = "class".into();
    let mut derived = symbol("src/t.ts", "Derived");
    derived.kind = "class".into();
    g.upsert_symbol(base);
    g.upsert_symbol(derived);
    g.upsert_relation("src/t.ts:Derived", "src/t.ts:Base", EdgeLabel::Extends);

    let rows = g.query(&GraphQuery::SymbolsByKind {
        kind: "class".into(),
    });
    assert_eq!(rows.len(), 2);
}
