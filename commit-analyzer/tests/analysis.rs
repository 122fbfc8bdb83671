//! Analysis behavior against a seeded graph baseline.

use code_graph::{CallTarget, CodeGraph, FileRecord, SymbolRecord};
use code_parser::ParserRegistry;
use commit_analyzer::{CommitType, StagedFile, analyze, generate_template_message};
use tempfile::TempDir;

fn registry() -> ParserRegistry {
    ParserRegistry::with_defaults()
}

fn symbol(file: &str, name: &str, signature: &str) -> SymbolRecord {
    SymbolRecord {
        name: name.into(),
        qualified_name: format!("{file}:{name}"),
        kind: "function".into(),
        file: file.into(),
        start_line: 1,
        end_line: 3,
        signature: Some(signature.into()),
        visibility: Some("public".into()),
        is_async: false,
        is_static: false,
        complexity: 2,
    }
}

/// Graph with `notify` defined in lib.ts and called from two other files.
async fn seeded_graph(dir: &TempDir) -> CodeGraph {
    let mut g = CodeGraph::connect(dir.path().join("graph"), "repo").await.unwrap();
    for path in ["src/lib.ts", "src/app.ts", "src/cli.ts"] {
        g.upsert_file(FileRecord {
            path: path.into(),
            language: "typescript".into(),
            lines_of_code: 20,
            complexity: 2,
        });
    }
    g.upsert_symbol(symbol("src/lib.ts", "notify", "function notify(msg)"));
    g.upsert_symbol(symbol("src/app.ts", "main", "function main()"));
    g.upsert_symbol(symbol("src/cli.ts", "run", "function run()"));
    g.upsert_call(
        "src/app.ts:main",
        CallTarget::Symbol("src/lib.ts:notify".into()),
        5,
        false,
    );
    g.upsert_call(
        "src/cli.ts:run",
        CallTarget::Symbol("src/lib.ts:notify".into()),
        9,
        true,
    );
    g
}

#[test]
fn test_only_diff_suggests_test_type() {
    let raw = "diff --git a/src/math.test.ts b/src/math.test.ts\nnew file mode 100644\n--- /dev/null\n+++ b/src/math.test.ts\n@@ -0,0 +1,3 @@\n+test('adds', () => {\n+  expect(add(1, 2)).toBe(3);\n+});\n";
    let staged = [StagedFile {
        path: "src/math.test.ts".into(),
        content: Some("test('adds', () => {\n  expect(add(1, 2)).toBe(3);\n});\n".into()),
    }];
    let analysis = analyze(raw, &staged, &registry(), None);

    assert_eq!(analysis.suggested_type, CommitType::Test);
    assert_eq!(analysis.lines_added, 3);
    assert_eq!(analysis.lines_removed, 0);
    assert!(!analysis.graph_baseline);
}

#[tokio::test]
async fn deleted_function_with_two_external_callers_is_breaking() {
    let dir = TempDir::new().unwrap();
    let graph = seeded_graph(&dir).await;

    // lib.ts loses `notify` entirely.
    let raw = "diff --git a/src/lib.ts b/src/lib.ts\n--- a/src/lib.ts\n+++ b/src/lib.ts\n@@ -1,3 +0,0 @@\n-export function notify(msg) {\n-  console.log(msg);\n-}\n";
    let staged = [StagedFile {
        path: "src/lib.ts".into(),
        content: Some("".into()),
    }];
    let analysis = analyze(raw, &staged, &registry(), Some(&graph));

    assert!(analysis.is_breaking());
    assert_eq!(analysis.breaking_changes.len(), 1);
    assert_eq!(analysis.breaking_changes[0].affected_callers.len(), 2);
    assert_eq!(analysis.symbols_deleted.len(), 1);
    assert!(matches!(
        analysis.suggested_type,
        CommitType::Refactor | CommitType::Feat
    ));
    assert_eq!(analysis.callers_affected.len(), 2);
    // Removing a complexity-2 symbol drops the total.
    assert_eq!(analysis.complexity_delta, -2);
}

#[tokio::test]
async fn signature_change_with_external_callers_is_breaking() {
    let dir = TempDir::new().unwrap();
    let graph = seeded_graph(&dir).await;

    let raw = "diff --git a/src/lib.ts b/src/lib.ts\n--- a/src/lib.ts\n+++ b/src/lib.ts\n@@ -1,3 +1,3 @@\n-export function notify(msg) {\n+export function notify(msg, level) {\n   console.log(msg);\n }\n";
    let staged = [StagedFile {
        path: "src/lib.ts".into(),
        content: Some("export function notify(msg, level) {\n  console.log(msg);\n}\n".into()),
    }];
    let analysis = analyze(raw, &staged, &registry(), Some(&graph));

    assert_eq!(analysis.symbols_modified.len(), 1);
    assert!(analysis.symbols_deleted.is_empty());
    assert!(analysis.is_breaking());
    assert_eq!(analysis.breaking_changes[0].reason, "signature changed");
    assert_eq!(analysis.suggested_type, CommitType::Fix);

    let msg = generate_template_message(&analysis);
    assert!(msg.subject.starts_with("fix"));
    assert!(msg.breaking.unwrap().contains("BREAKING CHANGE"));
}

#[tokio::test]
async fn unchanged_symbols_are_not_reported() {
    let dir = TempDir::new().unwrap();
    let graph = seeded_graph(&dir).await;

    let raw = "diff --git a/src/lib.ts b/src/lib.ts\n--- a/src/lib.ts\n+++ b/src/lib.ts\n@@ -1,3 +1,3 @@\n export function notify(msg) {\n-  console.log(msg);\n+  console.warn(msg);\n }\n";
    let staged = [StagedFile {
        path: "src/lib.ts".into(),
        content: Some("export function notify(msg) {\n  console.warn(msg);\n}\n".into()),
    }];
    let analysis = analyze(raw, &staged, &registry(), Some(&graph));

    assert!(analysis.symbols_added.is_empty());
    assert!(analysis.symbols_modified.is_empty());
    assert!(analysis.symbols_deleted.is_empty());
    assert!(!analysis.is_breaking());
}

#[test]
fn graphless_mode_reports_current_symbols_as_added() {
    let raw = "diff --git a/src/new.ts b/src/new.ts\nnew file mode 100644\n--- /dev/null\n+++ b/src/new.ts\n@@ -0,0 +1,1 @@\n+export function fresh() {}\n";
    let staged = [StagedFile {
        path: "src/new.ts".into(),
        content: Some("export function fresh() {}".into()),
    }];
    let analysis = analyze(raw, &staged, &registry(), None);

    assert!(!analysis.graph_baseline);
    assert_eq!(analysis.symbols_added.len(), 1);
    assert_eq!(analysis.symbols_added[0].name, "fresh");
    assert_eq!(analysis.suggested_type, CommitType::Feat);
}
