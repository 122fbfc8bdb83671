//! Staged-diff classification: symbol deltas, caller impact, conventional
//! commit type and scope.

use crate::diff::parse_unified_diff;
use code_graph::CodeGraph;
use code_parser::ParserRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use tracing::debug;

/// Conventional-commit types the analyzer can suggest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitType {
    Feat,
    Fix,
    Refactor,
    Test,
    Docs,
    Build,
    Ci,
    Chore,
}

impl Display for CommitType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CommitType::Feat => "feat",
            CommitType::Fix => "fix",
            CommitType::Refactor => "refactor",
            CommitType::Test => "test",
            CommitType::Docs => "docs",
            CommitType::Build => "build",
            CommitType::Ci => "ci",
            CommitType::Chore => "chore",
        })
    }
}

/// One symbol in the delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolChange {
    pub name: String,
    pub qualified_name: String,
    pub kind: String,
    pub file: String,
    pub complexity: u32,
    #[serde(default)]
    pub signature: Option<String>,
}

/// An external caller touched by a modified or deleted symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallerRef {
    pub caller: String,
    pub caller_file: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakingChange {
    pub symbol: String,
    pub file: String,
    pub reason: String,
    pub affected_callers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitAnalysis {
    pub files_changed: Vec<String>,
    pub lines_added: usize,
    pub lines_removed: usize,
    pub symbols_added: Vec<SymbolChange>,
    pub symbols_modified: Vec<SymbolChange>,
    pub symbols_deleted: Vec<SymbolChange>,
    pub callers_affected: Vec<CallerRef>,
    pub breaking_changes: Vec<BreakingChange>,
    pub suggested_type: CommitType,
    pub suggested_scope: Option<String>,
    pub complexity_delta: i64,
    pub raw_diff: String,
    /// False when no graph was available: every current symbol is then
    /// reported as added, for template generation only.
    pub graph_baseline: bool,
}

impl CommitAnalysis {
    pub fn is_breaking(&self) -> bool {
        !self.breaking_changes.is_empty()
    }
}

/// One staged file with its post-image content (`None` for deletions).
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub path: String,
    pub content: Option<String>,
}

/// Classify a staged diff.
///
/// `graph` supplies the prior symbol baseline; without it the delta
/// degenerates to "all current symbols added" and `graph_baseline` is false.
pub fn analyze(
    raw_diff: &str,
    staged: &[StagedFile],
    registry: &ParserRegistry,
    graph: Option<&CodeGraph>,
) -> CommitAnalysis {
    let diffs = parse_unified_diff(raw_diff);
    let files_changed: Vec<String> = diffs
        .iter()
        .map(|d| d.path.clone())
        .filter(|p| !p.is_empty())
        .collect();
    let lines_added: usize = diffs.iter().map(|d| d.lines_added()).sum();
    let lines_removed: usize = diffs.iter().map(|d| d.lines_removed()).sum();

    let mut symbols_added = Vec::new();
    let mut symbols_modified = Vec::new();
    let mut symbols_deleted = Vec::new();

    for file in staged {
        let ext = file.path.rsplit('.').next().unwrap_or("");
        if !registry.is_extension_supported(ext) {
            continue;
        }

        let current: Vec<SymbolChange> = match &file.content {
            Some(content) => registry
                .parse_file(&file.path, content, None)
                .symbols
                .iter()
                .map(|s| SymbolChange {
                    name: s.name.clone(),
                    qualified_name: s.qualified_name.clone(),
                    kind: s.kind.to_string(),
                    file: s.file.clone(),
                    complexity: s.complexity,
                    signature: s.signature.clone(),
                })
                .collect(),
            None => Vec::new(),
        };

        match graph {
            Some(graph) => {
                let prior: HashMap<String, code_graph::SymbolRecord> = graph
                    .symbols_in_file(&file.path)
                    .into_iter()
                    .map(|s| (s.qualified_name.clone(), s))
                    .collect();
                let current_names: HashMap<&str, &SymbolChange> = current
                    .iter()
                    .map(|s| (s.qualified_name.as_str(), s))
                    .collect();

                for symbol in &current {
                    match prior.get(&symbol.qualified_name) {
                        None => symbols_added.push(symbol.clone()),
                        Some(old) if old.signature != symbol.signature => {
                            symbols_modified.push(symbol.clone());
                        }
                        Some(_) => {}
                    }
                }
                for (qualified, old) in &prior {
                    if !current_names.contains_key(qualified.as_str()) {
                        symbols_deleted.push(SymbolChange {
                            name: old.name.clone(),
                            qualified_name: old.qualified_name.clone(),
                            kind: old.kind.clone(),
                            file: old.file.clone(),
                            complexity: old.complexity,
                            signature: old.signature.clone(),
                        });
                    }
                }
            }
            None => symbols_added.extend(current),
        }
    }

    let (callers_affected, breaking_changes) =
        caller_impact(graph, &symbols_modified, &symbols_deleted);

    let suggested_type = suggest_type(
        &files_changed,
        lines_added,
        lines_removed,
        symbols_added.len(),
        symbols_modified.len(),
        symbols_deleted.len(),
    );
    let suggested_scope = suggest_scope(&files_changed);

    let complexity_delta = symbols_added.iter().map(|s| s.complexity as i64).sum::<i64>()
        - symbols_deleted.iter().map(|s| s.complexity as i64).sum::<i64>();

    debug!(
        "analysis: {} files, +{lines_added}/-{lines_removed}, type={suggested_type}",
        files_changed.len()
    );

    CommitAnalysis {
        files_changed,
        lines_added,
        lines_removed,
        symbols_added,
        symbols_modified,
        symbols_deleted,
        callers_affected,
        breaking_changes,
        suggested_type,
        suggested_scope,
        complexity_delta,
        raw_diff: raw_diff.to_string(),
        graph_baseline: graph.is_some(),
    }
}

/// Callers outside the defining file, and the breaking changes they imply.
fn caller_impact(
    graph: Option<&CodeGraph>,
    modified: &[SymbolChange],
    deleted: &[SymbolChange],
) -> (Vec<CallerRef>, Vec<BreakingChange>) {
    let Some(graph) = graph else {
        return (Vec::new(), Vec::new());
    };

    let mut callers_affected: Vec<CallerRef> = Vec::new();
    let mut breaking = Vec::new();

    let mut collect = |symbol: &SymbolChange, reason: &str| {
        let external: Vec<CallerRef> = graph
            .get_callers(&symbol.qualified_name)
            .into_iter()
            .filter(|row| row.symbol.file != symbol.file)
            .map(|row| CallerRef {
                caller: row.symbol.qualified_name,
                caller_file: row.symbol.file,
                target: symbol.qualified_name.clone(),
            })
            .collect();

        if !external.is_empty() {
            breaking.push(BreakingChange {
                symbol: symbol.name.clone(),
                file: symbol.file.clone(),
                reason: reason.to_string(),
                affected_callers: external.iter().map(|c| c.caller.clone()).collect(),
            });
        }
        for caller in external {
            if !callers_affected.contains(&caller) {
                callers_affected.push(caller);
            }
        }
    };

    for symbol in deleted {
        collect(symbol, "symbol removed");
    }
    for symbol in modified {
        collect(symbol, "signature changed");
    }

    (callers_affected, breaking)
}

fn suggest_type(
    files: &[String],
    lines_added: usize,
    lines_removed: usize,
    added: usize,
    modified: usize,
    deleted: usize,
) -> CommitType {
    if files.is_empty() {
        return CommitType::Chore;
    }
    if files.iter().all(|p| is_test_path(p)) {
        return CommitType::Test;
    }
    if files.iter().all(|p| is_docs_path(p)) {
        return CommitType::Docs;
    }
    if files.iter().all(|p| is_build_path(p)) {
        return CommitType::Build;
    }
    if files.iter().any(|p| is_ci_path(p)) {
        return CommitType::Ci;
    }
    if lines_removed == 0 && lines_added > 0 {
        if modified > 0 && modified >= 2 * added {
            return CommitType::Refactor;
        }
        return CommitType::Feat;
    }
    if lines_added == 0 && lines_removed > 0 {
        return CommitType::Refactor;
    }
    if added == 0 && deleted == 0 && modified > 0 {
        return CommitType::Fix;
    }
    CommitType::Chore
}

fn is_test_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    let name = lower.rsplit('/').next().unwrap_or(&lower);
    lower.contains(".test.")
        || lower.contains(".spec.")
        || lower.contains("__tests__/")
        || lower.starts_with("tests/")
        || lower.contains("/tests/")
        || name.ends_with("_test.go")
        || (name.starts_with("test_") && name.ends_with(".py"))
}

fn is_docs_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".md")
        || lower.contains("readme")
        || lower.starts_with("docs/")
        || lower.contains("/docs/")
}

fn is_build_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    let name = lower.rsplit('/').next().unwrap_or(&lower);
    name == "package.json"
        || name == "package-lock.json"
        || name.starts_with("tsconfig")
        || name.contains(".config.")
        || name.ends_with(".yaml")
        || name.ends_with(".yml")
}

fn is_ci_path(path: &str) -> bool {
    path.contains(".github/workflows")
        || path.contains(".gitlab-ci")
        || path.contains(".circleci")
        || path.contains("Jenkinsfile")
}

/// Most frequent second directory component under `packages/`/`src/`/`lib/`,
/// falling back to the first directory. Ties break alphabetically.
fn suggest_scope(files: &[String]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for path in files {
        let parts: Vec<&str> = path.split('/').collect();
        let component = if parts.len() > 2 && matches!(parts[0], "packages" | "src" | "lib") {
            parts[1]
        } else if parts.len() > 1 {
            parts[0]
        } else {
            continue;
        };
        *counts.entry(component).or_default() += 1;
    }

    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(a.0)))
        .map(|(component, _)| component.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn all_test_files_suggest_test() {
        let t = suggest_type(&strs(&["src/a.test.ts", "tests/b.spec.ts"]), 30, 0, 3, 0, 0);
        assert_eq!(t, CommitType::Test);
    }

    #[test]
    fn docs_and_build_and_ci() {
        assert_eq!(
            suggest_type(&strs(&["README.md", "docs/guide.md"]), 10, 2, 0, 0, 0),
            CommitType::Docs
        );
        assert_eq!(
            suggest_type(&strs(&["package.json", "tsconfig.json"]), 4, 4, 0, 0, 0),
            CommitType::Build
        );
        assert_eq!(
            suggest_type(
                &strs(&["src/a.ts", ".github/workflows/ci.yml"]),
                4,
                4,
                0,
                0,
                0
            ),
            CommitType::Ci
        );
    }

    #[test]
    fn additions_only_is_feat_unless_modified_dominates() {
        assert_eq!(
            suggest_type(&strs(&["src/a.ts"]), 20, 0, 2, 1, 0),
            CommitType::Feat
        );
        assert_eq!(
            suggest_type(&strs(&["src/a.ts"]), 20, 0, 1, 2, 0),
            CommitType::Refactor
        );
    }

    #[test]
    fn deletions_only_is_refactor_and_pure_modification_is_fix() {
        assert_eq!(
            suggest_type(&strs(&["src/a.ts"]), 0, 12, 0, 0, 2),
            CommitType::Refactor
        );
        assert_eq!(
            suggest_type(&strs(&["src/a.ts"]), 5, 5, 0, 1, 0),
            CommitType::Fix
        );
        assert_eq!(
            suggest_type(&strs(&["src/a.ts"]), 5, 5, 1, 0, 1),
            CommitType::Chore
        );
    }

    #[test]
    fn scope_prefers_second_component_under_src() {
        assert_eq!(
            suggest_scope(&strs(&["src/auth/login.ts", "src/auth/logout.ts", "src/db/pool.ts"])),
            Some("auth".to_string())
        );
        assert_eq!(
            suggest_scope(&strs(&["packages/core/index.ts"])),
            Some("core".to_string())
        );
        assert_eq!(
            suggest_scope(&strs(&["server/main.go"])),
            Some("server".to_string())
        );
        assert_eq!(suggest_scope(&strs(&["README.md"])), None);
    }
}
