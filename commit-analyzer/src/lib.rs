//! Commit analyzer: staged diff -> symbol delta -> caller impact ->
//! conventional-commit classification and a deterministic message template.
//!
//! Consumes the graph read-only and is independent of sync.

mod analyzer;
mod diff;
mod errors;
mod staged;
mod template;

pub use analyzer::{
    BreakingChange, CallerRef, CommitAnalysis, CommitType, StagedFile, SymbolChange, analyze,
};
pub use diff::{DiffHunk, DiffLine, FileDiff, parse_unified_diff};
pub use errors::{AnalyzeError, Result};
pub use staged::staged_changes;
pub use template::{CommitMessage, generate_template_message};

use code_graph::CodeGraph;
use code_parser::ParserRegistry;
use std::path::Path;

/// Analyze whatever is currently staged in the repository at `repo_root`.
pub fn analyze_staged(
    repo_root: &Path,
    registry: &ParserRegistry,
    graph: Option<&CodeGraph>,
) -> Result<CommitAnalysis> {
    let (raw, staged) = staged_changes(repo_root)?;
    Ok(analyze(&raw, &staged, registry, graph))
}
