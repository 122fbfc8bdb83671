//! Graph schema: node and edge types shared by the store and its persistence.
//!
//! Edges serialize to snake_case strings so the JSONL artifacts stay stable
//! and grep-friendly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A node in the code graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphNode {
    File(FileRecord),
    Symbol(SymbolRecord),
    Module(ModuleRecord),
    Commit(CommitRecord),
    /// Placeholder for a callee that resolved to nothing inside the repo.
    External { name: String },
}

impl GraphNode {
    /// Stable lookup key, unique per node.
    pub fn key(&self) -> String {
        match self {
            GraphNode::File(f) => format!("file:{}", f.path),
            GraphNode::Symbol(s) => format!("sym:{}", s.qualified_name),
            GraphNode::Module(m) => format!("module:{}", m.path),
            GraphNode::Commit(c) => format!("commit:{}", c.sha),
            GraphNode::External { name } => format!("ext:{name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub language: String,
    pub lines_of_code: usize,
    /// Sum of symbol complexities in the file.
    pub complexity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub name: String,
    /// `"{file}:[Owner.]{name}"`, unique per repo per sync.
    pub qualified_name: String,
    pub kind: String,
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub is_async: bool,
    #[serde(default)]
    pub is_static: bool,
    pub complexity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleRecord {
    /// Module specifier or package name (`react`, `std::fs`).
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub ts: DateTime<Utc>,
}

/// Relationship label. Avoid renaming variants; they are part of exported
/// artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeLabel {
    Defines,
    Calls,
    Imports,
    Implements,
    Extends,
}

/// One edge; `line`/`is_conditional` are populated for `Calls` only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub label: EdgeLabel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_conditional: Option<bool>,
}

impl GraphEdge {
    pub fn plain(label: EdgeLabel) -> Self {
        Self {
            label,
            line: None,
            is_conditional: None,
        }
    }

    pub fn call(line: usize, is_conditional: bool) -> Self {
        Self {
            label: EdgeLabel::Calls,
            line: Some(line),
            is_conditional: Some(is_conditional),
        }
    }
}

/// Singleton ownership marker tying a graph directory to a working copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ownership {
    pub repo_id: String,
    pub created_at: DateTime<Utc>,
}

/// Aggregate counts for `get_stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub files: usize,
    pub symbols: usize,
    pub modules: usize,
    pub commits: usize,
    pub externals: usize,
    pub edges: usize,
    pub call_edges: usize,
}

/// A resolved call edge with its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRow {
    pub symbol: SymbolRecord,
    pub line: Option<usize>,
    pub is_conditional: bool,
}
