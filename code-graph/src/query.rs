//! Structured, parameterized traversal queries returning JSON rows.
//!
//! The engine is embedded, so there is no query-string dialect to forward;
//! callers pass a typed query and get row objects back, bounded in depth.

use crate::model::{EdgeLabel, GraphNode};
use crate::store::CodeGraph;
use petgraph::Direction;
use petgraph::stable_graph::NodeIndex;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{HashSet, VecDeque};

/// Traversal depth cap; cycles are common and must terminate.
pub const MAX_TRAVERSAL_DEPTH: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GraphQuery {
    /// Transitive callers of a symbol up to `depth`.
    Callers { name: String, depth: usize },
    /// Transitive callees of a symbol up to `depth`.
    Callees { name: String, depth: usize },
    FileDependents { path: String },
    FileDependencies { path: String },
    SymbolsInFile { path: String },
    SymbolsByKind { kind: String },
}

impl CodeGraph {
    /// Run a traversal query; rows are plain JSON objects.
    pub fn query(&self, query: &GraphQuery) -> Vec<Value> {
        match query {
            GraphQuery::Callers { name, depth } => {
                self.traverse_calls(name, *depth, Direction::Incoming)
            }
            GraphQuery::Callees { name, depth } => {
                self.traverse_calls(name, *depth, Direction::Outgoing)
            }
            GraphQuery::FileDependents { path } => self
                .get_file_dependents(path)
                .into_iter()
                .map(|p| json!({ "file": p }))
                .collect(),
            GraphQuery::FileDependencies { path } => self
                .get_file_dependencies(path)
                .into_iter()
                .map(|p| json!({ "target": p }))
                .collect(),
            GraphQuery::SymbolsInFile { path } => self
                .symbols_in_file(path)
                .into_iter()
                .map(|s| serde_json::to_value(s).unwrap_or(Value::Null))
                .collect(),
            GraphQuery::SymbolsByKind { kind } => self
                .inner()
                .node_indices()
                .filter_map(|idx| match &self.inner()[idx] {
                    GraphNode::Symbol(s) if s.kind == *kind => {
                        serde_json::to_value(s).ok()
                    }
                    _ => None,
                })
                .collect(),
        }
    }

    /// Bounded-depth BFS over `CALLS` edges.
    fn traverse_calls(&self, name: &str, depth: usize, direction: Direction) -> Vec<Value> {
        let depth = depth.clamp(1, MAX_TRAVERSAL_DEPTH);
        let mut rows = Vec::new();
        let mut seen: HashSet<NodeIndex> = HashSet::new();
        let mut queue: VecDeque<(NodeIndex, usize)> = VecDeque::new();

        for start in self.symbols_named(name) {
            seen.insert(start);
            queue.push_back((start, 0));
        }

        while let Some((idx, level)) = queue.pop_front() {
            if level >= depth {
                continue;
            }
            for edge in self.inner().edges_directed(idx, direction) {
                if edge.weight().label != EdgeLabel::Calls {
                    continue;
                }
                let next = match direction {
                    Direction::Incoming => edge.source(),
                    Direction::Outgoing => edge.target(),
                };
                let row = match &self.inner()[next] {
                    GraphNode::Symbol(s) => json!({
                        "qualified_name": s.qualified_name,
                        "name": s.name,
                        "file": s.file,
                        "kind": s.kind,
                        "depth": level + 1,
                        "line": edge.weight().line,
                        "is_conditional": edge.weight().is_conditional.unwrap_or(false),
                    }),
                    GraphNode::External { name } => json!({
                        "external": name,
                        "depth": level + 1,
                        "line": edge.weight().line,
                    }),
                    _ => continue,
                };
                rows.push(row);
                if seen.insert(next) {
                    queue.push_back((next, level + 1));
                }
            }
        }
        rows
    }
}
