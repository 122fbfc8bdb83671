//! Typed facade over the embedded property graph.
//!
//! All writes go through this facade and are serialized by `&mut self`; the
//! sync engine shares one handle per sync. Cycles between symbols are plain
//! graph cycles; traversal helpers are bounded-depth and never chase them
//! into in-memory object cycles.

use crate::errors::Result;
use crate::model::{
    CallRow, CommitRecord, EdgeLabel, FileRecord, GraphEdge, GraphNode, GraphStats, ModuleRecord,
    Ownership, SymbolRecord,
};
use crate::persist;
use chrono::Utc;
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Where an import edge points.
#[derive(Debug, Clone)]
pub enum ImportTarget {
    /// Repo-local file.
    File(String),
    /// External package/module.
    Module(String),
}

/// Where a call edge points.
#[derive(Debug, Clone)]
pub enum CallTarget {
    /// Qualified name of a symbol already in the graph.
    Symbol(String),
    /// Unresolved callee; lands on a placeholder node.
    External(String),
}

/// A callee as seen from one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct CalleeRow {
    pub callee: String,
    /// Present when the callee resolved to a repo symbol.
    pub symbol: Option<SymbolRecord>,
    pub line: Option<usize>,
    pub is_conditional: bool,
}

pub struct CodeGraph {
    dir: PathBuf,
    repo_id: String,
    graph: StableDiGraph<GraphNode, GraphEdge>,
    by_key: HashMap<String, NodeIndex>,
    /// Bare symbol name -> nodes; methods across files share names.
    by_symbol_name: HashMap<String, Vec<NodeIndex>>,
    ownership: Option<Ownership>,
    ownership_mismatch: Option<Ownership>,
    dirty: bool,
}

impl CodeGraph {
    /// Open (or initialize) the graph stored under `dir`.
    ///
    /// A persisted graph owned by a different repo is surfaced through
    /// [`Self::ownership_mismatch`] and never silently overwritten.
    pub async fn connect(dir: impl Into<PathBuf>, repo_id: &str) -> Result<Self> {
        let dir = dir.into();
        let mut store = Self {
            dir,
            repo_id: repo_id.to_string(),
            graph: StableDiGraph::new(),
            by_key: HashMap::new(),
            by_symbol_name: HashMap::new(),
            ownership: None,
            ownership_mismatch: None,
            dirty: false,
        };

        if let Some((graph, ownership)) = persist::load(&store.dir).await? {
            store.graph = graph;
            store.rebuild_indexes();
            if let Some(owner) = ownership {
                if owner.repo_id != repo_id {
                    warn!(
                        "graph at {} is owned by repo {} (expected {}); refusing to relabel",
                        store.dir.display(),
                        owner.repo_id,
                        repo_id
                    );
                    store.ownership_mismatch = Some(owner.clone());
                }
                store.ownership = Some(owner);
            }
        }
        Ok(store)
    }

    /// The ownership marker found on disk when it names a different repo.
    pub fn ownership_mismatch(&self) -> Option<&Ownership> {
        self.ownership_mismatch.as_ref()
    }

    pub fn get_ownership(&self) -> Option<&Ownership> {
        self.ownership.as_ref()
    }

    /// Claim the graph for `repo_id`. Called on first write.
    pub fn set_ownership(&mut self, repo_id: &str) {
        self.ownership = Some(Ownership {
            repo_id: repo_id.to_string(),
            created_at: Utc::now(),
        });
        self.dirty = true;
    }

    /// Drop every node and edge. Ownership is re-established on first write.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.by_key.clear();
        self.by_symbol_name.clear();
        self.ownership = None;
        self.dirty = true;
        info!("graph cleared");
    }

    /// Persist when dirty.
    pub async fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        persist::save(&self.dir, &self.graph, self.ownership.as_ref()).await?;
        self.dirty = false;
        Ok(())
    }

    pub async fn close(&mut self) -> Result<()> {
        self.save().await
    }

    // ---- upserts -----------------------------------------------------------

    fn mark_written(&mut self) {
        self.dirty = true;
        if self.ownership.is_none() {
            let repo_id = self.repo_id.clone();
            self.set_ownership(&repo_id);
        }
    }

    fn ensure_node(&mut self, node: GraphNode) -> NodeIndex {
        let key = node.key();
        if let Some(&idx) = self.by_key.get(&key) {
            self.graph[idx] = node;
            return idx;
        }
        let is_symbol_name = match &node {
            GraphNode::Symbol(s) => Some(s.name.clone()),
            _ => None,
        };
        let idx = self.graph.add_node(node);
        self.by_key.insert(key, idx);
        if let Some(name) = is_symbol_name {
            self.by_symbol_name.entry(name).or_default().push(idx);
        }
        idx
    }

    fn has_edge(&self, a: NodeIndex, b: NodeIndex, edge: &GraphEdge) -> bool {
        self.graph
            .edges_connecting(a, b)
            .any(|e| e.weight() == edge)
    }

    fn add_edge_once(&mut self, a: NodeIndex, b: NodeIndex, edge: GraphEdge) {
        if !self.has_edge(a, b, &edge) {
            self.graph.add_edge(a, b, edge);
        }
    }

    pub fn upsert_file(&mut self, file: FileRecord) {
        self.mark_written();
        self.ensure_node(GraphNode::File(file));
    }

    /// Upsert a symbol and its `DEFINES` edge. The owning `File` node must be
    /// written first; a placeholder is created if it is not, so a partial
    /// write never corrupts the graph.
    pub fn upsert_symbol(&mut self, symbol: SymbolRecord) {
        self.mark_written();
        let file_key = format!("file:{}", symbol.file);
        let file_idx = match self.by_key.get(&file_key) {
            Some(&idx) => idx,
            None => self.ensure_node(GraphNode::File(FileRecord {
                path: symbol.file.clone(),
                language: String::new(),
                lines_of_code: 0,
                complexity: 0,
            })),
        };
        let sym_idx = self.ensure_node(GraphNode::Symbol(symbol));
        self.add_edge_once(file_idx, sym_idx, GraphEdge::plain(EdgeLabel::Defines));
    }

    pub fn upsert_import(&mut self, from_file: &str, target: ImportTarget) {
        self.mark_written();
        let from = match self.by_key.get(&format!("file:{from_file}")) {
            Some(&idx) => idx,
            None => self.ensure_node(GraphNode::File(FileRecord {
                path: from_file.to_string(),
                language: String::new(),
                lines_of_code: 0,
                complexity: 0,
            })),
        };
        let to = match target {
            ImportTarget::File(path) => match self.by_key.get(&format!("file:{path}")) {
                Some(&idx) => idx,
                None => self.ensure_node(GraphNode::File(FileRecord {
                    path,
                    language: String::new(),
                    lines_of_code: 0,
                    complexity: 0,
                })),
            },
            ImportTarget::Module(path) => self.ensure_node(GraphNode::Module(ModuleRecord { path })),
        };
        self.add_edge_once(from, to, GraphEdge::plain(EdgeLabel::Imports));
    }

    /// Record a call edge. Multi-edges are allowed: two symbols may call each
    /// other from several sites.
    pub fn upsert_call(
        &mut self,
        caller_qualified: &str,
        target: CallTarget,
        line: usize,
        is_conditional: bool,
    ) {
        let Some(&caller) = self.by_key.get(&format!("sym:{caller_qualified}")) else {
            debug!("call from unknown symbol {caller_qualified}, skipping");
            return;
        };
        self.mark_written();
        let callee = match target {
            CallTarget::Symbol(qualified) => match self.by_key.get(&format!("sym:{qualified}")) {
                Some(&idx) => idx,
                None => {
                    let name = qualified
                        .rsplit(&[':', '.'][..])
                        .next()
                        .unwrap_or(&qualified)
                        .to_string();
                    self.ensure_node(GraphNode::External { name })
                }
            },
            CallTarget::External(name) => self.ensure_node(GraphNode::External { name }),
        };
        self.add_edge_once(caller, callee, GraphEdge::call(line, is_conditional));
    }

    /// `IMPLEMENTS`/`EXTENDS` between two symbols already in the graph.
    pub fn upsert_relation(&mut self, from_qualified: &str, to_qualified: &str, label: EdgeLabel) {
        debug_assert!(matches!(label, EdgeLabel::Implements | EdgeLabel::Extends));
        let (Some(&from), Some(&to)) = (
            self.by_key.get(&format!("sym:{from_qualified}")),
            self.by_key.get(&format!("sym:{to_qualified}")),
        ) else {
            return;
        };
        self.mark_written();
        self.add_edge_once(from, to, GraphEdge::plain(label));
    }

    pub fn upsert_commit(&mut self, commit: CommitRecord) {
        self.mark_written();
        self.ensure_node(GraphNode::Commit(commit));
    }

    /// Remove a file and every symbol it defines.
    pub fn delete_file(&mut self, path: &str) {
        let key = format!("file:{path}");
        let Some(&file_idx) = self.by_key.get(&key) else {
            return;
        };
        self.mark_written();

        let owned: Vec<NodeIndex> = self
            .graph
            .edges_directed(file_idx, Direction::Outgoing)
            .filter(|e| e.weight().label == EdgeLabel::Defines)
            .map(|e| e.target())
            .collect();

        for idx in owned {
            self.remove_node(idx);
        }
        self.remove_node(file_idx);
        debug!("deleted file node {path}");
    }

    fn remove_node(&mut self, idx: NodeIndex) {
        if let Some(node) = self.graph.remove_node(idx) {
            self.by_key.remove(&node.key());
            if let GraphNode::Symbol(s) = node {
                if let Some(list) = self.by_symbol_name.get_mut(&s.name) {
                    list.retain(|i| *i != idx);
                    if list.is_empty() {
                        self.by_symbol_name.remove(&s.name);
                    }
                }
            }
        }
    }

    // ---- queries -----------------------------------------------------------

    /// Symbol nodes matching a bare or qualified name.
    pub(crate) fn symbols_named(&self, name: &str) -> Vec<NodeIndex> {
        if let Some(&idx) = self.by_key.get(&format!("sym:{name}")) {
            return vec![idx];
        }
        self.by_symbol_name.get(name).cloned().unwrap_or_default()
    }

    /// Exactly the set of symbols with a call edge resolving to `name`.
    pub fn get_callers(&self, name: &str) -> Vec<CallRow> {
        let mut out = Vec::new();
        for target in self.symbols_named(name) {
            for edge in self.graph.edges_directed(target, Direction::Incoming) {
                if edge.weight().label != EdgeLabel::Calls {
                    continue;
                }
                if let GraphNode::Symbol(caller) = &self.graph[edge.source()] {
                    out.push(CallRow {
                        symbol: caller.clone(),
                        line: edge.weight().line,
                        is_conditional: edge.weight().is_conditional.unwrap_or(false),
                    });
                }
            }
        }
        out
    }

    pub fn get_callees(&self, name: &str) -> Vec<CalleeRow> {
        let mut out = Vec::new();
        for source in self.symbols_named(name) {
            for edge in self.graph.edges_directed(source, Direction::Outgoing) {
                if edge.weight().label != EdgeLabel::Calls {
                    continue;
                }
                let (callee, symbol) = match &self.graph[edge.target()] {
                    GraphNode::Symbol(s) => (s.name.clone(), Some(s.clone())),
                    GraphNode::External { name } => (name.clone(), None),
                    _ => continue,
                };
                out.push(CalleeRow {
                    callee,
                    symbol,
                    line: edge.weight().line,
                    is_conditional: edge.weight().is_conditional.unwrap_or(false),
                });
            }
        }
        out
    }

    /// Files that import `path`.
    pub fn get_file_dependents(&self, path: &str) -> Vec<String> {
        let Some(&idx) = self.by_key.get(&format!("file:{path}")) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .filter(|e| e.weight().label == EdgeLabel::Imports)
            .filter_map(|e| match &self.graph[e.source()] {
                GraphNode::File(f) => Some(f.path.clone()),
                _ => None,
            })
            .collect()
    }

    /// Files and modules that `path` imports.
    pub fn get_file_dependencies(&self, path: &str) -> Vec<String> {
        let Some(&idx) = self.by_key.get(&format!("file:{path}")) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| e.weight().label == EdgeLabel::Imports)
            .filter_map(|e| match &self.graph[e.target()] {
                GraphNode::File(f) => Some(f.path.clone()),
                GraphNode::Module(m) => Some(m.path.clone()),
                _ => None,
            })
            .collect()
    }

    /// All symbol records matching a bare or qualified name. Methods across
    /// files commonly share names; every match is returned.
    pub fn symbols_by_name(&self, name: &str) -> Vec<SymbolRecord> {
        self.symbols_named(name)
            .into_iter()
            .filter_map(|idx| match &self.graph[idx] {
                GraphNode::Symbol(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    /// Symbols currently recorded for one file.
    pub fn symbols_in_file(&self, path: &str) -> Vec<SymbolRecord> {
        let Some(&idx) = self.by_key.get(&format!("file:{path}")) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| e.weight().label == EdgeLabel::Defines)
            .filter_map(|e| match &self.graph[e.target()] {
                GraphNode::Symbol(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn get_stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            edges: self.graph.edge_count(),
            ..GraphStats::default()
        };
        for idx in self.graph.node_indices() {
            match &self.graph[idx] {
                GraphNode::File(_) => stats.files += 1,
                GraphNode::Symbol(_) => stats.symbols += 1,
                GraphNode::Module(_) => stats.modules += 1,
                GraphNode::Commit(_) => stats.commits += 1,
                GraphNode::External { .. } => stats.externals += 1,
            }
        }
        stats.call_edges = self
            .graph
            .edge_indices()
            .filter(|e| self.graph[*e].label == EdgeLabel::Calls)
            .count();
        stats
    }

    pub(crate) fn inner(&self) -> &StableDiGraph<GraphNode, GraphEdge> {
        &self.graph
    }

    fn rebuild_indexes(&mut self) {
        self.by_key.clear();
        self.by_symbol_name.clear();
        for idx in self.graph.node_indices() {
            let node = &self.graph[idx];
            self.by_key.insert(node.key(), idx);
            if let GraphNode::Symbol(s) = node {
                self.by_symbol_name
                    .entry(s.name.clone())
                    .or_default()
                    .push(idx);
            }
        }
    }
}
