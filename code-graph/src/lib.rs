//! Embedded property-graph store for the code knowledge engine.
//!
//! Nodes: files, symbols, modules, commits, and external placeholders.
//! Edges: `DEFINES`, `CALLS {line, is_conditional}`, `IMPORTS`,
//! `IMPLEMENTS`, `EXTENDS`. Persistence is JSONL under a directory named by
//! repo hash, with a singleton ownership marker.

mod errors;
mod model;
mod persist;
mod query;
mod store;

pub use errors::{GraphError, Result};
pub use model::{
    CallRow, CommitRecord, EdgeLabel, FileRecord, GraphEdge, GraphNode, GraphStats, ModuleRecord,
    Ownership, SymbolRecord,
};
pub use query::{GraphQuery, MAX_TRAVERSAL_DEPTH};
pub use store::{CallTarget, CalleeRow, CodeGraph, ImportTarget};
