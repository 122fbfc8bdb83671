//! Error types for the graph facade.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("persisted graph unreadable: {0}")]
    Persist(#[from] serde_json::Error),

    #[error("unknown node referenced in edges: {0}")]
    DanglingEdge(usize),
}

pub type Result<T> = std::result::Result<T, GraphError>;
