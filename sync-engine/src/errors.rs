//! Error types for the sync pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("graph error: {0}")]
    Graph(#[from] code_graph::GraphError),

    #[error("vector error: {0}")]
    Vector(#[from] vector_store::VectorError),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("state persistence error: {0}")]
    State(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("worker panicked: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// A distinct outcome, not a failure: sync state is left untouched.
    #[error("sync cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, SyncError>;
