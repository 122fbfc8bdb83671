//! Error types for commit analysis.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("nothing staged")]
    NothingStaged,
}

pub type Result<T> = std::result::Result<T, AnalyzeError>;
