//! Error types for the embedding cache.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("index parse error: {0}")]
    IndexParse(#[from] serde_json::Error),

    #[error("bundle model mismatch: bundle={bundle}, configured={configured}")]
    BundleModelMismatch { bundle: String, configured: String },

    #[error("bundle version unsupported: {0}")]
    BundleVersion(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;
