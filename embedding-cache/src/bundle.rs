//! Export/import bundle format for moving cached embeddings between hosts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const BUNDLE_VERSION: &str = "1.0";

/// One exported embedding. Vectors travel as plain f32 arrays; the id is
/// content-addressed, so equal ids imply equal content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleEmbedding {
    pub id: String,
    #[serde(rename = "textHash")]
    pub text_hash: String,
    pub vector: Vec<f32>,
}

/// A portable set of cached embeddings for one model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingBundle {
    pub version: String,
    pub model: String,
    pub dimensions: usize,
    #[serde(rename = "exportedAt")]
    pub exported_at: DateTime<Utc>,
    pub embeddings: Vec<BundleEmbedding>,
}

/// Outcome of a bundle import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    pub imported: usize,
    /// Ids already present locally; skipped because content-addressing
    /// guarantees equivalence.
    pub skipped: usize,
}
