//! On-disk index model: one metadata row per cached vector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata for one cached embedding. The vector itself lives in `{id}.bin`
/// as a raw little-endian f32 array of length `dimensions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingEntry {
    pub id: String,
    pub model: String,
    pub dimensions: usize,
    pub created_at: DateTime<Utc>,
    pub access_count: u64,
    pub last_accessed: DateTime<Utc>,
    pub text_hash: String,
}

impl EmbeddingEntry {
    /// Size of the vector blob on disk.
    pub fn byte_len(&self) -> u64 {
        (self.dimensions * std::mem::size_of::<f32>()) as u64
    }
}

/// Serialized form of `index.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingIndex {
    pub model: String,
    pub dimensions: usize,
    #[serde(default)]
    pub entries: HashMap<String, EmbeddingEntry>,
}

impl EmbeddingIndex {
    pub fn new(model: &str, dimensions: usize) -> Self {
        Self {
            model: model.to_string(),
            dimensions,
            entries: HashMap::new(),
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.entries.values().map(|e| e.byte_len()).sum()
    }
}

/// Aggregate counters reported by `stats()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub total_bytes: u64,
    pub model: String,
    pub dimensions: usize,
}
