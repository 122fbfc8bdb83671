//! Vector layer configuration and backend-selection policy.

use crate::errors::{Result, VectorError};
use crate::models::BackendKind;
use std::path::PathBuf;

/// Configuration for the vector manager. Credentials and URLs are passed in
/// at construction; nothing is read from global state afterwards.
#[derive(Debug, Clone)]
pub struct VectorConfig {
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    /// Namespaces collections as `"{repo_id}_{name}"` when present.
    pub repo_id: Option<String>,
    /// Requested embedding model; backend default when `None`.
    pub model: Option<String>,
    /// Explicitly configured local server. Setting this pins the backend to
    /// local even when cloud credentials are present.
    pub ollama_url: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    /// Embedding-cache directory (`.cv/embeddings`).
    pub cache_dir: PathBuf,
    pub cache_max_bytes: u64,
    pub upsert_batch: usize,
}

impl VectorConfig {
    pub fn new(qdrant_url: &str, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            qdrant_url: qdrant_url.to_string(),
            qdrant_api_key: None,
            repo_id: None,
            model: None,
            ollama_url: None,
            openrouter_api_key: None,
            openai_api_key: None,
            cache_dir: cache_dir.into(),
            cache_max_bytes: embedding_cache::DEFAULT_MAX_BYTES,
            upsert_batch: 256,
        }
    }

    /// Build from environment variables.
    ///
    /// Recognized vars:
    /// - QDRANT_URL (required), QDRANT_API_KEY (optional)
    /// - OLLAMA_URL (optional; pins the backend to local)
    /// - OPENROUTER_API_KEY, OPENAI_API_KEY (optional)
    /// - EMBEDDING_MODEL (optional)
    /// - EMBEDDING_CACHE_DIR (default: .cv/embeddings)
    pub fn from_env() -> Result<Self> {
        use std::env;
        let qdrant_url = env::var("QDRANT_URL")
            .map_err(|_| VectorError::Config("QDRANT_URL is required".into()))?;
        let cache_dir = env::var("EMBEDDING_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".cv/embeddings"));

        let mut cfg = Self::new(&qdrant_url, cache_dir);
        cfg.qdrant_api_key = env::var("QDRANT_API_KEY").ok();
        cfg.ollama_url = env::var("OLLAMA_URL").ok();
        cfg.openrouter_api_key = env::var("OPENROUTER_API_KEY").ok();
        cfg.openai_api_key = env::var("OPENAI_API_KEY").ok();
        cfg.model = env::var("EMBEDDING_MODEL").ok();
        Ok(cfg)
    }

    /// Backend selection policy.
    ///
    /// This is the single place where backend identity enters business logic:
    /// an explicitly configured local server wins over any cloud credential;
    /// otherwise prefer the aggregator, then the direct vendor, then local.
    pub fn select_backend(&self) -> BackendKind {
        if self.ollama_url.is_some() {
            return BackendKind::Ollama;
        }
        if self.openrouter_api_key.is_some() {
            return BackendKind::OpenRouter;
        }
        if self.openai_api_key.is_some() {
            return BackendKind::OpenAi;
        }
        BackendKind::Ollama
    }

    /// Full collection name, namespaced by repo when configured.
    pub fn collection_name(&self, base: &str) -> String {
        match &self.repo_id {
            Some(repo) => format!("{repo}_{base}"),
            None => base.to_string(),
        }
    }
}

/// The four collections every repo gets.
pub const COLLECTIONS: [&str; 4] = ["code_chunks", "docstrings", "commits", "document_chunks"];

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> VectorConfig {
        VectorConfig::new("http://localhost:6334", "/tmp/cache")
    }

    #[test]
    fn explicit_local_wins_over_cloud_credentials() {
        let mut cfg = base();
        cfg.ollama_url = Some("http://localhost:11434".into());
        cfg.openrouter_api_key = Some("or-key".into());
        cfg.openai_api_key = Some("oa-key".into());
        assert_eq!(cfg.select_backend(), BackendKind::Ollama);
    }

    #[test]
    fn cloud_preference_order_is_aggregator_then_vendor_then_local() {
        let mut cfg = base();
        cfg.openrouter_api_key = Some("or-key".into());
        cfg.openai_api_key = Some("oa-key".into());
        assert_eq!(cfg.select_backend(), BackendKind::OpenRouter);

        cfg.openrouter_api_key = None;
        assert_eq!(cfg.select_backend(), BackendKind::OpenAi);

        cfg.openai_api_key = None;
        assert_eq!(cfg.select_backend(), BackendKind::Ollama);
    }

    #[test]
    fn collection_names_are_repo_namespaced() {
        let mut cfg = base();
        assert_eq!(cfg.collection_name("code_chunks"), "code_chunks");
        cfg.repo_id = Some("ab12cd34".into());
        assert_eq!(cfg.collection_name("code_chunks"), "ab12cd34_code_chunks");
    }
}
