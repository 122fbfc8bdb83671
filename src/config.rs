//! Engine configuration: `.cv/config.json` (user-managed, read-only for the
//! engine) merged with environment fallbacks.

use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// On-disk shape of `config.json`. Every field is optional; absent values
/// fall back to the environment, then to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigFile {
    pub qdrant_url: Option<String>,
    pub qdrant_api_key: Option<String>,
    pub ollama_url: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub embedding_model: Option<String>,
    pub cache_max_bytes: Option<u64>,
    pub chunk_file_line_limit: Option<usize>,
    pub exclude_patterns: Option<Vec<String>>,
}

/// Fully resolved engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub ollama_url: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub embedding_model: Option<String>,
    pub cache_max_bytes: u64,
    pub chunk_file_line_limit: usize,
    pub exclude_patterns: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            qdrant_url: "http://localhost:6334".into(),
            qdrant_api_key: None,
            ollama_url: None,
            openrouter_api_key: None,
            openai_api_key: None,
            embedding_model: None,
            cache_max_bytes: embedding_cache::DEFAULT_MAX_BYTES,
            chunk_file_line_limit: 200,
            exclude_patterns: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Resolve configuration for a working copy: file first, then env, then
    /// defaults. The engine never writes the config file.
    pub fn load(config_path: &Path) -> Self {
        let file: ConfigFile = std::fs::read(config_path)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default();
        if file.qdrant_url.is_some() {
            debug!("config loaded from {}", config_path.display());
        }
        Self::from_parts(file)
    }

    fn from_parts(file: ConfigFile) -> Self {
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            qdrant_url: file
                .qdrant_url
                .or_else(|| env("QDRANT_URL"))
                .unwrap_or(defaults.qdrant_url),
            qdrant_api_key: file.qdrant_api_key.or_else(|| env("QDRANT_API_KEY")),
            ollama_url: file.ollama_url.or_else(|| env("OLLAMA_URL")),
            openrouter_api_key: file
                .openrouter_api_key
                .or_else(|| env("OPENROUTER_API_KEY")),
            openai_api_key: file.openai_api_key.or_else(|| env("OPENAI_API_KEY")),
            embedding_model: file.embedding_model.or_else(|| env("EMBEDDING_MODEL")),
            cache_max_bytes: file.cache_max_bytes.unwrap_or(defaults.cache_max_bytes),
            chunk_file_line_limit: file
                .chunk_file_line_limit
                .unwrap_or(defaults.chunk_file_line_limit),
            exclude_patterns: file.exclude_patterns.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn file_values_win_over_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "qdrantUrl": "http://qdrant.internal:6334",
                "embeddingModel": "nomic-embed-text",
                "chunkFileLineLimit": 120,
                "excludePatterns": ["generated/**"]
            }"#,
        )
        .unwrap();

        let config = EngineConfig::load(&path);
        assert_eq!(config.qdrant_url, "http://qdrant.internal:6334");
        assert_eq!(config.embedding_model.as_deref(), Some("nomic-embed-text"));
        assert_eq!(config.chunk_file_line_limit, 120);
        assert_eq!(config.exclude_patterns, vec!["generated/**"]);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig::load(&dir.path().join("config.json"));
        assert_eq!(config.chunk_file_line_limit, 200);
        assert!(config.exclude_patterns.is_empty());
    }

    #[test]
    fn malformed_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        let config = EngineConfig::load(&path);
        assert_eq!(config.cache_max_bytes, embedding_cache::DEFAULT_MAX_BYTES);
    }
}
