//! Embedding backends, known models, and the dimension table.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Recognized embedding backends.
///
/// `OpenRouter` is the multi-model aggregator, `OpenAi` the single-vendor
/// API, `Ollama` the process-local model server reached over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    OpenRouter,
    OpenAi,
    Ollama,
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BackendKind::OpenRouter => "openrouter",
            BackendKind::OpenAi => "openai",
            BackendKind::Ollama => "ollama",
        })
    }
}

impl BackendKind {
    /// Provider-appropriate embedding batch size.
    pub fn batch_size(self) -> usize {
        match self {
            // Aggregators route per-model; keep batches conservative.
            BackendKind::OpenRouter => 50,
            BackendKind::OpenAi => 100,
            // Sequential on the local server; batching happens caller-side.
            BackendKind::Ollama => 1,
        }
    }

    /// Ordered model fallback list for this backend.
    pub fn model_fallbacks(self) -> &'static [&'static str] {
        match self {
            BackendKind::OpenRouter | BackendKind::OpenAi => &[
                "text-embedding-3-small",
                "text-embedding-ada-002",
                "text-embedding-3-large",
            ],
            BackendKind::Ollama => &["nomic-embed-text", "mxbai-embed-large", "all-minilm"],
        }
    }

    pub fn default_model(self) -> &'static str {
        self.model_fallbacks()[0]
    }
}

/// Vector dimension for a known `(backend, model)` pair.
///
/// Dimension is a property of the model; unknown models return `None` and the
/// caller must probe or configure explicitly.
pub fn model_dimensions(model: &str) -> Option<usize> {
    let key = model.split(':').next().unwrap_or(model);
    match key {
        "text-embedding-3-small" | "3-small" => Some(1536),
        "text-embedding-ada-002" | "ada-002" => Some(1536),
        "text-embedding-3-large" | "3-large" => Some(3072),
        "nomic-embed-text" => Some(768),
        "mxbai-embed-large" => Some(1024),
        "all-minilm" => Some(384),
        _ => None,
    }
}

/// Local-backend inputs beyond this length are truncated before embedding,
/// a conservative bound for small local tokenizers.
pub const LOCAL_INPUT_CHAR_LIMIT: usize = 500;

/// Truncate at a char boundary for local-backend inputs.
pub fn truncate_for_local(text: &str) -> &str {
    match text.char_indices().nth(LOCAL_INPUT_CHAR_LIMIT) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_table_matches_known_models() {
        assert_eq!(model_dimensions("text-embedding-3-small"), Some(1536));
        assert_eq!(model_dimensions("text-embedding-ada-002"), Some(1536));
        assert_eq!(model_dimensions("text-embedding-3-large"), Some(3072));
        assert_eq!(model_dimensions("nomic-embed-text"), Some(768));
        assert_eq!(model_dimensions("nomic-embed-text:latest"), Some(768));
        assert_eq!(model_dimensions("mxbai-embed-large"), Some(1024));
        assert_eq!(model_dimensions("all-minilm"), Some(384));
        assert_eq!(model_dimensions("mystery-model"), None);
    }

    #[test]
    fn truncation_only_affects_long_inputs() {
        let short = "hello";
        assert_eq!(truncate_for_local(short), short);

        let long = "x".repeat(700);
        assert_eq!(truncate_for_local(&long).chars().count(), 500);

        // Multi-byte chars must not split.
        let wide = "é".repeat(700);
        let cut = truncate_for_local(&wide);
        assert_eq!(cut.chars().count(), 500);
    }
}
