//! Embedding provider interface and implementations.
//!
//! All code above this layer sees a uniform `embed`/`embed_many` surface;
//! backend identity only matters at selection time.

pub mod ollama;
pub mod openai;
pub mod openrouter;

use crate::errors::Result;
use crate::models::BackendKind;
use std::{future::Future, pin::Pin};

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use openrouter::OpenRouterProvider;

/// Asynchronous embedding backend.
///
/// Async is required because every real backend (Ollama, OpenAI, OpenRouter)
/// performs HTTP requests.
pub trait EmbeddingProvider: Send + Sync {
    fn backend(&self) -> BackendKind;
    fn model(&self) -> &str;
    fn dimensions(&self) -> usize;

    /// Embed a single text.
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>>> + Send + 'a>>;

    /// Embed a pre-partitioned batch, preserving input order.
    fn embed_many<'a>(
        &'a self,
        texts: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>>> + Send + 'a>>;
}

/// Trim a response body for error messages.
pub(crate) fn snippet(body: &str) -> String {
    const MAX: usize = 300;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let cut = body
            .char_indices()
            .take_while(|(i, _)| *i < MAX)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}…", &body[..cut])
    }
}
