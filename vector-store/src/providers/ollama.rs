//! Ollama embedding provider (local model server over HTTP).

use super::{EmbeddingProvider, snippet};
use crate::errors::{Result, VectorError};
use crate::models::{BackendKind, model_dimensions, truncate_for_local};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{future::Future, pin::Pin};
use tracing::{debug, info};

/// Default local server address.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// First request may block on model load; allow a full minute.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct OllamaProvider {
    client: Client,
    url: String,
    model: String,
    dimensions: usize,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
}

impl OllamaProvider {
    pub fn new(url: &str, model: &str, dimensions: usize) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimensions,
        })
    }

    /// Whether the server answers at all.
    pub async fn reachable(url: &str) -> bool {
        let Ok(client) = Client::builder().timeout(Duration::from_secs(3)).build() else {
            return false;
        };
        client
            .get(format!("{}/api/tags", url.trim_end_matches('/')))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    /// Names of installed models.
    pub async fn installed_models(url: &str) -> Result<Vec<String>> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        let resp = client
            .get(format!("{}/api/tags", url.trim_end_matches('/')))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(VectorError::Provider {
                status: Some(status.as_u16()),
                message: snippet(&resp.text().await.unwrap_or_default()),
            });
        }
        let tags: TagsResponse = resp.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Pick the requested model if installed, else walk the fallback list.
    /// Dimensions follow whichever model wins.
    pub async fn resolve(url: &str, requested: Option<&str>) -> Result<OllamaProvider> {
        let installed = Self::installed_models(url).await?;
        debug!("ollama models installed: {installed:?}");

        let installed_match = |wanted: &str| {
            installed
                .iter()
                .find(|name| {
                    name.as_str() == wanted
                        || name.split(':').next() == Some(wanted)
                })
                .cloned()
        };

        let mut candidates: Vec<&str> = Vec::new();
        if let Some(requested) = requested {
            candidates.push(requested);
        }
        candidates.extend(BackendKind::Ollama.model_fallbacks());

        for wanted in candidates {
            if let Some(name) = installed_match(wanted) {
                let dimensions = model_dimensions(&name).ok_or_else(|| {
                    VectorError::Config(format!("unknown dimensions for local model {name}"))
                })?;
                if Some(wanted) != requested {
                    info!("requested model unavailable locally, using {name}");
                }
                return Self::new(url, &name, dimensions);
            }
        }

        Err(VectorError::Exhausted(format!(
            "no embedding model installed on {url} (have: {})",
            installed.join(", ")
        )))
    }
}

impl EmbeddingProvider for OllamaProvider {
    fn backend(&self) -> BackendKind {
        BackendKind::Ollama
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>>> + Send + 'a>> {
        Box::pin(async move {
            let req = EmbedRequest {
                model: &self.model,
                prompt: truncate_for_local(text),
            };

            let resp = self
                .client
                .post(format!("{}/api/embeddings", self.url))
                .json(&req)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                return Err(VectorError::Provider {
                    status: Some(status.as_u16()),
                    message: snippet(&resp.text().await.unwrap_or_default()),
                });
            }

            let parsed: EmbedResponse = resp.json().await?;
            if parsed.embedding.len() != self.dimensions {
                return Err(VectorError::VectorSizeMismatch {
                    got: parsed.embedding.len(),
                    want: self.dimensions,
                });
            }
            Ok(parsed.embedding)
        })
    }

    fn embed_many<'a>(
        &'a self,
        texts: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>>> + Send + 'a>> {
        // The local server handles one prompt at a time; run sequentially.
        Box::pin(async move {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        })
    }
}
