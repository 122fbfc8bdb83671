//! OpenRouter embedding provider (multi-model aggregator).
//!
//! Speaks the OpenAI-compatible embeddings wire format at
//! `https://openrouter.ai/api/v1/embeddings`. Aggregator responses sometimes
//! surface "No successful provider" with a 200-family transport failure; the
//! retry classification in `VectorError` treats that as transient.

use super::EmbeddingProvider;
use super::openai::request_openai_style;
use crate::errors::{Result, VectorError};
use crate::models::BackendKind;
use reqwest::header;
use std::time::Duration;
use std::{future::Future, pin::Pin};

pub const DEFAULT_OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct OpenRouterProvider {
    client: reqwest::Client,
    url: String,
    model: String,
    dimensions: usize,
}

impl OpenRouterProvider {
    pub fn new(api_key: &str, endpoint: &str, model: &str, dimensions: usize) -> Result<Self> {
        let endpoint = endpoint.trim();
        if api_key.trim().is_empty() {
            return Err(VectorError::Config("openrouter api key is empty".into()));
        }
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(VectorError::Config(format!(
                "invalid openrouter endpoint: {endpoint}"
            )));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| VectorError::Config(format!("invalid api key header: {e}")))?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            url: format!("{}/v1/embeddings", endpoint.trim_end_matches('/')),
            model: model.to_string(),
            dimensions,
        })
    }
}

impl EmbeddingProvider for OpenRouterProvider {
    fn backend(&self) -> BackendKind {
        BackendKind::OpenRouter
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
            let texts = [text.to_string()];
            let mut vectors = request_openai_style(
                &self.client,
                &self.url,
                &self.model,
                self.dimensions,
                &texts,
            )
            .await?;
            Ok(vectors.remove(0))
        })
    }

    fn embed_many<'a>(
        &'a self,
        texts: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>>> + Send + 'a>> {
        Box::pin(request_openai_style(
            &self.client,
            &self.url,
            &self.model,
            self.dimensions,
            texts,
        ))
    }
}
