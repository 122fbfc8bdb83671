//! OpenAI embedding provider (single-vendor API).
//!
//! POST {endpoint}/v1/embeddings with Bearer authentication. Construction
//! validates the key and endpoint scheme up front so selection failures are
//! configuration errors, not request-time surprises.

use super::{EmbeddingProvider, snippet};
use crate::errors::{Result, VectorError};
use crate::models::BackendKind;
use reqwest::header;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{future::Future, pin::Pin};

pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct OpenAiProvider {
    client: reqwest::Client,
    url: String,
    model: String,
    dimensions: usize,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiProvider {
    pub fn new(api_key: &str, endpoint: &str, model: &str, dimensions: usize) -> Result<Self> {
        let endpoint = endpoint.trim();
        if api_key.trim().is_empty() {
            return Err(VectorError::Config("openai api key is empty".into()));
        }
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(VectorError::Config(format!(
                "invalid openai endpoint: {endpoint}"
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

/// Shared request path for the OpenAI-compatible wire format.
pub(crate) async fn request_openai_style(
    client: &reqwest::Client,
    url: &str,
    model: &str,
    dimensions: usize,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    let resp = client
        .post(url)
        .json(&EmbeddingsRequest {
            model,
            input: texts,
        })
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let message = snippet(&resp.text().await.unwrap_or_default());
        if status.as_u16() == 403 || message.to_ascii_lowercase().contains("model not accessible")
        {
            return Err(VectorError::ModelNotAccessible {
                model: model.to_string(),
            });
        }
        return Err(VectorError::Provider {
            status: Some(status.as_u16()),
            message,
        });
    }

    let mut parsed: EmbeddingsResponse = resp.json().await?;
    parsed.data.sort_by_key(|row| row.index);

    let mut out = Vec::with_capacity(parsed.data.len());
    for row in parsed.data {
        if row.embedding.len() != dimensions {
            return Err(VectorError::VectorSizeMismatch {
                got: row.embedding.len(),
                want: dimensions,
            });
        }
        out.push(row.embedding);
    }
    if out.len() != texts.len() {
        return Err(VectorError::Provider {
            status: None,
            message: format!("expected {} embeddings, got {}", texts.len(), out.len()),
        });
    }
    Ok(out)
}

impl EmbeddingProvider for OpenAiProvider {
    fn backend(&self) -> BackendKind {
        BackendKind::OpenAi
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
