//! The vector manager: one backend, one cache, four collections.
//!
//! Brokers between the remote vector store and an embedding backend with
//! automatic model/backend fallback. Holds at most one active provider;
//! switching backends replaces the previous client and re-keys the cache to
//! the new model.

use crate::config::{COLLECTIONS, VectorConfig};
use crate::errors::{Result, VectorError};
use crate::filters::{PayloadFilter, to_qdrant_filter};
use crate::models::BackendKind;
use crate::point::{VectorPoint, embed_partition_size};
use crate::providers::{
    EmbeddingProvider, OllamaProvider, OpenAiProvider, OpenRouterProvider,
    ollama::DEFAULT_OLLAMA_URL, openai::DEFAULT_OPENAI_ENDPOINT,
    openrouter::DEFAULT_OPENROUTER_ENDPOINT,
};
use crate::qdrant::QdrantStore;
use embedding_cache::{CacheConfig, EmbeddingCache};
use rand::Rng;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One search result, highest score first.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Canonical string id recovered from the payload.
    pub id: String,
    pub score: f32,
    pub payload: serde_json::Value,
}

/// Result of a collection compatibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionCompatibility {
    pub existing_dims: Option<usize>,
    pub required_dims: usize,
    pub needs_recreation: bool,
    pub point_count: Option<u64>,
}

/// Result of `migrate_collection_if_needed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOutcome {
    pub migrated: bool,
    /// The collection needs recreation but `force` was not given.
    pub requires_force: bool,
    pub points_lost: u64,
    pub old_dims: Option<usize>,
    pub new_dims: usize,
}

/// Pure migration decision: `(migrate_now, requires_force)`.
pub fn migration_decision(
    existing_dims: Option<usize>,
    required_dims: usize,
    force: bool,
) -> (bool, bool) {
    match existing_dims {
        Some(existing) if existing != required_dims => (force, !force),
        _ => (false, false),
    }
}

enum AttemptOutcome {
    Done(Vec<(String, Vec<f32>)>),
    /// Model or backend changed mid-flight; earlier vectors are stale.
    SwitchedProvider,
}

pub struct VectorManager {
    config: VectorConfig,
    store: Option<QdrantStore>,
    provider: Option<Box<dyn EmbeddingProvider>>,
    cache: Option<EmbeddingCache>,
    /// Models already rejected by access errors in this process.
    rejected_models: Vec<String>,
}

impl VectorManager {
    pub fn new(config: VectorConfig) -> Self {
        Self {
            config,
            store: None,
            provider: None,
            cache: None,
            rejected_models: Vec::new(),
        }
    }

    /// Connect the store, select and probe a backend, ensure collections.
    pub async fn connect(&mut self) -> Result<()> {
        let store = QdrantStore::connect(
            &self.config.qdrant_url,
            self.config.qdrant_api_key.as_deref(),
        )?;
        self.store = Some(store);

        let provider = self.build_initial_provider().await?;
        info!(
            "embedding backend selected: {} model={} dims={}",
            provider.backend(),
            provider.model(),
            provider.dimensions()
        );
        self.install_provider(provider);

        self.ensure_collections().await?;
        Ok(())
    }

    pub fn backend(&self) -> Option<BackendKind> {
        self.provider.as_ref().map(|p| p.backend())
    }

    pub fn model(&self) -> Option<&str> {
        self.provider.as_ref().map(|p| p.model())
    }

    pub fn dimensions(&self) -> Option<usize> {
        self.provider.as_ref().map(|p| p.dimensions())
    }

    /// Full collection name under the configured repo namespace.
    pub fn collection(&self, base: &str) -> String {
        self.config.collection_name(base)
    }

    fn store(&self) -> Result<&QdrantStore> {
        self.store
            .as_ref()
            .ok_or_else(|| VectorError::Config("vector manager not connected".into()))
    }

    fn provider(&self) -> Result<&dyn EmbeddingProvider> {
        self.provider
            .as_deref()
            .ok_or_else(|| VectorError::Config("vector manager not connected".into()))
    }

    fn cache_mut(&mut self) -> Result<&mut EmbeddingCache> {
        self.cache
            .as_mut()
            .ok_or_else(|| VectorError::Config("vector manager not connected".into()))
    }

    /// Persist the embedding cache index.
    pub async fn save_cache(&mut self) -> Result<()> {
        if let Some(cache) = self.cache.as_mut() {
            cache.save().await?;
        }
        Ok(())
    }

    // ---- backend selection -------------------------------------------------

    async fn build_initial_provider(&mut self) -> Result<Box<dyn EmbeddingProvider>> {
        match self.config.select_backend() {
            BackendKind::Ollama => self.build_local_provider().await,
            kind => {
                let model = self
                    .config
                    .model
                    .clone()
                    .unwrap_or_else(|| kind.default_model().to_string());
                self.build_cloud_provider(kind, &model).await
            }
        }
    }

    async fn build_local_provider(&self) -> Result<Box<dyn EmbeddingProvider>> {
        let explicit = self.config.ollama_url.is_some();
        let url = self
            .config
            .ollama_url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        if !OllamaProvider::reachable(&url).await {
            return if explicit {
                Err(VectorError::Config(format!(
                    "local embedding server configured but unreachable at {url}"
                )))
            } else {
                Err(VectorError::Exhausted(format!(
                    "no cloud credentials and local server unreachable at {url}"
                )))
            };
        }

        let provider = OllamaProvider::resolve(&url, self.config.model.as_deref()).await?;
        Ok(Box::new(provider))
    }

    /// Construct and probe a cloud provider, walking the model fallback list
    /// on access errors.
    async fn build_cloud_provider(
        &mut self,
        kind: BackendKind,
        requested: &str,
    ) -> Result<Box<dyn EmbeddingProvider>> {
        let mut candidates: Vec<String> = vec![requested.to_string()];
        for m in kind.model_fallbacks() {
            if *m != requested {
                candidates.push(m.to_string());
            }
        }

        let mut last_err =
            VectorError::Exhausted(format!("no usable model on {kind}"));
        for model in candidates {
            if self.rejected_models.contains(&model) {
                continue;
            }
            let provider = self.make_cloud_client(kind, &model)?;
            match provider.embed("ping").await {
                Ok(_) => return Ok(provider),
                Err(e) if e.is_access_denied() => {
                    warn!("model {model} not accessible on {kind}, trying next");
                    self.rejected_models.push(model);
                    last_err = e;
                }
                Err(e) if e.is_retryable() => {
                    // Transient probe failure; accept and let the retry
                    // policy handle request-time errors.
                    debug!("probe for {model} transiently failed ({e}), accepting backend");
                    return Ok(provider);
                }
                Err(e) => return Err(e),
            }
        }

        // Every cloud model rejected; fall through to local when reachable.
        let url = self
            .config
            .ollama_url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
        if OllamaProvider::reachable(&url).await {
            warn!("cloud models exhausted, falling back to local server at {url}");
            let provider = OllamaProvider::resolve(&url, self.config.model.as_deref()).await?;
            return Ok(Box::new(provider));
        }
        Err(last_err)
    }

    fn make_cloud_client(
        &self,
        kind: BackendKind,
        model: &str,
    ) -> Result<Box<dyn EmbeddingProvider>> {
        let dims = crate::models::model_dimensions(model).ok_or_else(|| {
            VectorError::Config(format!("unknown dimensions for model {model}"))
        })?;
        match kind {
            BackendKind::OpenRouter => {
                let key = self.config.openrouter_api_key.as_deref().ok_or_else(|| {
                    VectorError::Config("openrouter credential missing".into())
                })?;
                Ok(Box::new(OpenRouterProvider::new(
                    key,
                    DEFAULT_OPENROUTER_ENDPOINT,
                    model,
                    dims,
                )?))
            }
            BackendKind::OpenAi => {
                let key = self
                    .config
                    .openai_api_key
                    .as_deref()
                    .ok_or_else(|| VectorError::Config("openai credential missing".into()))?;
                Ok(Box::new(OpenAiProvider::new(
                    key,
                    DEFAULT_OPENAI_ENDPOINT,
                    model,
                    dims,
                )?))
            }
            BackendKind::Ollama => unreachable!("local providers use resolve()"),
        }
    }

    /// Install a provider and re-key the cache to its model.
    fn install_provider(&mut self, provider: Box<dyn EmbeddingProvider>) {
        let cache_config = CacheConfig {
            dir: self.config.cache_dir.clone(),
            model: provider.model().to_string(),
            dimensions: provider.dimensions(),
            max_bytes: self.config.cache_max_bytes,
        };
        self.cache = Some(EmbeddingCache::new(cache_config));
        self.provider = Some(provider);
    }

    /// Reject the current model and move to the next usable one, falling
    /// through to local after the cloud list is exhausted.
    async fn switch_after_access_denied(&mut self) -> Result<()> {
        let (kind, model) = {
            let p = self.provider()?;
            (p.backend(), p.model().to_string())
        };
        self.rejected_models.push(model.clone());
        warn!("switching away from inaccessible model {model}");

        let next = match kind {
            BackendKind::Ollama => {
                return Err(VectorError::Exhausted(
                    "local model rejected; nothing to fall back to".into(),
                ));
            }
            kind => {
                let fallback = kind
                    .model_fallbacks()
                    .iter()
                    .find(|m| !self.rejected_models.iter().any(|r| r == *m))
                    .map(|m| m.to_string());
                match fallback {
                    Some(model) => self.build_cloud_provider(kind, &model).await?,
                    None => self.local_rescue().await?,
                }
            }
        };
        self.install_provider(next);
        Ok(())
    }

    /// After retries are exhausted on a cloud backend, try local once.
    async fn local_rescue(&self) -> Result<Box<dyn EmbeddingProvider>> {
        let url = self
            .config
            .ollama_url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
        if !OllamaProvider::reachable(&url).await {
            return Err(VectorError::Exhausted(
                "backend retries exhausted and local server unreachable".into(),
            ));
        }
        info!("falling back to local embedding server at {url}");
        let provider = OllamaProvider::resolve(&url, self.config.model.as_deref()).await?;
        Ok(Box::new(provider))
    }

    // ---- embedding ---------------------------------------------------------

    pub async fn embed(&mut self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        let mut vectors = self.embed_batch(&texts).await?;
        Ok(vectors.remove(0))
    }

    /// Cache-first batch embedding, preserving input order.
    ///
    /// A model switch mid-flight restarts the whole batch: vectors from the
    /// previous model have the wrong dimension and the cache is re-keyed.
    pub async fn embed_batch(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        loop {
            let lookup = self.cache_mut()?.get_batch(texts).await?;
            let mut resolved: HashMap<String, Vec<f32>> = lookup.cached;

            if !lookup.missing.is_empty() {
                match self.embed_missing(&lookup.missing).await? {
                    AttemptOutcome::SwitchedProvider => continue,
                    AttemptOutcome::Done(fresh) => {
                        self.cache_mut()?.set_batch(&fresh).await?;
                        for (text, vector) in fresh {
                            resolved.insert(text, vector);
                        }
                    }
                }
            }

            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                match resolved.get(text) {
                    Some(vector) => out.push(vector.clone()),
                    None => {
                        return Err(VectorError::Provider {
                            status: None,
                            message: format!("no embedding produced for input ({} chars)", text.len()),
                        });
                    }
                }
            }
            return Ok(out);
        }
    }

    async fn embed_missing(&mut self, missing: &[String]) -> Result<AttemptOutcome> {
        let mut fresh: Vec<(String, Vec<f32>)> = Vec::with_capacity(missing.len());
        let mut idx = 0;

        while idx < missing.len() {
            let backend = self.provider()?.backend();
            let end = (idx + embed_partition_size(backend)).min(missing.len());
            let chunk = &missing[idx..end];

            match self.call_with_retry(chunk).await? {
                AttemptOutcome::SwitchedProvider => return Ok(AttemptOutcome::SwitchedProvider),
                AttemptOutcome::Done(vectors) => {
                    fresh.extend(vectors);
                    idx = end;
                }
            }
        }
        Ok(AttemptOutcome::Done(fresh))
    }

    /// One partition with the full error policy: exponential backoff plus
    /// jitter on transient errors (three attempts), immediate model switch on
    /// access errors, local rescue on exhaustion.
    async fn call_with_retry(&mut self, chunk: &[String]) -> Result<AttemptOutcome> {
        const MAX_RETRIES: u32 = 3;
        let mut attempt: u32 = 0;

        loop {
            let result = self.provider()?.embed_many(chunk).await;
            match result {
                Ok(vectors) => {
                    let paired = chunk
                        .iter()
                        .cloned()
                        .zip(vectors)
                        .collect::<Vec<(String, Vec<f32>)>>();
                    return Ok(AttemptOutcome::Done(paired));
                }
                Err(e) if e.is_access_denied() => {
                    self.switch_after_access_denied().await?;
                    return Ok(AttemptOutcome::SwitchedProvider);
                }
                Err(e) if e.is_retryable() && attempt < MAX_RETRIES => {
                    attempt += 1;
                    let backend = self.provider()?.backend();
                    let delay = backoff_delay(attempt, backend);
                    warn!(
                        "transient embedding failure (attempt {attempt}/{MAX_RETRIES}, \
                         retrying in {delay:?}): {e}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_retryable() => {
                    // Retries exhausted; local is the last resort.
                    if self.provider()?.backend() != BackendKind::Ollama {
                        let provider = self.local_rescue().await?;
                        self.install_provider(provider);
                        return Ok(AttemptOutcome::SwitchedProvider);
                    }
                    return Err(VectorError::Exhausted(e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }
    }

    // ---- store operations --------------------------------------------------

    async fn ensure_collections(&self) -> Result<()> {
        let dims = self
            .dimensions()
            .ok_or_else(|| VectorError::Config("no backend selected".into()))?;
        let store = self.store()?;
        for base in COLLECTIONS {
            store
                .ensure_collection(&self.config.collection_name(base), dims)
                .await?;
        }
        Ok(())
    }

    /// Upsert points in store-appropriate batches.
    pub async fn upsert_batch(&self, collection: &str, points: Vec<VectorPoint>) -> Result<usize> {
        let store = self.store()?;
        let batch = self.config.upsert_batch.max(1);
        let mut total = 0;
        let mut points = points;
        while !points.is_empty() {
            let rest = points.split_off(points.len().min(batch));
            total += store.upsert(collection, points).await?;
            points = rest;
        }
        Ok(total)
    }

    /// Embed the query through the cached path and run k-NN.
    pub async fn search(
        &mut self,
        collection: &str,
        query: &str,
        limit: u64,
        filter: Option<PayloadFilter>,
        min_score: Option<f32>,
    ) -> Result<Vec<SearchHit>> {
        let vector = self.embed(query).await?;
        let qfilter = filter.as_ref().map(to_qdrant_filter);
        let raw = self.store()?.search(collection, vector, limit, qfilter).await?;

        let mut hits: Vec<SearchHit> = raw
            .into_iter()
            .map(|(score, payload)| SearchHit {
                id: payload
                    .get("_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                score,
                payload,
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        if let Some(min) = min_score {
            hits.retain(|h| h.score >= min);
        }
        Ok(hits)
    }

    /// Delete every point whose payload `file` equals `path`.
    pub async fn delete_by_file(&self, collection: &str, path: &str) -> Result<()> {
        let filter = to_qdrant_filter(&PayloadFilter::ByFile(path.to_string()));
        self.store()?.delete_by_filter(collection, filter).await
    }

    pub async fn count(&self, collection: &str) -> Result<u64> {
        self.store()?.count(collection, None).await
    }

    pub async fn check_collection_compatibility(
        &self,
        collection: &str,
    ) -> Result<CollectionCompatibility> {
        let required_dims = self
            .dimensions()
            .ok_or_else(|| VectorError::Config("no backend selected".into()))?;
        let info = self.store()?.collection_info(collection).await?;
        let (existing_dims, point_count) = match info {
            Some((dims, points)) => (Some(dims), Some(points)),
            None => (None, None),
        };
        Ok(CollectionCompatibility {
            needs_recreation: existing_dims.is_some_and(|d| d != required_dims),
            existing_dims,
            required_dims,
            point_count,
        })
    }

    /// Recreate a dimension-incompatible collection. Never destructive
    /// without `force`; reports the number of points lost when it is.
    pub async fn migrate_collection_if_needed(
        &self,
        collection: &str,
        force: bool,
    ) -> Result<MigrationOutcome> {
        let compat = self.check_collection_compatibility(collection).await?;
        let (migrate, requires_force) =
            migration_decision(compat.existing_dims, compat.required_dims, force);

        if !migrate {
            return Ok(MigrationOutcome {
                migrated: false,
                requires_force,
                points_lost: 0,
                old_dims: compat.existing_dims,
                new_dims: compat.required_dims,
            });
        }

        let points_lost = compat.point_count.unwrap_or(0);
        let store = self.store()?;
        store.delete_collection(collection).await?;
        store
            .ensure_collection(collection, compat.required_dims)
            .await?;
        info!(
            "migrated collection '{collection}': {:?} -> {} dims, {points_lost} points lost",
            compat.existing_dims, compat.required_dims
        );

        Ok(MigrationOutcome {
            migrated: true,
            requires_force: false,
            points_lost,
            old_dims: compat.existing_dims,
            new_dims: compat.required_dims,
        })
    }
}

fn backoff_delay(attempt: u32, backend: BackendKind) -> Duration {
    let base_ms: u64 = match backend {
        BackendKind::Ollama => 1000,
        _ => 500,
    };
    let exp = base_ms.saturating_mul(1 << (attempt - 1).min(3));
    let jitter = rand::rng().random_range(0..500);
    Duration::from_millis(exp.min(8_000) + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migration_decision_is_safe_by_default() {
        // Same dims: nothing to do either way.
        assert_eq!(migration_decision(Some(768), 768, false), (false, false));
        assert_eq!(migration_decision(Some(768), 768, true), (false, false));
        // Missing collection: creation is not migration.
        assert_eq!(migration_decision(None, 768, true), (false, false));
        // Mismatch: force gates deletion.
        assert_eq!(migration_decision(Some(1536), 768, false), (false, true));
        assert_eq!(migration_decision(Some(1536), 768, true), (true, false));
    }

    #[test]
    fn backoff_grows_with_attempts() {
        let first = backoff_delay(1, BackendKind::OpenAi);
        let third = backoff_delay(3, BackendKind::OpenAi);
        assert!(first >= Duration::from_millis(500));
        assert!(third >= Duration::from_millis(2000));
        assert!(third <= Duration::from_millis(8_500));
    }

    #[test]
    fn local_backoff_starts_at_one_second() {
        let d = backoff_delay(1, BackendKind::Ollama);
        assert!(d >= Duration::from_millis(1000));
        assert!(d < Duration::from_millis(1500));
    }
}
