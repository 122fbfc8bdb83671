//! The content-addressed on-disk cache.
//!
//! Layout under the cache directory:
//!
//! ```text
//! embeddings/
//! ├── index.json       # EmbeddingIndex
//! └── vectors/
//!     └── {id}.bin     # raw little-endian f32 vectors
//! ```
//!
//! The index is loaded lazily on first access and persisted on `save`/`close`.
//! Mutations mark the index dirty. A single instance is not safe for
//! concurrent mutation; the sync engine serializes writes.

use crate::bundle::{BUNDLE_VERSION, BundleEmbedding, EmbeddingBundle, ImportOutcome};
use crate::errors::{CacheError, Result};
use crate::id::{cache_id, text_hash};
use crate::index::{CacheStats, EmbeddingEntry, EmbeddingIndex};
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Default maximum total size: 1 GiB.
pub const DEFAULT_MAX_BYTES: u64 = 1024 * 1024 * 1024;

/// Cache construction parameters.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding `index.json` and `vectors/`.
    pub dir: PathBuf,
    pub model: String,
    pub dimensions: usize,
    pub max_bytes: u64,
}

impl CacheConfig {
    pub fn new(dir: impl Into<PathBuf>, model: &str, dimensions: usize) -> Self {
        Self {
            dir: dir.into(),
            model: model.to_string(),
            dimensions,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// Result of a batched lookup.
#[derive(Debug, Default)]
pub struct BatchLookup {
    /// Texts resolved from the cache.
    pub cached: HashMap<String, Vec<f32>>,
    /// Texts that need embedding.
    pub missing: Vec<String>,
    /// Content-addressed id for every requested text.
    pub ids: HashMap<String, String>,
}

pub struct EmbeddingCache {
    config: CacheConfig,
    /// Lazily loaded; `None` until first access.
    index: Option<EmbeddingIndex>,
    dirty: bool,
}

impl EmbeddingCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            index: None,
            dirty: false,
        }
    }

    /// Content-addressed id for `text` under the configured model.
    pub fn id_for(&self, text: &str) -> String {
        cache_id(&self.config.model, text)
    }

    fn index_path(&self) -> PathBuf {
        self.config.dir.join("index.json")
    }

    fn vectors_dir(&self) -> PathBuf {
        self.config.dir.join("vectors")
    }

    fn vector_path(&self, id: &str) -> PathBuf {
        self.vectors_dir().join(format!("{id}.bin"))
    }

    /// Load the index from disk on first use.
    ///
    /// An index persisted for a different model is discarded wholesale: ids
    /// are model-scoped, so none of its content can be valid here.
    async fn ensure_loaded(&mut self) -> Result<&mut EmbeddingIndex> {
        if self.index.is_none() {
            let loaded = match fs::read(self.index_path()).await {
                Ok(bytes) => match serde_json::from_slice::<EmbeddingIndex>(&bytes) {
                    Ok(index) if index.model == self.config.model => {
                        debug!(
                            "loaded embedding index: {} entries, model {}",
                            index.entries.len(),
                            index.model
                        );
                        index
                    }
                    Ok(index) => {
                        warn!(
                            "embedding index model changed ({} -> {}), discarding index",
                            index.model, self.config.model
                        );
                        let _ = fs::remove_dir_all(self.vectors_dir()).await;
                        self.dirty = true;
                        EmbeddingIndex::new(&self.config.model, self.config.dimensions)
                    }
                    Err(err) => {
                        warn!("embedding index unreadable ({err}), starting fresh");
                        self.dirty = true;
                        EmbeddingIndex::new(&self.config.model, self.config.dimensions)
                    }
                },
                Err(_) => EmbeddingIndex::new(&self.config.model, self.config.dimensions),
            };
            self.index = Some(loaded);
        }
        Ok(self.index.as_mut().expect("index loaded above"))
    }

    /// Look one text up. Corrupt or missing blobs degrade to a miss and the
    /// stale entry is dropped from the index.
    pub async fn get(&mut self, text: &str) -> Result<Option<Vec<f32>>> {
        let id = self.id_for(text);
        self.get_by_id(&id).await
    }

    async fn get_by_id(&mut self, id: &str) -> Result<Option<Vec<f32>>> {
        let dims = self.config.dimensions;
        let path = self.vector_path(id);
        let index = self.ensure_loaded().await?;

        if !index.entries.contains_key(id) {
            return Ok(None);
        }

        let entry_dims = index.entries[id].dimensions;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(_) => {
                warn!("cache blob missing for {id}, dropping entry");
                index.entries.remove(id);
                self.dirty = true;
                return Ok(None);
            }
        };

        if entry_dims != dims || bytes.len() != dims * std::mem::size_of::<f32>() {
            warn!(
                "cache blob dimension mismatch for {id} ({} bytes, want {} dims), dropping entry",
                bytes.len(),
                dims
            );
            index.entries.remove(id);
            self.dirty = true;
            let _ = fs::remove_file(&path).await;
            return Ok(None);
        }

        if let Some(entry) = index.entries.get_mut(id) {
            entry.access_count += 1;
            entry.last_accessed = Utc::now();
            self.dirty = true;
        }

        Ok(Some(decode_vector(&bytes)))
    }

    /// Store one vector; returns its content-addressed id. Re-setting the
    /// same text overwrites the blob and keeps a single entry.
    pub async fn set(&mut self, text: &str, vector: &[f32]) -> Result<String> {
        let id = self.id_for(text);
        let hash = text_hash(text);
        let dims = self.config.dimensions;
        let model = self.config.model.clone();
        let path = self.vector_path(&id);

        fs::create_dir_all(self.vectors_dir()).await?;
        fs::write(&path, encode_vector(vector)).await?;

        let index = self.ensure_loaded().await?;
        let now = Utc::now();
        let entry = index
            .entries
            .entry(id.clone())
            .or_insert_with(|| EmbeddingEntry {
                id: id.clone(),
                model,
                dimensions: dims,
                created_at: now,
                access_count: 0,
                last_accessed: now,
                text_hash: hash,
            });
        entry.dimensions = vector.len();
        entry.last_accessed = now;
        self.dirty = true;

        Ok(id)
    }

    /// Resolve a batch: cached vectors, misses, and ids for every text.
    pub async fn get_batch(&mut self, texts: &[String]) -> Result<BatchLookup> {
        let mut out = BatchLookup::default();
        for text in texts {
            let id = self.id_for(text);
            out.ids.insert(text.clone(), id.clone());
            match self.get_by_id(&id).await? {
                Some(vector) => {
                    out.cached.insert(text.clone(), vector);
                }
                None => out.missing.push(text.clone()),
            }
        }
        debug!(
            "cache batch: {} hits, {} misses",
            out.cached.len(),
            out.missing.len()
        );
        Ok(out)
    }

    pub async fn set_batch(&mut self, items: &[(String, Vec<f32>)]) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(items.len());
        for (text, vector) in items {
            ids.push(self.set(text, vector).await?);
        }
        Ok(ids)
    }

    /// Export entries (all, or a subset by id) into a portable bundle.
    pub async fn export(&mut self, ids: Option<&[String]>) -> Result<EmbeddingBundle> {
        let model = self.config.model.clone();
        let dimensions = self.config.dimensions;

        let selected: Vec<String> = {
            let index = self.ensure_loaded().await?;
            match ids {
                Some(ids) => ids
                    .iter()
                    .filter(|id| index.entries.contains_key(*id))
                    .cloned()
                    .collect(),
                None => index.entries.keys().cloned().collect(),
            }
        };

        let mut embeddings = Vec::with_capacity(selected.len());
        for id in selected {
            let hash = {
                let index = self.ensure_loaded().await?;
                index.entries[&id].text_hash.clone()
            };
            if let Some(vector) = self.get_by_id(&id).await? {
                embeddings.push(BundleEmbedding {
                    id,
                    text_hash: hash,
                    vector,
                });
            }
        }

        info!("exported {} embeddings for model {model}", embeddings.len());
        Ok(EmbeddingBundle {
            version: BUNDLE_VERSION.to_string(),
            model,
            dimensions,
            exported_at: Utc::now(),
            embeddings,
        })
    }

    /// Import a bundle. Only bundles for the configured model are accepted;
    /// already-present ids are skipped.
    pub async fn import(&mut self, bundle: &EmbeddingBundle) -> Result<ImportOutcome> {
        if bundle.version != BUNDLE_VERSION {
            return Err(CacheError::BundleVersion(bundle.version.clone()));
        }
        if bundle.model != self.config.model {
            return Err(CacheError::BundleModelMismatch {
                bundle: bundle.model.clone(),
                configured: self.config.model.clone(),
            });
        }

        let model = self.config.model.clone();
        let mut outcome = ImportOutcome::default();
        fs::create_dir_all(self.vectors_dir()).await?;

        for item in &bundle.embeddings {
            let exists = {
                let index = self.ensure_loaded().await?;
                index.entries.contains_key(&item.id)
            };
            if exists {
                outcome.skipped += 1;
                continue;
            }

            fs::write(self.vector_path(&item.id), encode_vector(&item.vector)).await?;
            let now = Utc::now();
            let index = self.ensure_loaded().await?;
            index.entries.insert(
                item.id.clone(),
                EmbeddingEntry {
                    id: item.id.clone(),
                    model: model.clone(),
                    dimensions: item.vector.len(),
                    created_at: now,
                    access_count: 0,
                    last_accessed: now,
                    text_hash: item.text_hash.clone(),
                },
            );
            self.dirty = true;
            outcome.imported += 1;
        }

        info!(
            "bundle import: {} imported, {} skipped",
            outcome.imported, outcome.skipped
        );
        Ok(outcome)
    }

    /// Drop every entry and blob.
    pub async fn clear(&mut self) -> Result<()> {
        let _ = fs::remove_dir_all(self.vectors_dir()).await;
        let index = self.ensure_loaded().await?;
        index.entries.clear();
        self.dirty = true;
        self.save().await
    }

    /// Evict least-recently-accessed entries until total size fits
    /// `target_bytes` (the configured maximum when `None`). Returns the
    /// number of evicted entries.
    pub async fn evict_lru(&mut self, target_bytes: Option<u64>) -> Result<usize> {
        let target = target_bytes.unwrap_or(self.config.max_bytes);

        let victims: Vec<String> = {
            let index = self.ensure_loaded().await?;
            let mut total = index.total_bytes();
            if total <= target {
                return Ok(0);
            }
            let mut by_age: Vec<&EmbeddingEntry> = index.entries.values().collect();
            by_age.sort_by_key(|e| e.last_accessed);

            let mut victims = Vec::new();
            for entry in by_age {
                if total <= target {
                    break;
                }
                total = total.saturating_sub(entry.byte_len());
                victims.push(entry.id.clone());
            }
            victims
        };

        for id in &victims {
            let _ = fs::remove_file(self.vector_path(id)).await;
            let index = self.ensure_loaded().await?;
            index.entries.remove(id);
        }
        if !victims.is_empty() {
            self.dirty = true;
            info!("evicted {} embeddings (LRU)", victims.len());
        }
        Ok(victims.len())
    }

    pub async fn stats(&mut self) -> Result<CacheStats> {
        let model = self.config.model.clone();
        let dimensions = self.config.dimensions;
        let index = self.ensure_loaded().await?;
        Ok(CacheStats {
            total_entries: index.entries.len(),
            total_bytes: index.total_bytes(),
            model,
            dimensions,
        })
    }

    /// Persist the index when dirty.
    pub async fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let Some(index) = &self.index else {
            return Ok(());
        };
        fs::create_dir_all(&self.config.dir).await?;
        let json = serde_json::to_vec_pretty(index)?;
        write_atomic(&self.index_path(), &json).await?;
        self.dirty = false;
        debug!("embedding index saved ({} entries)", index.entries.len());
        Ok(())
    }

    /// Persist and drop the in-memory index.
    pub async fn close(&mut self) -> Result<()> {
        self.save().await?;
        self.index = None;
        Ok(())
    }
}

/// Write via a temp file then rename, so a crash cannot truncate the index.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
