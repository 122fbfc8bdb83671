//! cv-engine: a local code knowledge engine.
//!
//! Maintains a persistent, queryable model of a working copy (files,
//! symbols, call/import relationships, and semantic embeddings) and serves
//! it to interactive and tool-protocol clients. This crate wires the
//! components together; each concern lives in its own workspace member:
//!
//! - [`code_parser`]: polyglot AST parsing with regex fallback
//! - [`embedding_cache`]: content-addressed vector cache
//! - [`vector_store`]: embedding backends and the Qdrant collection lifecycle
//! - [`code_graph`]: embedded property graph of files, symbols, and calls
//! - [`sync_engine`]: full/incremental indexing pipeline
//! - [`commit_analyzer`]: staged-diff classification

mod config;
mod repo;
pub mod telemetry;

pub use config::{ConfigFile, EngineConfig};
pub use repo::{RepoIdentity, STATE_DIR_NAME, StateLayout, hash_id};

pub use code_graph;
pub use code_parser;
pub use commit_analyzer;
pub use embedding_cache;
pub use sync_engine;
pub use vector_store;

use code_graph::CodeGraph;
use code_parser::{ParserOptions, ParserRegistry};
use std::path::Path;
use std::sync::Arc;
use sync_engine::{SyncEngine, SyncOptions, SyncState};
use thiserror::Error;
use tracing::{info, warn};
use vector_store::{VectorConfig, VectorManager};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("vector error: {0}")]
    Vector(#[from] vector_store::VectorError),

    #[error("graph error: {0}")]
    Graph(#[from] code_graph::GraphError),

    #[error("sync error: {0}")]
    Sync(#[from] sync_engine::SyncError),

    #[error("analysis error: {0}")]
    Analyze(#[from] commit_analyzer::AnalyzeError),
}

/// One engine per working copy. Owns every component; at most one sync runs
/// at a time through the exclusive borrow.
pub struct Engine {
    identity: RepoIdentity,
    layout: StateLayout,
    config: EngineConfig,
    registry: Arc<ParserRegistry>,
    sync: SyncEngine,
}

impl Engine {
    /// Open the engine for the working copy at `root`: resolve identity and
    /// configuration, load grammars, connect the vector backend, open the
    /// graph.
    pub async fn open(root: &Path) -> Result<Self, EngineError> {
        let identity = RepoIdentity::discover(root)?;
        let layout = StateLayout::new(identity.state_dir());
        let config = EngineConfig::load(&layout.config_path());
        Self::open_with(identity, layout, config).await
    }

    /// Open with an explicit configuration (tests, non-standard hosts).
    pub async fn open_with(
        identity: RepoIdentity,
        layout: StateLayout,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let registry = Arc::new(ParserRegistry::new(ParserOptions {
            chunk_file_line_limit: config.chunk_file_line_limit,
            force_fallback: false,
        }));
        if !registry.load_failures().is_empty() {
            warn!(
                "running with regex fallback parsers for: {:?}",
                registry
                    .load_failures()
                    .iter()
                    .map(|f| f.language)
                    .collect::<Vec<_>>()
            );
        }

        let mut vector_config = VectorConfig::new(&config.qdrant_url, layout.embeddings_dir());
        vector_config.qdrant_api_key = config.qdrant_api_key.clone();
        vector_config.repo_id = Some(identity.repo_id.clone());
        vector_config.model = config.embedding_model.clone();
        vector_config.ollama_url = config.ollama_url.clone();
        vector_config.openrouter_api_key = config.openrouter_api_key.clone();
        vector_config.openai_api_key = config.openai_api_key.clone();
        vector_config.cache_max_bytes = config.cache_max_bytes;

        let mut vectors = VectorManager::new(vector_config);
        vectors.connect().await?;

        let graph = CodeGraph::connect(layout.graph_dir(&identity.repo_id), &identity.repo_id)
            .await?;
        if let Some(owner) = graph.ownership_mismatch() {
            warn!(
                "graph store belongs to repo {} (expected {}); proceed with care",
                owner.repo_id, identity.repo_id
            );
        }

        let sync = SyncEngine::new(
            &identity.root,
            &identity.repo_id,
            layout.sync_state_path(),
            registry.clone(),
            graph,
            vectors,
        );

        Ok(Self {
            identity,
            layout,
            config,
            registry,
            sync,
        })
    }

    /// Sync options seeded from the engine configuration.
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            exclude_patterns: self.config.exclude_patterns.clone(),
            ..SyncOptions::default()
        }
    }

    pub fn identity(&self) -> &RepoIdentity {
        &self.identity
    }

    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    pub fn registry(&self) -> &Arc<ParserRegistry> {
        &self.registry
    }

    /// The sync engine, including its graph and vector handles.
    pub fn sync(&mut self) -> &mut SyncEngine {
        &mut self.sync
    }

    /// Run a full sync. `force` clears the graph first; the engine issues
    /// the clear here so the sync pipeline itself never destroys state.
    pub async fn full_sync(
        &mut self,
        opts: &SyncOptions,
        force: bool,
    ) -> Result<SyncState, EngineError> {
        if force {
            info!("forced full sync: clearing graph first");
            self.sync.graph_mut().clear();
        }
        Ok(self.sync.full_sync(opts).await?)
    }

    pub async fn incremental_sync(
        &mut self,
        changed: &[String],
        opts: &SyncOptions,
    ) -> Result<SyncState, EngineError> {
        Ok(self.sync.incremental_sync(changed, opts).await?)
    }

    /// Classify the currently staged diff against the graph baseline.
    pub fn analyze_staged(&self) -> Result<commit_analyzer::CommitAnalysis, EngineError> {
        Ok(commit_analyzer::analyze_staged(
            &self.identity.root,
            &self.registry,
            Some(self.sync.graph()),
        )?)
    }

    /// Persist everything and release handles.
    pub async fn close(&mut self) -> Result<(), EngineError> {
        self.sync.graph_mut().close().await?;
        if let Some(vectors) = self.sync.vectors_mut() {
            vectors.save_cache().await?;
        }
        Ok(())
    }
}
