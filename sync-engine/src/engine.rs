//! Full and incremental sync orchestration.
//!
//! Pipeline: enumerate -> parse (bounded workers) -> graph-upsert -> embed
//! (bounded channel into one embedder task) -> vector-upsert -> finalize.
//! Ordering guarantees: a file's node is written before its symbols, all
//! graph writes for a file complete before its chunks enter the embedding
//! queue, and sync state is persisted last.

use crate::embed_text::{chunk_embed_text, docstring_embed_text};
use crate::errors::{Result, SyncError};
use crate::progress::{CancelToken, ProgressEvent, ProgressHandler, SyncPhase};
use crate::scan::{ScannedFile, enumerate_files};
use crate::state::{SyncFailure, SyncState, load_sync_state, save_sync_state};
use chrono::{DateTime, Utc};
use code_graph::{CallTarget, CodeGraph, CommitRecord, FileRecord, ImportTarget, SymbolRecord};
use code_parser::{CodeChunk, Language, ParsedFile, ParserRegistry, SymbolNode, Visibility};
use futures::StreamExt;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use vector_store::{VectorManager, VectorPoint};

/// Options for one sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub exclude_patterns: Vec<String>,
    pub include_languages: Option<Vec<Language>>,
    /// Bounded parse worker pool.
    pub workers: usize,
    /// Capacity of the embedding queue; full queue blocks producers.
    pub embed_queue_depth: usize,
    /// Chunks accumulated before one embed/upsert round.
    pub embed_batch_size: usize,
    /// Also embed symbol docstrings into the docstrings collection.
    pub index_docstrings: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            exclude_patterns: Vec::new(),
            include_languages: None,
            workers: 8,
            embed_queue_depth: 64,
            embed_batch_size: 32,
            index_docstrings: true,
        }
    }
}

/// Work item flowing from the producer into the embedder task.
enum EmbedItem {
    Code(CodeChunk),
    Document(CodeChunk),
    Docstring {
        id: String,
        file: String,
        language: String,
        symbol: String,
        kind: String,
        text: String,
    },
}

/// At most one sync runs per repository: the engine is the single owner of
/// its graph handle, vector manager, and sync state file.
pub struct SyncEngine {
    root: PathBuf,
    repo_id: String,
    state_path: PathBuf,
    registry: Arc<ParserRegistry>,
    graph: CodeGraph,
    vectors: Option<VectorManager>,
    reporter: Option<ProgressHandler>,
    cancel: CancelToken,
}

impl SyncEngine {
    pub fn new(
        root: impl Into<PathBuf>,
        repo_id: &str,
        state_path: impl Into<PathBuf>,
        registry: Arc<ParserRegistry>,
        graph: CodeGraph,
        vectors: VectorManager,
    ) -> Self {
        Self {
            root: root.into(),
            repo_id: repo_id.to_string(),
            state_path: state_path.into(),
            registry,
            graph,
            vectors: Some(vectors),
            reporter: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn set_progress_handler(&mut self, handler: ProgressHandler) {
        self.reporter = Some(handler);
    }

    /// Handle observers use to request cancellation at phase boundaries.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// The graph facade; a forced full sync clears it here before syncing.
    pub fn graph_mut(&mut self) -> &mut CodeGraph {
        &mut self.graph
    }

    pub fn graph(&self) -> &CodeGraph {
        &self.graph
    }

    pub fn vectors_mut(&mut self) -> Option<&mut VectorManager> {
        self.vectors.as_mut()
    }

    pub async fn load_sync_state(&self) -> Option<SyncState> {
        load_sync_state(&self.state_path).await
    }

    pub async fn save_sync_state(&self, state: &SyncState) -> Result<()> {
        save_sync_state(&self.state_path, state).await
    }

    fn emit(&self, phase: SyncPhase, current: usize, total: usize, message: impl Into<String>) {
        if let Some(handler) = &self.reporter {
            handler(ProgressEvent {
                phase,
                current,
                total,
                message: message.into(),
            });
        }
    }

    fn check_cancel(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }

    // ---- full sync ---------------------------------------------------------

    /// Index the whole working copy.
    ///
    /// A forced full sync is expressed by the caller clearing the graph
    /// facade before invoking this; the engine itself never destroys state.
    pub async fn full_sync(&mut self, opts: &SyncOptions) -> Result<SyncState> {
        self.check_cancel()?;
        info!("full sync starting for {}", self.root.display());

        self.emit(SyncPhase::Enumerate, 0, 0, "listing candidate files");
        let files = enumerate_files(
            &self.root,
            &self.registry,
            &opts.exclude_patterns,
            opts.include_languages.as_deref(),
        );
        let unsupported = files.iter().filter(|f| f.language.is_none()).count();
        let candidates: Vec<ScannedFile> =
            files.into_iter().filter(|f| f.language.is_some()).collect();
        self.emit(
            SyncPhase::Enumerate,
            candidates.len(),
            candidates.len(),
            format!("{} candidates, {unsupported} unsupported skipped", candidates.len()),
        );

        self.check_cancel()?;
        let mut failures = Vec::new();
        let parsed = self.parse_all(&candidates, opts, &mut failures).await?;

        self.check_cancel()?;
        self.upsert_graph(&parsed)?;
        self.graph.save().await?;

        self.check_cancel()?;
        let chunks_embedded = self.embed_parsed(&parsed, opts).await?;

        self.check_cancel()?;
        self.emit(SyncPhase::Finalize, 0, 1, "persisting sync state");
        if let Some(vectors) = self.vectors.as_mut() {
            vectors.save_cache().await?;
        }

        let state = SyncState {
            repo_id: self.repo_id.clone(),
            last_commit_synced: head_sha(&self.root),
            last_synced_at: Utc::now(),
            files_indexed: parsed.len(),
            symbols_indexed: parsed.iter().map(|p| p.symbols.len()).sum(),
            chunks_embedded,
            parser_mode: self.registry.mode(),
            failures,
        };
        self.save_sync_state(&state).await?;
        self.emit(SyncPhase::Finalize, 1, 1, "done");
        info!(
            "full sync done: {} files, {} symbols, {} chunks",
            state.files_indexed, state.symbols_indexed, state.chunks_embedded
        );
        Ok(state)
    }

    // ---- incremental sync --------------------------------------------------

    /// Re-index only the given repo-relative paths.
    ///
    /// Deleted paths drop their graph nodes and vector points; changed paths
    /// are delete-then-upserted. No global symbol rebuild happens here;
    /// cross-file references re-resolve on the next query.
    pub async fn incremental_sync(
        &mut self,
        changed: &[String],
        opts: &SyncOptions,
    ) -> Result<SyncState> {
        self.check_cancel()?;
        info!("incremental sync: {} changed paths", changed.len());

        let mut failures = Vec::new();
        let mut deleted: Vec<String> = Vec::new();
        let mut candidates: Vec<ScannedFile> = Vec::new();

        self.emit(SyncPhase::Enumerate, 0, changed.len(), "classifying changes");
        for rel in changed {
            let absolute = self.root.join(rel);
            if !absolute.exists() {
                deleted.push(rel.clone());
                continue;
            }
            let ext = absolute
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("");
            if !self.registry.is_extension_supported(ext) {
                debug!("unsupported changed file {rel}, ignoring");
                continue;
            }
            candidates.push(ScannedFile {
                path: rel.clone(),
                language: Some(self.registry.detect_language(rel)),
                absolute_path: absolute,
            });
        }

        self.check_cancel()?;
        let parsed = self.parse_all(&candidates, opts, &mut failures).await?;

        self.check_cancel()?;
        // Graph first: drop deleted files, delete-then-upsert the changed.
        for rel in &deleted {
            self.graph.delete_file(rel);
        }
        for parsed_file in &parsed {
            self.graph.delete_file(&parsed_file.path);
        }
        self.upsert_graph(&parsed)?;
        self.graph.save().await?;

        // Vector points: stale chunks go before fresh ones arrive.
        let vectors = self
            .vectors
            .as_ref()
            .ok_or_else(|| SyncError::Config("vector manager not attached".into()))?;
        for rel in deleted.iter().chain(parsed.iter().map(|p| &p.path)) {
            for base in ["code_chunks", "docstrings", "document_chunks"] {
                let collection = vectors.collection(base);
                vectors.delete_by_file(&collection, rel).await?;
            }
        }

        self.check_cancel()?;
        let chunks_embedded = self.embed_parsed(&parsed, opts).await?;

        self.check_cancel()?;
        self.emit(SyncPhase::Finalize, 0, 1, "persisting sync state");
        if let Some(vectors) = self.vectors.as_mut() {
            vectors.save_cache().await?;
        }

        let stats = self.graph.get_stats();
        let previous = self.load_sync_state().await;
        let state = SyncState {
            repo_id: self.repo_id.clone(),
            last_commit_synced: head_sha(&self.root),
            last_synced_at: Utc::now(),
            files_indexed: stats.files,
            symbols_indexed: stats.symbols,
            chunks_embedded: previous.map(|p| p.chunks_embedded).unwrap_or(0) + chunks_embedded,
            parser_mode: self.registry.mode(),
            failures,
        };
        self.save_sync_state(&state).await?;
        self.emit(SyncPhase::Finalize, 1, 1, "done");
        Ok(state)
    }

    /// Record a commit in the graph and embed its message into the commits
    /// collection.
    pub async fn index_commit(
        &mut self,
        sha: &str,
        message: &str,
        author: &str,
        ts: DateTime<Utc>,
    ) -> Result<()> {
        self.graph.upsert_commit(CommitRecord {
            sha: sha.to_string(),
            message: message.to_string(),
            author: author.to_string(),
            ts,
        });
        self.graph.save().await?;

        let vectors = self
            .vectors
            .as_mut()
            .ok_or_else(|| SyncError::Config("vector manager not attached".into()))?;
        let vector = vectors.embed(message).await?;
        let collection = vectors.collection("commits");
        vectors
            .upsert_batch(
                &collection,
                vec![VectorPoint {
                    id: sha.to_string(),
                    vector,
                    payload: serde_json::json!({
                        "sha": sha,
                        "author": author,
                        "message": message,
                        "ts": ts.to_rfc3339(),
                    }),
                }],
            )
            .await?;
        Ok(())
    }

    // ---- phases ------------------------------------------------------------

    /// Parse candidates on the blocking pool, `workers` at a time. Per-file
    /// failures are recorded, never fatal.
    async fn parse_all(
        &self,
        candidates: &[ScannedFile],
        opts: &SyncOptions,
        failures: &mut Vec<SyncFailure>,
    ) -> Result<Vec<ParsedFile>> {
        let total = candidates.len();
        let mut stream = futures::stream::iter(candidates.iter().cloned().map(|file| {
            let registry = self.registry.clone();
            async move {
                let rel = file.path.clone();
                let handle = tokio::task::spawn_blocking(move || {
                    let content = std::fs::read_to_string(&file.absolute_path)
                        .map_err(|e| e.to_string())?;
                    Ok::<ParsedFile, String>(registry.parse_file_at(
                        &file.path,
                        &file.absolute_path.to_string_lossy(),
                        &content,
                        file.language,
                    ))
                });
                let outcome = match handle.await {
                    Ok(result) => result,
                    Err(join_err) => Err(format!("parser worker panicked: {join_err}")),
                };
                (rel, outcome)
            }
        }))
        .buffer_unordered(opts.workers.max(1));

        let mut parsed = Vec::with_capacity(total);
        let mut done = 0usize;
        while let Some((path, outcome)) = stream.next().await {
            done += 1;
            match outcome {
                Ok(file) => {
                    self.emit(SyncPhase::Parse, done, total, &file.path);
                    parsed.push(file);
                }
                Err(message) => {
                    warn!("parse failed for {path}: {message}");
                    self.emit(SyncPhase::Parse, done, total, format!("{path} (failed)"));
                    failures.push(SyncFailure { path, message });
                }
            }
        }
        Ok(parsed)
    }

    /// Write files, symbols and imports, then resolve calls against the
    /// complete symbol table.
    fn upsert_graph(&mut self, parsed: &[ParsedFile]) -> Result<()> {
        let total = parsed.len();
        let known_paths: HashSet<&str> = parsed.iter().map(|p| p.path.as_str()).collect();

        for (i, file) in parsed.iter().enumerate() {
            self.graph.upsert_file(FileRecord {
                path: file.path.clone(),
                language: file.language.to_string(),
                lines_of_code: file.line_count(),
                complexity: file.symbols.iter().map(|s| s.complexity).sum(),
            });
            for symbol in &file.symbols {
                self.graph.upsert_symbol(to_symbol_record(symbol));
            }
            for import in &file.imports {
                let target = resolve_import_target(&file.path, import, &known_paths);
                self.graph.upsert_import(&file.path, target);
            }
            self.emit(SyncPhase::GraphUpsert, i + 1, total, &file.path);
        }

        // Second pass: callees resolve by name against everything just
        // written. Shared names yield multi-edges; misses land on External.
        for file in parsed {
            for symbol in &file.symbols {
                for call in &symbol.calls {
                    let matches = self.graph.symbols_by_name(&call.callee);
                    if matches.is_empty() {
                        self.graph.upsert_call(
                            &symbol.qualified_name,
                            CallTarget::External(call.callee.clone()),
                            call.line,
                            call.is_conditional,
                        );
                    } else {
                        for target in matches {
                            self.graph.upsert_call(
                                &symbol.qualified_name,
                                CallTarget::Symbol(target.qualified_name),
                                call.line,
                                call.is_conditional,
                            );
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Stream chunks into the embedder sink; returns the embedded count.
    async fn embed_parsed(&mut self, parsed: &[ParsedFile], opts: &SyncOptions) -> Result<usize> {
        let manager = self
            .vectors
            .take()
            .ok_or_else(|| SyncError::Config("vector manager not attached".into()))?;

        let mut total_items = parsed.iter().map(|p| p.chunks.len()).sum::<usize>();
        if opts.index_docstrings {
            total_items += parsed
                .iter()
                .flat_map(|p| &p.symbols)
                .filter(|s| s.docstring.is_some())
                .count();
        }

        let (tx, rx) = mpsc::channel::<EmbedItem>(opts.embed_queue_depth.max(1));
        let embedder = tokio::spawn(run_embedder(
            manager,
            rx,
            opts.embed_batch_size.max(1),
            total_items,
            self.reporter.clone(),
            self.cancel.clone(),
        ));

        'produce: for file in parsed {
            if self.cancel.is_cancelled() {
                break;
            }
            for chunk in &file.chunks {
                let item = match file.language {
                    Language::Markdown => EmbedItem::Document(chunk.clone()),
                    _ => EmbedItem::Code(chunk.clone()),
                };
                // Backpressure: a full queue blocks here.
                if tx.send(item).await.is_err() {
                    break 'produce;
                }
            }
            if opts.index_docstrings {
                for symbol in file.symbols.iter().filter(|s| s.docstring.is_some()) {
                    let item = EmbedItem::Docstring {
                        id: format!("{}#doc", symbol.qualified_name),
                        file: file.path.clone(),
                        language: file.language.to_string(),
                        symbol: symbol.name.clone(),
                        kind: symbol.kind.to_string(),
                        text: docstring_embed_text(
                            &file.path,
                            &symbol.name,
                            symbol.docstring.as_deref().unwrap_or_default(),
                        ),
                    };
                    if tx.send(item).await.is_err() {
                        break 'produce;
                    }
                }
            }
        }
        drop(tx);

        let (manager, outcome) = embedder.await?;
        self.vectors = Some(manager);
        outcome
    }
}

/// The embedder task: drains the queue, batches, embeds via the cache-first
/// manager path, and upserts into the right collection.
async fn run_embedder(
    mut manager: VectorManager,
    mut rx: mpsc::Receiver<EmbedItem>,
    batch_size: usize,
    total: usize,
    reporter: Option<ProgressHandler>,
    cancel: CancelToken,
) -> (VectorManager, Result<usize>) {
    let mut embedded = 0usize;
    let mut batch: Vec<EmbedItem> = Vec::with_capacity(batch_size);

    let emit = |phase: SyncPhase, current: usize, message: &str| {
        if let Some(handler) = &reporter {
            handler(ProgressEvent {
                phase,
                current,
                total,
                message: message.to_string(),
            });
        }
    };

    loop {
        let item = rx.recv().await;
        match item {
            Some(item) if !cancel.is_cancelled() => {
                batch.push(item);
                if batch.len() >= batch_size {
                    match flush_batch(&mut manager, &mut batch, &mut embedded, &emit).await {
                        Ok(()) => {}
                        Err(e) => return (manager, Err(e)),
                    }
                }
            }
            Some(_) => {
                // Cancelled: stop accepting; in-flight work already finished.
                rx.close();
            }
            None => break,
        }
    }

    if !cancel.is_cancelled() && !batch.is_empty() {
        if let Err(e) = flush_batch(&mut manager, &mut batch, &mut embedded, &emit).await {
            return (manager, Err(e));
        }
    }
    (manager, Ok(embedded))
}

async fn flush_batch(
    manager: &mut VectorManager,
    batch: &mut Vec<EmbedItem>,
    embedded: &mut usize,
    emit: &impl Fn(SyncPhase, usize, &str),
) -> Result<()> {
    let items = std::mem::take(batch);
    let texts: Vec<String> = items
        .iter()
        .map(|item| match item {
            EmbedItem::Code(chunk) | EmbedItem::Document(chunk) => chunk_embed_text(chunk),
            EmbedItem::Docstring { text, .. } => text.clone(),
        })
        .collect();

    emit(SyncPhase::Embed, *embedded, "embedding batch");
    let vectors = manager.embed_batch(&texts).await?;

    let mut code_points = Vec::new();
    let mut doc_points = Vec::new();
    let mut docstring_points = Vec::new();
    for (item, vector) in items.into_iter().zip(vectors) {
        match item {
            EmbedItem::Code(chunk) => code_points.push(chunk_point(chunk, vector)),
            EmbedItem::Document(chunk) => doc_points.push(chunk_point(chunk, vector)),
            EmbedItem::Docstring {
                id,
                file,
                language,
                symbol,
                kind,
                text,
            } => docstring_points.push(VectorPoint {
                id,
                vector,
                payload: serde_json::json!({
                    "file": file,
                    "language": language,
                    "symbol": symbol,
                    "kind": kind,
                    "text": text,
                }),
            }),
        }
    }

    for (base, points) in [
        ("code_chunks", code_points),
        ("document_chunks", doc_points),
        ("docstrings", docstring_points),
    ] {
        if points.is_empty() {
            continue;
        }
        let count = points.len();
        let collection = manager.collection(base);
        manager.upsert_batch(&collection, points).await?;
        *embedded += count;
        emit(SyncPhase::VectorUpsert, *embedded, base);
    }
    Ok(())
}

fn chunk_point(chunk: CodeChunk, vector: Vec<f32>) -> VectorPoint {
    let payload = serde_json::json!({
        "file": chunk.file,
        "language": chunk.language.to_string(),
        "start_line": chunk.start_line,
        "end_line": chunk.end_line,
        "symbol": chunk.symbol_name,
        "kind": chunk.symbol_kind.map(|k| k.to_string()),
        "text": chunk.text,
    });
    VectorPoint {
        id: chunk.id,
        vector,
        payload,
    }
}

fn to_symbol_record(symbol: &SymbolNode) -> SymbolRecord {
    SymbolRecord {
        name: symbol.name.clone(),
        qualified_name: symbol.qualified_name.clone(),
        kind: symbol.kind.to_string(),
        file: symbol.file.clone(),
        start_line: symbol.start_line,
        end_line: symbol.end_line,
        signature: symbol.signature.clone(),
        visibility: Some(visibility_str(symbol.visibility).to_string()),
        is_async: symbol.is_async,
        is_static: symbol.is_static,
        complexity: symbol.complexity,
    }
}

fn visibility_str(v: Visibility) -> &'static str {
    match v {
        Visibility::Public => "public",
        Visibility::Private => "private",
        Visibility::Protected => "protected",
    }
}

/// Map an import to a graph target: repo file when the specifier resolves to
/// a known path, module node otherwise.
fn resolve_import_target(
    from: &str,
    import: &code_parser::Import,
    known_paths: &HashSet<&str>,
) -> ImportTarget {
    if import.is_external {
        let module = import
            .package_name
            .clone()
            .unwrap_or_else(|| import.source.clone());
        return ImportTarget::Module(module);
    }

    if let Some(resolved) = resolve_relative(from, &import.source, known_paths) {
        return ImportTarget::File(resolved);
    }
    ImportTarget::Module(import.source.clone())
}

/// Best-effort relative specifier resolution against the parsed path set.
fn resolve_relative(from: &str, source: &str, known_paths: &HashSet<&str>) -> Option<String> {
    let base = Path::new(from).parent().unwrap_or_else(|| Path::new(""));
    let joined = normalize_path(&base.join(source));

    const SUFFIXES: &[&str] = &[
        "", ".ts", ".tsx", ".js", ".jsx", ".py", ".go", ".rs", ".java", "/index.ts", "/index.js",
    ];
    for suffix in SUFFIXES {
        let candidate = format!("{joined}{suffix}");
        if known_paths.contains(candidate.as_str()) {
            return Some(candidate);
        }
    }
    None
}

/// Collapse `.` and `..` without touching the filesystem.
fn normalize_path(path: &Path) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for component in path.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                parts.pop();
            }
            std::path::Component::Normal(p) => parts.push(p.to_str().unwrap_or("")),
            _ => {}
        }
    }
    parts.join("/")
}

/// Current HEAD sha, `None` outside a git checkout.
fn head_sha(root: &Path) -> Option<String> {
    let repo = git2::Repository::discover(root).ok()?;
    let head = repo.head().ok()?;
    head.peel_to_commit().ok().map(|c| c.id().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_imports_resolve_against_known_paths() {
        let known: HashSet<&str> = ["src/util.ts", "src/lib/index.ts"].into_iter().collect();

        assert_eq!(
            resolve_relative("src/app.ts", "./util", &known),
            Some("src/util.ts".to_string())
        );
        assert_eq!(
            resolve_relative("src/app.ts", "./lib", &known),
            Some("src/lib/index.ts".to_string())
        );
        assert_eq!(resolve_relative("src/app.ts", "./missing", &known), None);
        assert_eq!(
            resolve_relative("src/deep/mod.ts", "../util.ts", &known),
            Some("src/util.ts".to_string())
        );
    }

    #[test]
    fn external_imports_become_modules() {
        let known: HashSet<&str> = HashSet::new();
        let import = code_parser::Import {
            source: "react-dom/client".into(),
            imported_symbols: vec!["createRoot".into()],
            import_type: code_parser::ImportType::Named,
            is_external: true,
            package_name: Some("react-dom".into()),
            line: 1,
        };
        match resolve_import_target("src/app.ts", &import, &known) {
            ImportTarget::Module(name) => assert_eq!(name, "react-dom"),
            other => panic!("expected module target, got {other:?}"),
        }
    }
}
