//! Persisted sync state: the marker of the last successful indexing pass.

use crate::errors::Result;
use chrono::{DateTime, Utc};
use code_parser::ParserMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// One captured per-file failure; never aborts the sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncFailure {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    pub repo_id: String,
    /// HEAD sha at the time of the sync; `None` outside a git checkout.
    pub last_commit_synced: Option<String>,
    pub last_synced_at: DateTime<Utc>,
    pub files_indexed: usize,
    pub symbols_indexed: usize,
    pub chunks_embedded: usize,
    pub parser_mode: ParserMode,
    #[serde(default)]
    pub failures: Vec<SyncFailure>,
}

/// Load the persisted state; `None` when absent or unreadable (a full sync
/// corrects either case).
pub async fn load_sync_state(path: &Path) -> Option<SyncState> {
    let bytes = fs::read(path).await.ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(state) => Some(state),
        Err(err) => {
            debug!("sync state unreadable ({err}), treating as absent");
            None
        }
    }
}

/// Persist atomically; written only after all other writes are acknowledged.
pub async fn save_sync_state(path: &Path, state: &SyncState) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(state)?).await?;
    fs::rename(&tmp, path).await?;
    debug!("sync state saved -> {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn state_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sync-state.json");

        assert!(load_sync_state(&path).await.is_none());

        let state = SyncState {
            repo_id: "ab12".into(),
            last_commit_synced: Some("deadbeef".into()),
            last_synced_at: Utc::now(),
            files_indexed: 10,
            symbols_indexed: 42,
            chunks_embedded: 37,
            parser_mode: ParserMode::Native,
            failures: vec![SyncFailure {
                path: "broken.ts".into(),
                message: "parse failed".into(),
            }],
        };
        save_sync_state(&path, &state).await.unwrap();

        let loaded = load_sync_state(&path).await.unwrap();
        assert_eq!(loaded.repo_id, "ab12");
        assert_eq!(loaded.chunks_embedded, 37);
        assert_eq!(loaded.failures.len(), 1);
    }
}
