//! Repository identity and the on-disk state layout.
//!
//! The repo id is a hash of a canonical identifier of the working copy: the
//! `origin` remote URL when one exists, the canonicalized root path
//! otherwise. It namespaces every piece of persisted state so multiple
//! repos share storage safely.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Hidden state directory name under the working copy.
pub const STATE_DIR_NAME: &str = ".cv";

#[derive(Debug, Clone)]
pub struct RepoIdentity {
    pub root: PathBuf,
    pub repo_id: String,
}

impl RepoIdentity {
    /// Resolve the identity of the working copy at `root`.
    pub fn discover(root: &Path) -> std::io::Result<Self> {
        let root = dunce::canonicalize(root)?;
        let canonical = origin_url(&root).unwrap_or_else(|| root.to_string_lossy().to_string());
        let repo_id = hash_id(&canonical);
        debug!("repo identity: {canonical} -> {repo_id}");
        Ok(Self { root, repo_id })
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR_NAME)
    }
}

/// Derived `.cv/` paths. `config.json` is user-managed; the engine reads it
/// only. `sessions/` is opaque to the core.
#[derive(Debug, Clone)]
pub struct StateLayout {
    dir: PathBuf,
}

impl StateLayout {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: state_dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join("config.json")
    }

    pub fn sync_state_path(&self) -> PathBuf {
        self.dir.join("sync-state.json")
    }

    pub fn embeddings_dir(&self) -> PathBuf {
        self.dir.join("embeddings")
    }

    pub fn graph_dir(&self, repo_id: &str) -> PathBuf {
        self.dir.join("graph").join(repo_id)
    }
}

/// First 16 hex digits of SHA-256 over the canonical identifier.
pub fn hash_id(canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

fn origin_url(root: &Path) -> Option<String> {
    let repo = git2::Repository::discover(root).ok()?;
    let remote = repo.find_remote("origin").ok()?;
    remote.url().map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn repo_id_is_stable_for_the_same_path() {
        let dir = TempDir::new().unwrap();
        let a = RepoIdentity::discover(dir.path()).unwrap();
        let b = RepoIdentity::discover(dir.path()).unwrap();
        assert_eq!(a.repo_id, b.repo_id);
        assert_eq!(a.repo_id.len(), 16);
        assert!(a.repo_id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn different_paths_give_different_ids() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        assert_ne!(
            RepoIdentity::discover(a.path()).unwrap().repo_id,
            RepoIdentity::discover(b.path()).unwrap().repo_id
        );
    }

    #[test]
    fn layout_paths_follow_the_state_dir() {
        let layout = StateLayout::new("/repo/.cv");
        assert_eq!(
            layout.sync_state_path(),
            PathBuf::from("/repo/.cv/sync-state.json")
        );
        assert_eq!(
            layout.embeddings_dir(),
            PathBuf::from("/repo/.cv/embeddings")
        );
        assert_eq!(
            layout.graph_dir("ab12"),
            PathBuf::from("/repo/.cv/graph/ab12")
        );
    }
}
