//! Staged-change acquisition through git2: raw patch text plus post-image
//! contents from the index.

use crate::analyzer::StagedFile;
use crate::errors::{AnalyzeError, Result};
use git2::{Delta, DiffFormat, DiffOptions, Repository};
use std::path::Path;
use tracing::debug;

/// Raw unified diff of the index against HEAD, plus the staged files with
/// their index-side contents.
pub fn staged_changes(repo_root: &Path) -> Result<(String, Vec<StagedFile>)> {
    let repo = Repository::discover(repo_root)?;
    let head_tree = repo
        .head()
        .ok()
        .and_then(|head| head.peel_to_tree().ok());

    let mut opts = DiffOptions::new();
    opts.include_untracked(false);
    let diff = repo.diff_tree_to_index(head_tree.as_ref(), None, Some(&mut opts))?;

    let mut raw = String::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        match line.origin() {
            '+' | '-' | ' ' => raw.push(line.origin()),
            _ => {}
        }
        raw.push_str(std::str::from_utf8(line.content()).unwrap_or(""));
        true
    })?;

    if raw.trim().is_empty() {
        return Err(AnalyzeError::NothingStaged);
    }

    let index = repo.index()?;
    let mut staged = Vec::new();
    for delta in diff.deltas() {
        let path = delta
            .new_file()
            .path()
            .or_else(|| delta.old_file().path())
            .map(|p| p.to_string_lossy().replace('\\', "/"));
        let Some(path) = path else { continue };

        let content = if delta.status() == Delta::Deleted {
            None
        } else {
            index
                .get_path(Path::new(&path), 0)
                .and_then(|entry| repo.find_blob(entry.id).ok())
                .and_then(|blob| String::from_utf8(blob.content().to_vec()).ok())
        };

        staged.push(StagedFile { path, content });
    }

    debug!("staged: {} files, {} bytes of diff", staged.len(), raw.len());
    Ok((raw, staged))
}
