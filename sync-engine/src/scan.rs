//! Working-copy enumeration with glob excludes and language filtering.

use code_parser::{Language, ParserRegistry};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Directories skipped regardless of user patterns.
const DEFAULT_EXCLUDES: &[&str] = &[
    "**/.git/**",
    "**/node_modules/**",
    "**/target/**",
    "**/dist/**",
    "**/build/**",
    "**/.cv/**",
    "**/__pycache__/**",
    "**/vendor/**",
];

/// One candidate file found under the working copy.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    /// Repo-relative, forward slashes.
    pub path: String,
    pub absolute_path: PathBuf,
    /// `None` when the extension maps to no known language; such files are
    /// skipped and counted, never fatal.
    pub language: Option<Language>,
}

fn build_globset(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in DEFAULT_EXCLUDES {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        }
    }
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(err) => warn!("ignoring invalid exclude pattern '{pattern}': {err}"),
        }
    }
    builder.build().unwrap_or_else(|_| GlobSet::empty())
}

/// Normalize to a forward-slash repo-relative string.
pub fn repo_relative(root: &Path, path: &Path) -> String {
    pathdiff::diff_paths(path, root)
        .unwrap_or_else(|| path.to_path_buf())
        .to_string_lossy()
        .replace('\\', "/")
}

/// Enumerate candidate files, applying excludes and the language filter.
pub fn enumerate_files(
    root: &Path,
    registry: &ParserRegistry,
    exclude_patterns: &[String],
    include_languages: Option<&[Language]>,
) -> Vec<ScannedFile> {
    let excludes = build_globset(exclude_patterns);
    let mut out = Vec::new();

    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = repo_relative(root, entry.path());
        if excludes.is_match(&rel) {
            continue;
        }

        let ext = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        let language = if registry.is_extension_supported(ext) {
            Some(registry.detect_language(&rel))
        } else {
            None
        };

        if let (Some(lang), Some(filter)) = (language, include_languages) {
            if !filter.contains(&lang) {
                continue;
            }
        }

        out.push(ScannedFile {
            path: rel,
            absolute_path: entry.path().to_path_buf(),
            language,
        });
    }

    debug!(
        "enumerated {} files ({} unsupported)",
        out.len(),
        out.iter().filter(|f| f.language.is_none()).count()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use code_parser::ParserOptions;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "content").unwrap();
    }

    fn registry() -> ParserRegistry {
        // Fallback keeps these tests grammar-independent.
        ParserRegistry::new(ParserOptions {
            force_fallback: true,
            ..ParserOptions::default()
        })
    }

    #[test]
    fn default_excludes_and_custom_patterns_apply() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/app.ts");
        touch(dir.path(), "node_modules/pkg/index.js");
        touch(dir.path(), "generated/schema.ts");

        let registry = registry();
        let all = enumerate_files(dir.path(), &registry, &[], None);
        assert_eq!(all.len(), 2);

        let filtered = enumerate_files(
            dir.path(),
            &registry,
            &["generated/**".to_string()],
            None,
        );
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].path, "src/app.ts");
    }

    #[test]
    fn unsupported_extensions_are_kept_but_unlabeled() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/main.rs");
        touch(dir.path(), "assets/logo.svg");

        let files = enumerate_files(dir.path(), &registry(), &[], None);
        assert_eq!(files.len(), 2);
        let svg = files.iter().find(|f| f.path.ends_with(".svg")).unwrap();
        assert!(svg.language.is_none());
        let rs = files.iter().find(|f| f.path.ends_with(".rs")).unwrap();
        assert_eq!(rs.language, Some(Language::Rust));
    }

    #[test]
    fn language_filter_restricts_candidates() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.py");
        touch(dir.path(), "b.go");

        let files = enumerate_files(
            dir.path(),
            &registry(),
            &[],
            Some(&[Language::Python]),
        );
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "a.py");
    }
}
