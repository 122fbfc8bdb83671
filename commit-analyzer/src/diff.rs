//! Unified-diff parsing.
//!
//! Robust to missing `---`/`+++` headers (hunks-only input) and ignores
//! `\ No newline at end of file` markers. Accounting counts `+`/`-` content
//! lines only, never the file headers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiffLine {
    Added { new_line: u32, content: String },
    Removed { old_line: u32, content: String },
    Context { old_line: u32, new_line: u32, content: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffHunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    pub lines: Vec<DiffLine>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileDiff {
    /// New path (post-change); the old path for pure deletions.
    pub path: String,
    pub is_new: bool,
    pub is_deleted: bool,
    pub hunks: Vec<DiffHunk>,
}

impl FileDiff {
    pub fn lines_added(&self) -> usize {
        self.hunks
            .iter()
            .flat_map(|h| &h.lines)
            .filter(|l| matches!(l, DiffLine::Added { .. }))
            .count()
    }

    pub fn lines_removed(&self) -> usize {
        self.hunks
            .iter()
            .flat_map(|h| &h.lines)
            .filter(|l| matches!(l, DiffLine::Removed { .. }))
            .count()
    }
}

/// Parse a raw unified diff into per-file hunks.
pub fn parse_unified_diff(s: &str) -> Vec<FileDiff> {
    let mut files: Vec<FileDiff> = Vec::new();
    let mut current: Option<FileDiff> = None;
    let mut hunk: Option<DiffHunk> = None;
    let mut old_line = 0u32;
    let mut new_line = 0u32;

    let close_hunk = |current: &mut Option<FileDiff>, hunk: &mut Option<DiffHunk>| {
        if let (Some(file), Some(h)) = (current.as_mut(), hunk.take()) {
            file.hunks.push(h);
        }
    };

    for line in s.lines() {
        if line.starts_with("diff --git ") {
            close_hunk(&mut current, &mut hunk);
            if let Some(file) = current.take() {
                files.push(file);
            }
            current = Some(FileDiff {
                path: path_from_git_header(line),
                ..FileDiff::default()
            });
            continue;
        }
        if line.starts_with("new file mode") {
            if let Some(file) = current.as_mut() {
                file.is_new = true;
            }
            continue;
        }
        if line.starts_with("deleted file mode") {
            if let Some(file) = current.as_mut() {
                file.is_deleted = true;
            }
            continue;
        }
        if line.starts_with("+++ ") {
            // Prefer the post-image path; `+++ /dev/null` marks deletion.
            let path = line[4..].trim();
            if let Some(file) = current.as_mut() {
                if path != "/dev/null" {
                    file.path = strip_prefix(path);
                }
            }
            continue;
        }
        if line.starts_with("--- ") {
            let path = line[4..].trim();
            if path != "/dev/null" {
                if let Some(file) = current.as_mut() {
                    if file.path.is_empty() {
                        file.path = strip_prefix(path);
                    }
                }
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("@@") {
            close_hunk(&mut current, &mut hunk);
            if current.is_none() {
                // Hunks-only input: synthesize an unnamed file.
                current = Some(FileDiff::default());
            }
            if let Some((o_start, o_len, n_start, n_len)) = parse_hunk_header(rest) {
                old_line = o_start;
                new_line = n_start;
                hunk = Some(DiffHunk {
                    old_start: o_start,
                    old_lines: o_len,
                    new_start: n_start,
                    new_lines: n_len,
                    lines: Vec::new(),
                });
            }
            continue;
        }

        // Marker lines are not diff content.
        if line.starts_with("\\ ") {
            continue;
        }
        let Some(h) = hunk.as_mut() else { continue };

        if let Some(rest) = line.strip_prefix('+') {
            h.lines.push(DiffLine::Added {
                new_line,
                content: rest.to_string(),
            });
            new_line += 1;
        } else if let Some(rest) = line.strip_prefix('-') {
            h.lines.push(DiffLine::Removed {
                old_line,
                content: rest.to_string(),
            });
            old_line += 1;
        } else if let Some(rest) = line.strip_prefix(' ') {
            h.lines.push(DiffLine::Context {
                old_line,
                new_line,
                content: rest.to_string(),
            });
            old_line += 1;
            new_line += 1;
        }
    }

    close_hunk(&mut current, &mut hunk);
    if let Some(file) = current.take() {
        files.push(file);
    }
    files
}

/// `@@ -12,3 +12,6 @@ …` -> (12, 3, 12, 6).
fn parse_hunk_header(rest: &str) -> Option<(u32, u32, u32, u32)> {
    let rest = rest.trim_start_matches('@').trim();
    let mut parts = rest.split_whitespace();
    let old = parts.next()?.trim_start_matches('-');
    let new = parts.next()?.trim_start_matches('+');
    let (o_start, o_len) = split_nums(old);
    let (n_start, n_len) = split_nums(new);
    Some((o_start, o_len, n_start, n_len))
}

fn split_nums(s: &str) -> (u32, u32) {
    match s.split_once(',') {
        Some((start, len)) => (
            start.parse().unwrap_or(0),
            len.parse().unwrap_or(0),
        ),
        None => (s.parse().unwrap_or(0), 1),
    }
}

/// `diff --git a/src/x.ts b/src/x.ts` -> `src/x.ts` (post-image side).
fn path_from_git_header(line: &str) -> String {
    line.rsplit(' ')
        .next()
        .map(strip_prefix)
        .unwrap_or_default()
}

fn strip_prefix(path: &str) -> String {
    path.strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "diff --git a/src/math.ts b/src/math.ts\nindex 111..222 100644\n--- a/src/math.ts\n+++ b/src/math.ts\n@@ -1,3 +1,4 @@\n export function add(a, b) {\n-  return a + b;\n+  const sum = a + b;\n+  return sum;\n }\n";

    #[test]
    fn counts_exclude_file_headers() {
        let files = parse_unified_diff(SAMPLE);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "src/math.ts");
        assert_eq!(files[0].lines_added(), 2);
        assert_eq!(files[0].lines_removed(), 1);
    }

    #[test]
    fn line_numbers_follow_hunk_headers() {
        let files = parse_unified_diff(SAMPLE);
        let hunk = &files[0].hunks[0];
        assert_eq!(hunk.new_start, 1);
        match &hunk.lines[1] {
            DiffLine::Removed { old_line, .. } => assert_eq!(*old_line, 2),
            other => panic!("expected removal, got {other:?}"),
        }
        match &hunk.lines[2] {
            DiffLine::Added { new_line, .. } => assert_eq!(*new_line, 2),
            other => panic!("expected addition, got {other:?}"),
        }
    }

    #[test]
    fn hunks_only_input_is_accepted() {
        let raw = "@@ -1,2 +1,2 @@\n-old\n+new\n context\n";
        let files = parse_unified_diff(raw);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].lines_added(), 1);
        assert_eq!(files[0].lines_removed(), 1);
    }

    #[test]
    fn new_and_deleted_files_are_flagged() {
        let raw = "diff --git a/new.ts b/new.ts\nnew file mode 100644\n--- /dev/null\n+++ b/new.ts\n@@ -0,0 +1,1 @@\n+export const x = 1;\ndiff --git a/gone.ts b/gone.ts\ndeleted file mode 100644\n--- a/gone.ts\n+++ /dev/null\n@@ -1,1 +0,0 @@\n-export const y = 2;\n";
        let files = parse_unified_diff(raw);
        assert_eq!(files.len(), 2);
        assert!(files[0].is_new);
        assert_eq!(files[0].path, "new.ts");
        assert!(files[1].is_deleted);
        assert_eq!(files[1].path, "gone.ts");
    }

    #[test]
    fn no_newline_marker_is_ignored() {
        let raw = "@@ -1,1 +1,1 @@\n-a\n+b\n\\ No newline at end of file\n";
        let files = parse_unified_diff(raw);
        assert_eq!(files[0].lines_added(), 1);
        assert_eq!(files[0].lines_removed(), 1);
    }
}
