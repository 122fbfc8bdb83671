//! Doc-comment extraction shared by native and fallback parsers.
//!
//! Walks up from a symbol's start line, accumulating contiguous doc-comment
//! lines, and stops at the first non-comment line. Annotation/decorator lines
//! (`@…`, `#[…]`) between the comment block and the symbol are skipped.
//! Returned text keeps the raw markers.

use crate::types::Language;

/// Extract the doc comment directly above `start_line` (1-based), if any.
pub fn doc_above(lines: &[&str], start_line: usize, lang: Language) -> Option<String> {
    if start_line < 2 {
        return None;
    }
    let mut idx = start_line - 2; // index of the line above the symbol

    // Skip decorators/attributes/annotations sitting between doc and symbol.
    loop {
        let t = lines.get(idx)?.trim();
        if t.starts_with('@') || (t.starts_with("#[") && lang == Language::Rust) {
            if idx == 0 {
                return None;
            }
            idx -= 1;
            continue;
        }
        break;
    }

    // Block comment ending here (`*/`)? Collect up to its `/**` opener.
    let tail = lines[idx].trim();
    if tail.ends_with("*/") {
        let mut start = idx;
        loop {
            let t = lines[start].trim();
            if t.starts_with("/**") || t.starts_with("/*") {
                let block: Vec<&str> = lines[start..=idx].to_vec();
                return Some(block.join("\n"));
            }
            if start == 0 {
                return None;
            }
            start -= 1;
        }
    }

    // Contiguous line comments.
    let marker = line_marker(lang)?;
    let mut collected: Vec<&str> = Vec::new();
    let mut i = idx;
    loop {
        let t = lines[i].trim();
        if t.starts_with(marker) {
            collected.push(lines[i]);
            if i == 0 {
                break;
            }
            i -= 1;
        } else {
            break;
        }
    }
    if collected.is_empty() {
        return None;
    }
    collected.reverse();
    Some(collected.join("\n"))
}

/// Line-comment marker that counts as documentation for the language.
fn line_marker(lang: Language) -> Option<&'static str> {
    match lang {
        Language::Rust => Some("///"),
        Language::Go => Some("//"),
        Language::Python => Some("#"),
        Language::Typescript => Some("//"),
        Language::Java => Some("//"),
        Language::Markdown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_comment_is_collected_with_markers() {
        let src = ["/**", " * Adds things.", " */", "function add() {}"];
        let doc = doc_above(&src, 4, Language::Typescript).unwrap();
        assert!(doc.starts_with("/**"));
        assert!(doc.contains("Adds things."));
        assert!(doc.ends_with("*/"));
    }

    #[test]
    fn line_comments_stop_at_first_non_comment() {
        let src = ["let x = 1;", "/// one", "/// two", "fn f() {}"];
        let doc = doc_above(&src, 4, Language::Rust).unwrap();
        assert_eq!(doc, "/// one\n/// two");
    }

    #[test]
    fn decorators_are_skipped() {
        let src = ["# docs here", "@wraps(f)", "def g():"];
        let doc = doc_above(&src, 3, Language::Python).unwrap();
        assert_eq!(doc, "# docs here");
    }

    #[test]
    fn no_doc_returns_none() {
        let src = ["let x = 1;", "fn f() {}"];
        assert!(doc_above(&src, 2, Language::Rust).is_none());
        assert!(doc_above(&src, 1, Language::Rust).is_none());
    }
}
