//! Chunk assembly: turns extracted symbols (or whole files) into embedding
//! targets with deterministic ids.
//!
//! Rules:
//! - One chunk per function/method/class symbol.
//! - A file without such symbols and under the configured line limit yields a
//!   single whole-file chunk; larger symbol-less files contribute none.
//! - Markdown files chunk by heading section instead of symbols.

use crate::types::{CodeChunk, Language, ParsedFile, SymbolNode};

/// Default whole-file chunk limit, in lines.
pub const DEFAULT_FILE_CHUNK_LINE_LIMIT: usize = 200;

/// Build chunks for a parsed file. `file_line_limit` bounds the whole-file rule.
pub fn chunk_code(
    path: &str,
    language: Language,
    content: &str,
    symbols: &[SymbolNode],
    file_line_limit: usize,
) -> Vec<CodeChunk> {
    if language == Language::Markdown {
        return chunk_markdown(path, content, file_line_limit);
    }

    let lines: Vec<&str> = content.lines().collect();
    let mut chunks = Vec::new();

    for sym in symbols.iter().filter(|s| s.kind.is_chunkable()) {
        if let Some(text) = slice_lines(&lines, sym.start_line, sym.end_line) {
            chunks.push(CodeChunk {
                id: CodeChunk::make_id(path, sym.start_line, sym.end_line),
                file: path.to_string(),
                language,
                text,
                start_line: sym.start_line,
                end_line: sym.end_line,
                symbol_name: Some(sym.name.clone()),
                symbol_kind: Some(sym.kind),
                docstring: sym.docstring.clone(),
            });
        }
    }

    if chunks.is_empty() {
        if let Some(chunk) = whole_file_chunk(path, language, &lines, file_line_limit) {
            chunks.push(chunk);
        }
    }

    chunks
}

/// Build chunks directly from a `ParsedFile` (convenience for re-chunking).
pub fn chunk_parsed(parsed: &ParsedFile, file_line_limit: usize) -> Vec<CodeChunk> {
    chunk_code(
        &parsed.path,
        parsed.language,
        &parsed.content,
        &parsed.symbols,
        file_line_limit,
    )
}

fn whole_file_chunk(
    path: &str,
    language: Language,
    lines: &[&str],
    file_line_limit: usize,
) -> Option<CodeChunk> {
    let count = lines.len();
    if count == 0 || count >= file_line_limit {
        return None;
    }
    Some(CodeChunk {
        id: CodeChunk::make_id(path, 1, count),
        file: path.to_string(),
        language,
        text: lines.join("\n"),
        start_line: 1,
        end_line: count,
        symbol_name: None,
        symbol_kind: None,
        docstring: None,
    })
}

/// Markdown: one chunk per heading section; whole-file rule when no headings.
fn chunk_markdown(path: &str, content: &str, file_line_limit: usize) -> Vec<CodeChunk> {
    let lines: Vec<&str> = content.lines().collect();
    let mut section_starts: Vec<usize> = Vec::new(); // 1-based
    for (i, line) in lines.iter().enumerate() {
        let t = line.trim_start();
        if t.starts_with('#') && t.chars().take_while(|c| *c == '#').count() <= 6 {
            let after = t.trim_start_matches('#');
            if after.starts_with(' ') || after.is_empty() {
                section_starts.push(i + 1);
            }
        }
    }

    if section_starts.is_empty() {
        return whole_file_chunk(path, Language::Markdown, &lines, file_line_limit)
            .into_iter()
            .collect();
    }

    let mut chunks = Vec::new();
    for (idx, &start) in section_starts.iter().enumerate() {
        let end = section_starts
            .get(idx + 1)
            .map(|next| next - 1)
            .unwrap_or(lines.len());
        if let Some(text) = slice_lines(&lines, start, end) {
            let heading = lines[start - 1].trim_start_matches('#').trim().to_string();
            chunks.push(CodeChunk {
                id: CodeChunk::make_id(path, start, end),
                file: path.to_string(),
                language: Language::Markdown,
                text,
                start_line: start,
                end_line: end,
                symbol_name: (!heading.is_empty()).then_some(heading),
                symbol_kind: None,
                docstring: None,
            });
        }
    }
    chunks
}

/// Slice 1-based inclusive line range; `None` when out of bounds or empty.
fn slice_lines(lines: &[&str], start: usize, end: usize) -> Option<String> {
    if start == 0 || start > end || start > lines.len() {
        return None;
    }
    let end = end.min(lines.len());
    Some(lines[start - 1..end].join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SymbolKind, Visibility};

    fn sym(name: &str, kind: SymbolKind, start: usize, end: usize) -> SymbolNode {
        SymbolNode {
            name: name.into(),
            qualified_name: format!("f.ts:{name}"),
            kind,
            file: "f.ts".into(),
            start_line: start,
            end_line: end,
            signature: None,
            docstring: None,
            return_type: None,
            parameters: Vec::new(),
            visibility: Visibility::Public,
            is_async: false,
            is_static: false,
            complexity: 1,
            calls: Vec::new(),
        }
    }

    #[test]
    fn one_chunk_per_chunkable_symbol() {
        let content = "function a() {}\nfunction b() {}";
        let symbols = vec![
            sym("a", SymbolKind::Function, 1, 1),
            sym("b", SymbolKind::Function, 2, 2),
        ];
        let chunks = chunk_code("f.ts", Language::Typescript, content, &symbols, 200);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id, "f.ts:1-1");
        assert_eq!(chunks[1].id, "f.ts:2-2");
        assert_eq!(chunks[0].symbol_name.as_deref(), Some("a"));
    }

    #[test]
    fn variables_do_not_chunk_but_whole_file_rule_applies() {
        let content = "const x = 1;\nconst y = 2;";
        let symbols = vec![sym("x", SymbolKind::Constant, 1, 1)];
        let chunks = chunk_code("f.ts", Language::Typescript, content, &symbols, 200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "f.ts:1-2");
        assert!(chunks[0].symbol_name.is_none());
    }

    #[test]
    fn empty_file_yields_no_chunks() {
        let chunks = chunk_code("f.ts", Language::Typescript, "", &[], 200);
        assert!(chunks.is_empty());
    }

    #[test]
    fn large_symbolless_file_yields_no_chunks() {
        let content = vec!["let x;"; 400].join("\n");
        let chunks = chunk_code("f.ts", Language::Typescript, &content, &[], 200);
        assert!(chunks.is_empty());
    }

    #[test]
    fn markdown_chunks_by_heading() {
        let content = "# Intro\ntext\n## Usage\nmore\n";
        let chunks = chunk_code("README.md", Language::Markdown, content, &[], 200);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id, "README.md:1-2");
        assert_eq!(chunks[0].symbol_name.as_deref(), Some("Intro"));
        assert_eq!(chunks[1].id, "README.md:3-4");
    }
}
