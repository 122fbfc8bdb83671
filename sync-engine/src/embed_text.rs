//! Deterministic embedding-text templates.
//!
//! The template feeds the content-addressed cache, so any change here
//! invalidates every cached embedding. Keep it stable.

use code_parser::CodeChunk;

/// Text submitted for a code chunk: language, path, symbol context,
/// docstring, then the raw text.
pub fn chunk_embed_text(chunk: &CodeChunk) -> String {
    let mut out = String::new();
    out.push_str(&format!("Language: {}\n", chunk.language));
    out.push_str(&format!("File: {}\n", chunk.file));
    if let (Some(kind), Some(name)) = (chunk.symbol_kind, chunk.symbol_name.as_deref()) {
        out.push_str(&format!("Symbol: {kind} {name}\n"));
    }
    if let Some(doc) = chunk.docstring.as_deref() {
        out.push_str(doc);
        out.push('\n');
    }
    out.push_str(&chunk.text);
    out
}

/// Text submitted for a standalone docstring.
pub fn docstring_embed_text(file: &str, symbol: &str, docstring: &str) -> String {
    format!("File: {file}\nSymbol: {symbol}\n{docstring}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use code_parser::{Language, SymbolKind};

    #[test]
    fn template_is_deterministic_and_ordered() {
        let chunk = CodeChunk {
            id: "src/a.ts:1-3".into(),
            file: "src/a.ts".into(),
            language: Language::Typescript,
            text: "function add() {}".into(),
            start_line: 1,
            end_line: 3,
            symbol_name: Some("add".into()),
            symbol_kind: Some(SymbolKind::Function),
            docstring: Some("/** sums */".into()),
        };
        let a = chunk_embed_text(&chunk);
        let b = chunk_embed_text(&chunk);
        assert_eq!(a, b);

        let lang_pos = a.find("Language:").unwrap();
        let file_pos = a.find("File:").unwrap();
        let sym_pos = a.find("Symbol: function add").unwrap();
        let doc_pos = a.find("/** sums */").unwrap();
        let text_pos = a.find("function add").unwrap();
        assert!(lang_pos < file_pos && file_pos < sym_pos && sym_pos < doc_pos && doc_pos < text_pos);
    }
}
