//! Native AST extraction built on Tree-sitter.
//!
//! A new `tree_sitter::Parser` is created per call; grammar handles are loaded
//! once at registry construction and are immutable afterwards. Grammar-load
//! failures surface as [`ParseError::GrammarLoad`] so the registry can fall
//! back to the regex parsers.

mod go;
mod helpers;
mod java;
mod python;
mod rust;
mod typescript;

use crate::errors::{ParseError, Result};
use crate::types::{Export, Import, Language, SymbolNode};
use tree_sitter::Parser;

/// Combined output of one native extraction pass.
#[derive(Debug, Default)]
pub struct Extraction {
    pub symbols: Vec<SymbolNode>,
    pub imports: Vec<Import>,
    pub exports: Vec<Export>,
}

/// One loaded native grammar, ready to parse files of its language.
pub struct NativeParser {
    language: Language,
    grammar: tree_sitter::Language,
    /// Plain-JS grammar used for `.js`/`.jsx` inputs of the typescript family.
    js_grammar: Option<tree_sitter::Language>,
}

impl NativeParser {
    /// Load and probe the grammar for `language`.
    ///
    /// Probing runs `Parser::set_language`, which is where ABI mismatches
    /// between the core library and a grammar crate show up.
    pub fn load(language: Language) -> Result<Self> {
        let (grammar, js_grammar): (tree_sitter::Language, Option<tree_sitter::Language>) =
            match language {
                Language::Typescript => (
                    tree_sitter_typescript::LANGUAGE_TSX.into(),
                    Some(tree_sitter_javascript::LANGUAGE.into()),
                ),
                Language::Python => (tree_sitter_python::LANGUAGE.into(), None),
                Language::Rust => (tree_sitter_rust::LANGUAGE.into(), None),
                Language::Go => (tree_sitter_go::LANGUAGE.into(), None),
                Language::Java => (tree_sitter_java::LANGUAGE.into(), None),
                Language::Markdown => {
                    return Err(ParseError::UnsupportedLanguage("markdown".into()));
                }
            };

        let mut probe = Parser::new();
        probe
            .set_language(&grammar)
            .map_err(|e| ParseError::GrammarLoad {
                language: language.to_string(),
                reason: e.to_string(),
            })?;
        if let Some(js) = &js_grammar {
            probe
                .set_language(js)
                .map_err(|e| ParseError::GrammarLoad {
                    language: "javascript".into(),
                    reason: e.to_string(),
                })?;
        }

        Ok(Self {
            language,
            grammar,
            js_grammar,
        })
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Parse `content` and extract symbols, imports and exports.
    pub fn extract(&self, path: &str, content: &str) -> Result<Extraction> {
        let grammar = match (&self.js_grammar, plain_js(path)) {
            (Some(js), true) => js,
            _ => &self.grammar,
        };

        let mut parser = Parser::new();
        parser
            .set_language(grammar)
            .map_err(|e| ParseError::GrammarLoad {
                language: self.language.to_string(),
                reason: e.to_string(),
            })?;
        let tree = parser
            .parse(content, None)
            .ok_or_else(|| ParseError::ParseFailed {
                path: path.to_string(),
                reason: "tree-sitter returned no tree".into(),
            })?;

        let root = tree.root_node();
        let out = match self.language {
            Language::Typescript => typescript::extract(root, content, path),
            Language::Python => python::extract(root, content, path),
            Language::Rust => rust::extract(root, content, path),
            Language::Go => go::extract(root, content, path),
            Language::Java => java::extract(root, content, path),
            Language::Markdown => Extraction::default(),
        };
        Ok(out)
    }
}

fn plain_js(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".js") || lower.ends_with(".jsx") || lower.ends_with(".mjs")
}
