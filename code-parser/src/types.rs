//! Language-agnostic parse model shared by every parser variant.
//!
//! Conventions:
//! - `serde(rename_all = "snake_case")` for enums to keep serialized forms stable.
//! - Line numbers are 1-based and inclusive on both ends.
//! - `qualified_name` is `"{file}:[Owner.]{name}"` and unique per repo per sync.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Language discriminator for parsed files.
///
/// Detection is purely by extension; unknown extensions fall through to
/// `Typescript` to preserve backward compatibility with mixed repos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Typescript,
    Python,
    Go,
    Rust,
    Java,
    Markdown,
}

impl Language {
    /// All languages the registry knows about.
    pub const ALL: [Language; 6] = [
        Language::Typescript,
        Language::Python,
        Language::Go,
        Language::Rust,
        Language::Java,
        Language::Markdown,
    ];

    /// Map a file extension (without the dot, any case) to a language.
    pub fn from_extension(ext: &str) -> Option<Language> {
        match ext.to_ascii_lowercase().as_str() {
            "ts" | "tsx" | "js" | "jsx" => Some(Language::Typescript),
            "py" => Some(Language::Python),
            "go" => Some(Language::Go),
            "rs" => Some(Language::Rust),
            "java" => Some(Language::Java),
            "md" => Some(Language::Markdown),
            _ => None,
        }
    }
}

impl Display for Language {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Language::Typescript => "typescript",
            Language::Python => "python",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Java => "java",
            Language::Markdown => "markdown",
        };
        f.write_str(s)
    }
}

/// Symbol kind taxonomy. Keep the set stable; payload consumers match on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Interface,
    Type,
    Variable,
    Constant,
}

impl SymbolKind {
    /// Kinds that own a body worth embedding as a chunk.
    pub fn is_chunkable(self) -> bool {
        matches!(
            self,
            SymbolKind::Function | SymbolKind::Method | SymbolKind::Class
        )
    }
}

impl Display for SymbolKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Type => "type",
            SymbolKind::Variable => "variable",
            SymbolKind::Constant => "constant",
        })
    }
}

/// Visibility markers. Languages without textual modifiers report `Public`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
    Protected,
}

/// A single call site recorded inside a symbol body.
///
/// `callee` is the textual name only; resolution to a symbol happens
/// best-effort in the graph. Method calls `obj.m()` record `m`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallInfo {
    pub callee: String,
    pub line: usize,
    /// True iff an `if`/`else`/`try`/`catch`/`switch`/`case`/ternary ancestor
    /// lies between the call and the symbol body root.
    pub is_conditional: bool,
}

/// A named construct extracted from source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolNode {
    pub name: String,
    /// `"{file}:[Owner.]{name}"`, unique within a repo for one sync.
    pub qualified_name: String,
    pub kind: SymbolKind,
    /// Repo-relative file path.
    pub file: String,
    /// 1-based, inclusive. `end_line >= start_line` always holds.
    pub start_line: usize,
    pub end_line: usize,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub docstring: Option<String>,
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub is_async: bool,
    #[serde(default)]
    pub is_static: bool,
    /// McCabe cyclomatic complexity, always >= 1.
    pub complexity: u32,
    #[serde(default)]
    pub calls: Vec<CallInfo>,
}

/// How an import binds names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportType {
    Default,
    Named,
    Namespace,
    SideEffect,
}

/// An import directive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Import {
    /// Module specifier as written in source.
    pub source: String,
    #[serde(default)]
    pub imported_symbols: Vec<String>,
    pub import_type: ImportType,
    /// True when the specifier does not resolve inside the repo.
    pub is_external: bool,
    #[serde(default)]
    pub package_name: Option<String>,
    pub line: usize,
}

/// Export binding kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    Default,
    Named,
}

/// An exported name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Export {
    pub name: String,
    pub kind: ExportKind,
    pub line: usize,
}

/// A contiguous block of source targeted for embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeChunk {
    /// `"{file}:{start_line}-{end_line}"`, deterministic across hosts.
    pub id: String,
    pub file: String,
    pub language: Language,
    pub text: String,
    pub start_line: usize,
    pub end_line: usize,
    /// Present when the chunk coincides with a symbol.
    #[serde(default)]
    pub symbol_name: Option<String>,
    #[serde(default)]
    pub symbol_kind: Option<SymbolKind>,
    #[serde(default)]
    pub docstring: Option<String>,
}

impl CodeChunk {
    /// Deterministic chunk id.
    pub fn make_id(file: &str, start_line: usize, end_line: usize) -> String {
        format!("{file}:{start_line}-{end_line}")
    }
}

/// Normalized output of parsing one source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedFile {
    /// Repo-relative path.
    pub path: String,
    pub absolute_path: String,
    pub language: Language,
    pub content: String,
    pub symbols: Vec<SymbolNode>,
    pub imports: Vec<Import>,
    pub exports: Vec<Export>,
    pub chunks: Vec<CodeChunk>,
}

impl ParsedFile {
    /// An empty but well-formed result for files where extraction failed.
    pub fn empty(path: &str, absolute_path: &str, language: Language, content: &str) -> Self {
        Self {
            path: path.to_string(),
            absolute_path: absolute_path.to_string(),
            language,
            content: content.to_string(),
            symbols: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            chunks: Vec::new(),
        }
    }

    /// Total lines of the file content.
    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }
}

/// Build the canonical qualified name for a symbol.
pub fn qualified_name(file: &str, owner: Option<&str>, name: &str) -> String {
    match owner {
        Some(owner) if !owner.is_empty() => format!("{file}:{owner}.{name}"),
        _ => format!("{file}:{name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_mapping_covers_spec_table() {
        for ext in ["ts", "tsx", "js", "jsx"] {
            assert_eq!(Language::from_extension(ext), Some(Language::Typescript));
        }
        assert_eq!(Language::from_extension("py"), Some(Language::Python));
        assert_eq!(Language::from_extension("go"), Some(Language::Go));
        assert_eq!(Language::from_extension("rs"), Some(Language::Rust));
        assert_eq!(Language::from_extension("java"), Some(Language::Java));
        assert_eq!(Language::from_extension("md"), Some(Language::Markdown));
        assert_eq!(Language::from_extension("zig"), None);
    }

    #[test]
    fn chunk_id_is_deterministic() {
        assert_eq!(CodeChunk::make_id("src/a.ts", 3, 9), "src/a.ts:3-9");
    }

    #[test]
    fn qualified_name_includes_owner_when_present() {
        assert_eq!(qualified_name("a.ts", None, "f"), "a.ts:f");
        assert_eq!(qualified_name("a.ts", Some("C"), "m"), "a.ts:C.m");
    }
}
