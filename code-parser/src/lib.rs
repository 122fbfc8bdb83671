//! Polyglot source parsing for the code knowledge engine.
//!
//! Turns source files into a normalized model (symbols, imports, exports,
//! calls, chunks) via Tree-sitter grammars, with regex fallback parsers that
//! keep the same contract when a grammar is unavailable.

pub mod chunker;
pub mod docstring;
mod errors;
pub mod fallback;
pub mod native;
pub mod registry;
pub mod types;

pub use errors::{ParseError, Result};
pub use registry::{GrammarFailure, ParserMode, ParserOptions, ParserRegistry};
pub use types::{
    CallInfo, CodeChunk, Export, ExportKind, Import, ImportType, Language, ParsedFile, SymbolKind,
    SymbolNode, Visibility, qualified_name,
};
