//! Parser registry: language detection and tiered parser loading.
//!
//! Construction probes every native grammar once. A grammar that fails to
//! load is replaced by the regex fallback for its language and the failure
//! reason is recorded; downstream consumers see the same `ParsedFile` shape
//! either way. Grammar handles are immutable after construction and the
//! registry is freely shareable.

use crate::chunker::{self, DEFAULT_FILE_CHUNK_LINE_LIMIT};
use crate::errors::Result;
use crate::fallback::FallbackParser;
use crate::native::{Extraction, NativeParser};
use crate::types::{CodeChunk, Export, Import, Language, ParsedFile, SymbolNode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::path::Path;
use tracing::{debug, warn};

/// Whether the process runs on native grammars or regex fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParserMode {
    #[default]
    Native,
    Fallback,
}

impl Display for ParserMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ParserMode::Native => "native",
            ParserMode::Fallback => "fallback",
        })
    }
}

/// Reason a native grammar could not be loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrammarFailure {
    pub language: Language,
    pub reason: String,
}

/// Registry construction options.
#[derive(Debug, Clone)]
pub struct ParserOptions {
    /// Whole-file chunk limit for files without chunkable symbols.
    pub chunk_file_line_limit: usize,
    /// Skip native grammars entirely (diagnostics and tests).
    pub force_fallback: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            chunk_file_line_limit: DEFAULT_FILE_CHUNK_LINE_LIMIT,
            force_fallback: false,
        }
    }
}

/// One language's parser: native grammar or regex fallback.
///
/// Tagged dispatch; both variants satisfy the same capability set
/// (`extract_symbols` / `extract_imports` / `extract_exports` / `chunk_code`).
enum LanguageParser {
    Native(NativeParser),
    Fallback(FallbackParser),
}

impl LanguageParser {
    fn extract(&self, path: &str, content: &str) -> Result<Extraction> {
        match self {
            LanguageParser::Native(p) => p.extract(path, content),
            LanguageParser::Fallback(p) => Ok(p.extract(path, content)),
        }
    }
}

pub struct ParserRegistry {
    options: ParserOptions,
    parsers: HashMap<Language, LanguageParser>,
    /// Always-available regex parsers, used to rescue native parse failures.
    rescue: HashMap<Language, FallbackParser>,
    failures: Vec<GrammarFailure>,
}

impl ParserRegistry {
    /// Build the registry, probing native grammars for every language.
    pub fn new(options: ParserOptions) -> Self {
        let mut parsers = HashMap::new();
        let mut rescue = HashMap::new();
        let mut failures = Vec::new();

        for lang in Language::ALL {
            rescue.insert(lang, FallbackParser::new(lang));

            // Markdown is structural text; the regex/section parser is its
            // only implementation and does not count as a grammar failure.
            if lang == Language::Markdown || options.force_fallback {
                parsers.insert(lang, LanguageParser::Fallback(FallbackParser::new(lang)));
                continue;
            }

            match NativeParser::load(lang) {
                Ok(native) => {
                    debug!("loaded native grammar for {lang}");
                    parsers.insert(lang, LanguageParser::Native(native));
                }
                Err(err) => {
                    warn!("native grammar unavailable for {lang}: {err}; using regex fallback");
                    failures.push(GrammarFailure {
                        language: lang,
                        reason: err.to_string(),
                    });
                    parsers.insert(lang, LanguageParser::Fallback(FallbackParser::new(lang)));
                }
            }
        }

        Self {
            options,
            parsers,
            rescue,
            failures,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ParserOptions::default())
    }

    /// `Native` iff every native grammar loaded.
    pub fn mode(&self) -> ParserMode {
        if self.failures.is_empty() && !self.options.force_fallback {
            ParserMode::Native
        } else {
            ParserMode::Fallback
        }
    }

    pub fn load_failures(&self) -> &[GrammarFailure] {
        &self.failures
    }

    /// Language for a path. Unknown extensions default to typescript.
    pub fn detect_language(&self, path: &str) -> Language {
        Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Language::from_extension)
            .unwrap_or(Language::Typescript)
    }

    /// Whether the extension maps to a known language (no default applied).
    pub fn is_extension_supported(&self, ext: &str) -> bool {
        Language::from_extension(ext.trim_start_matches('.')).is_some()
    }

    pub fn supported_languages(&self) -> Vec<Language> {
        Language::ALL.to_vec()
    }

    /// Parse one file into the normalized model.
    ///
    /// A native parse failure degrades to the regex fallback for that file
    /// instead of surfacing an error; the result is well-formed either way.
    pub fn parse_file(
        &self,
        path: &str,
        content: &str,
        language: Option<Language>,
    ) -> ParsedFile {
        self.parse_file_at(path, path, content, language)
    }

    /// Like [`Self::parse_file`] with an explicit absolute path.
    pub fn parse_file_at(
        &self,
        path: &str,
        absolute_path: &str,
        content: &str,
        language: Option<Language>,
    ) -> ParsedFile {
        let lang = language.unwrap_or_else(|| self.detect_language(path));
        let parser = self
            .parsers
            .get(&lang)
            .unwrap_or_else(|| unreachable!("all languages registered at construction"));

        let extraction = match parser.extract(path, content) {
            Ok(extraction) => extraction,
            Err(err) => {
                warn!("native parse failed for {path}: {err}; retrying with regex fallback");
                self.rescue
                    .get(&lang)
                    .map(|p| p.extract(path, content))
                    .unwrap_or_default()
            }
        };

        let chunks = chunker::chunk_code(
            path,
            lang,
            content,
            &extraction.symbols,
            self.options.chunk_file_line_limit,
        );

        ParsedFile {
            path: path.to_string(),
            absolute_path: absolute_path.to_string(),
            language: lang,
            content: content.to_string(),
            symbols: extraction.symbols,
            imports: extraction.imports,
            exports: extraction.exports,
            chunks,
        }
    }

    /// Capability-set projections, for callers that want one facet only.
    pub fn extract_symbols(&self, path: &str, content: &str) -> Vec<SymbolNode> {
        self.parse_file(path, content, None).symbols
    }

    pub fn extract_imports(&self, path: &str, content: &str) -> Vec<Import> {
        self.parse_file(path, content, None).imports
    }

    pub fn extract_exports(&self, path: &str, content: &str) -> Vec<Export> {
        self.parse_file(path, content, None).exports
    }

    pub fn chunk_code(&self, path: &str, content: &str) -> Vec<CodeChunk> {
        self.parse_file(path, content, None).chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extension_defaults_to_typescript() {
        let registry = ParserRegistry::with_defaults();
        assert_eq!(registry.detect_language("weird.xyz"), Language::Typescript);
        assert_eq!(registry.detect_language("lib.rs"), Language::Rust);
        assert!(registry.is_extension_supported("py"));
        assert!(registry.is_extension_supported(".go"));
        assert!(!registry.is_extension_supported("xyz"));
    }

    #[test]
    fn force_fallback_flips_mode() {
        let registry = ParserRegistry::new(ParserOptions {
            force_fallback: true,
            ..ParserOptions::default()
        });
        assert_eq!(registry.mode(), ParserMode::Fallback);

        // Fallback still yields a well-formed ParsedFile.
        let parsed = registry.parse_file("a.ts", "export function f() {}", None);
        assert_eq!(parsed.symbols.len(), 1);
        assert_eq!(parsed.symbols[0].name, "f");
    }
}
