//! Per-language regex rule sets for the fallback parsers.
//!
//! Patterns are anchored at line starts and capture the declared name in the
//! `name` group. Precision is deliberately best-effort; the native parsers are
//! the source of truth when grammars load.

use crate::types::{Language, SymbolKind};
use regex::Regex;

/// One declaration matcher.
pub struct DeclRule {
    pub regex: Regex,
    pub kind: SymbolKind,
    /// Matches only inside a class-like region (methods).
    pub member_only: bool,
}

/// Compiled rule set for one language.
pub struct LanguageRules {
    pub decls: Vec<DeclRule>,
    /// Class-like openers used for owner tracking.
    pub class_like: Vec<SymbolKind>,
    /// Non-symbol blocks that own methods (e.g. Rust `impl` blocks); the
    /// `owner` group captures the owning type name.
    pub region_openers: Vec<Regex>,
    pub imports: Vec<Regex>,
    pub export_named: Option<Regex>,
    pub export_default: Option<Regex>,
    /// Branch keywords counted for approximate complexity.
    pub branch_keywords: Regex,
    /// Keywords that look like calls and must be ignored by call extraction.
    pub call_blocklist: &'static [&'static str],
    /// Conditional openers used for the call-site heuristic.
    pub conditional_keywords: Regex,
    pub indent_scoped: bool,
}

fn rule(pattern: &str, kind: SymbolKind, member_only: bool) -> DeclRule {
    DeclRule {
        // Patterns are static and known-good; a bad one is a programmer error.
        regex: Regex::new(pattern).expect("invalid fallback pattern"),
        kind,
        member_only,
    }
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("invalid fallback pattern")
}

pub fn rules_for(lang: Language) -> LanguageRules {
    match lang {
        Language::Typescript => typescript(),
        Language::Python => python(),
        Language::Rust => rust(),
        Language::Go => go(),
        Language::Java => java(),
        Language::Markdown => markdown(),
    }
}

fn typescript() -> LanguageRules {
    LanguageRules {
        region_openers: Vec::new(),
        decls: vec![
            rule(
                r#"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(?P<name>[A-Za-z_$][\w$]*)"#,
                SymbolKind::Function,
                false,
            ),
            rule(
                r#"^\s*(?:export\s+)?(?:abstract\s+)?class\s+(?P<name>[A-Za-z_$][\w$]*)"#,
                SymbolKind::Class,
                false,
            ),
            rule(
                r#"^\s*(?:export\s+)?interface\s+(?P<name>[A-Za-z_$][\w$]*)"#,
                SymbolKind::Interface,
                false,
            ),
            rule(
                r#"^\s*(?:export\s+)?(?:type|enum)\s+(?P<name>[A-Za-z_$][\w$]*)"#,
                SymbolKind::Type,
                false,
            ),
            rule(
                r#"^\s*(?:export\s+)?const\s+(?P<name>[A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*(?::[^=>]+)?=>"#,
                SymbolKind::Function,
                false,
            ),
            rule(
                r#"^\s*(?:export\s+)?const\s+(?P<name>[A-Za-z_$][\w$]*)"#,
                SymbolKind::Constant,
                false,
            ),
            rule(
                r#"^\s*(?:export\s+)?(?:let|var)\s+(?P<name>[A-Za-z_$][\w$]*)"#,
                SymbolKind::Variable,
                false,
            ),
            rule(
                r#"^\s+(?:(?:public|private|protected)\s+)?(?:static\s+)?(?:async\s+)?(?:get\s+|set\s+)?(?P<name>[A-Za-z_$][\w$]*)\s*\([^;=]*\)\s*(?::[^{;]+)?\{"#,
                SymbolKind::Method,
                true,
            ),
        ],
        class_like: vec![SymbolKind::Class, SymbolKind::Interface],
        imports: vec![
            re(r#"^\s*import\s+(?:type\s+)?(?:(?P<clause>[^'"]+?)\s+from\s+)?['"](?P<source>[^'"]+)['"]"#),
            re(r#"^\s*(?:const|let|var)\s+(?P<clause>[\w$]+|\{[^}]*\})\s*=\s*require\(\s*['"](?P<source>[^'"]+)['"]\s*\)"#),
        ],
        export_named: Some(re(
            r#"^\s*export\s+(?:async\s+)?(?:function\s*\*?|class|interface|type|enum|const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)"#,
        )),
        export_default: Some(re(
            r#"^\s*export\s+default\s+(?:async\s+)?(?:function\s*\*?\s*|class\s+)?(?P<name>[A-Za-z_$][\w$]*)?"#,
        )),
        branch_keywords: re(r#"\b(?:if|else|for|while|do|case|catch)\b|\?[^.:]"#),
        call_blocklist: &[
            "if", "for", "while", "switch", "catch", "return", "function", "typeof", "new",
            "await", "super", "constructor", "require",
        ],
        conditional_keywords: re(r#"^\s*\}?\s*(?:if|else|try|catch|switch|case|default)\b"#),
        indent_scoped: false,
    }
}

fn python() -> LanguageRules {
    LanguageRules {
        region_openers: Vec::new(),
        decls: vec![
            rule(
                r#"^\s*(?:async\s+)?def\s+(?P<name>[A-Za-z_]\w*)"#,
                SymbolKind::Function,
                false,
            ),
            rule(
                r#"^\s*class\s+(?P<name>[A-Za-z_]\w*)"#,
                SymbolKind::Class,
                false,
            ),
            rule(
                r#"^(?P<name>[A-Z][A-Z0-9_]*)\s*="#,
                SymbolKind::Constant,
                false,
            ),
            rule(
                r#"^(?P<name>[a-z_]\w*)\s*=\s*[^=]"#,
                SymbolKind::Variable,
                false,
            ),
        ],
        class_like: vec![SymbolKind::Class],
        imports: vec![
            re(r#"^\s*from\s+(?P<source>[\w\.]+)\s+import\s+(?P<clause>.+)"#),
            re(r#"^\s*import\s+(?P<source>[\w\.]+)(?:\s+as\s+(?P<clause>\w+))?"#),
        ],
        export_named: None,
        export_default: None,
        branch_keywords: re(r#"\b(?:if|elif|else|for|while|except|case)\b"#),
        call_blocklist: &[
            "if", "elif", "for", "while", "def", "class", "return", "print", "super", "lambda",
            "match",
        ],
        conditional_keywords: re(r#"^\s*(?:if|elif|else|try|except|match|case)\b"#),
        indent_scoped: true,
    }
}

fn rust() -> LanguageRules {
    LanguageRules {
        region_openers: vec![re(
            r#"^\s*impl(?:<[^>]*>)?\s+(?:[\w:]+(?:<[^>]*>)?\s+for\s+)?(?P<owner>[A-Za-z_]\w*)"#,
        )],
        decls: vec![
            rule(
                r#"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+"[^"]*"\s+)?fn\s+(?P<name>[A-Za-z_]\w*)"#,
                SymbolKind::Function,
                false,
            ),
            rule(
                r#"^\s*(?:pub(?:\([^)]*\))?\s+)?struct\s+(?P<name>[A-Za-z_]\w*)"#,
                SymbolKind::Class,
                false,
            ),
            rule(
                r#"^\s*(?:pub(?:\([^)]*\))?\s+)?trait\s+(?P<name>[A-Za-z_]\w*)"#,
                SymbolKind::Interface,
                false,
            ),
            rule(
                r#"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:enum|type)\s+(?P<name>[A-Za-z_]\w*)"#,
                SymbolKind::Type,
                false,
            ),
            rule(
                r#"^\s*(?:pub(?:\([^)]*\))?\s+)?const\s+(?P<name>[A-Za-z_]\w*)"#,
                SymbolKind::Constant,
                false,
            ),
            rule(
                r#"^\s*(?:pub(?:\([^)]*\))?\s+)?static\s+(?P<name>[A-Za-z_]\w*)"#,
                SymbolKind::Variable,
                false,
            ),
        ],
        class_like: vec![SymbolKind::Class, SymbolKind::Interface],
        imports: vec![re(r#"^\s*(?:pub\s+)?use\s+(?P<source>[^;]+);"#)],
        export_named: Some(re(
            r#"^pub(?:\([^)]*\))?\s+(?:async\s+)?(?:unsafe\s+)?(?:fn|struct|trait|enum|type|const|static)\s+(?P<name>[A-Za-z_]\w*)"#,
        )),
        export_default: None,
        branch_keywords: re(r#"\b(?:if|else|for|while|match)\b|=>"#),
        call_blocklist: &[
            "if", "for", "while", "match", "fn", "return", "Some", "Ok", "Err", "None", "Box",
            "Vec",
        ],
        conditional_keywords: re(r#"^\s*\}?\s*(?:if|else|match)\b"#),
        indent_scoped: false,
    }
}

fn go() -> LanguageRules {
    LanguageRules {
        region_openers: Vec::new(),
        decls: vec![
            rule(
                r#"^func\s+\([^)]*?(?P<owner>[A-Za-z_]\w*)\s*\)\s+(?P<name>[A-Za-z_]\w*)"#,
                SymbolKind::Method,
                false,
            ),
            rule(
                r#"^func\s+(?P<name>[A-Za-z_]\w*)"#,
                SymbolKind::Function,
                false,
            ),
            rule(
                r#"^type\s+(?P<name>[A-Za-z_]\w*)\s+struct\b"#,
                SymbolKind::Class,
                false,
            ),
            rule(
                r#"^type\s+(?P<name>[A-Za-z_]\w*)\s+interface\b"#,
                SymbolKind::Interface,
                false,
            ),
            rule(
                r#"^type\s+(?P<name>[A-Za-z_]\w*)"#,
                SymbolKind::Type,
                false,
            ),
            rule(
                r#"^const\s+(?P<name>[A-Za-z_]\w*)"#,
                SymbolKind::Constant,
                false,
            ),
            rule(
                r#"^var\s+(?P<name>[A-Za-z_]\w*)"#,
                SymbolKind::Variable,
                false,
            ),
        ],
        class_like: vec![SymbolKind::Class, SymbolKind::Interface],
        imports: vec![re(
            r#"^\s*import\s+(?:(?P<clause>[\w\.]+)\s+)?"(?P<source>[^"]+)""#,
        )],
        export_named: None,
        export_default: None,
        branch_keywords: re(r#"\b(?:if|else|for|case|select)\b"#),
        call_blocklist: &[
            "if", "for", "switch", "select", "func", "return", "go", "defer", "make", "len",
            "cap", "append",
        ],
        conditional_keywords: re(r#"^\s*\}?\s*(?:if|else|switch|case|select)\b"#),
        indent_scoped: false,
    }
}

fn java() -> LanguageRules {
    LanguageRules {
        region_openers: Vec::new(),
        decls: vec![
            rule(
                r#"^\s*(?:(?:public|private|protected|abstract|final|static)\s+)*class\s+(?P<name>[A-Za-z_]\w*)"#,
                SymbolKind::Class,
                false,
            ),
            rule(
                r#"^\s*(?:(?:public|private|protected|abstract|static)\s+)*interface\s+(?P<name>[A-Za-z_]\w*)"#,
                SymbolKind::Interface,
                false,
            ),
            rule(
                r#"^\s*(?:(?:public|private|protected|static)\s+)*enum\s+(?P<name>[A-Za-z_]\w*)"#,
                SymbolKind::Type,
                false,
            ),
            rule(
                r#"^\s+(?:(?:public|private|protected|static|final|abstract|synchronized|native)\s+)+[\w<>\[\],\.\s]+?\s+(?P<name>[A-Za-z_]\w*)\s*\([^;]*\)\s*(?:throws\s+[^{]+)?\{"#,
                SymbolKind::Method,
                true,
            ),
        ],
        class_like: vec![SymbolKind::Class, SymbolKind::Interface],
        imports: vec![re(
            r#"^\s*import\s+(?:static\s+)?(?P<source>[\w\.]+(?:\.\*)?)\s*;"#,
        )],
        export_named: None,
        export_default: None,
        branch_keywords: re(r#"\b(?:if|else|for|while|do|case|catch)\b|\?[^.:]"#),
        call_blocklist: &[
            "if", "for", "while", "switch", "catch", "return", "new", "super", "this",
        ],
        conditional_keywords: re(r#"^\s*\}?\s*(?:if|else|try|catch|switch|case|default)\b"#),
        indent_scoped: false,
    }
}

fn markdown() -> LanguageRules {
    LanguageRules {
        region_openers: Vec::new(),
        decls: Vec::new(),
        class_like: Vec::new(),
        imports: Vec::new(),
        export_named: None,
        export_default: None,
        branch_keywords: re(r#"$^"#),
        call_blocklist: &[],
        conditional_keywords: re(r#"$^"#),
        indent_scoped: false,
    }
}
