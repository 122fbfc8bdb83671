//! Regex-based fallback parsers.
//!
//! Used when a native grammar fails to load, or as the last resort for a file
//! the native parser rejects. Same contract and output shape as the native
//! path, lower precision. Extraction never panics; on any internal
//! inconsistency the result degrades to fewer symbols, not an error.

mod rules;

use crate::docstring::doc_above;
use crate::native::Extraction;
use crate::types::{
    CallInfo, Export, ExportKind, Import, ImportType, Language, SymbolKind, SymbolNode, Visibility,
    qualified_name,
};
use regex::Regex;
use rules::{LanguageRules, rules_for};
use std::sync::OnceLock;
use tracing::trace;

/// Fallback parser for one language.
pub struct FallbackParser {
    language: Language,
    rules: LanguageRules,
}

impl FallbackParser {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            rules: rules_for(language),
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Extract symbols, imports and exports with best-effort precision.
    pub fn extract(&self, path: &str, content: &str) -> Extraction {
        let lines: Vec<&str> = content.lines().collect();
        let mut out = Extraction::default();
        if lines.is_empty() || self.language == Language::Markdown {
            return out;
        }

        let owners = self.owner_regions(&lines);
        let mut in_block_comment = false;

        for (i, line) in lines.iter().enumerate() {
            let lineno = i + 1;
            if skip_line(line, &mut in_block_comment) {
                continue;
            }

            self.match_imports(line, lineno, &mut out.imports);
            self.match_exports(line, lineno, &mut out.exports);

            if let Some((rule_kind, name, member_only, decl_owner)) = self.match_decl(line) {
                let inside = decl_owner
                    .as_deref()
                    .or_else(|| innermost_owner(&owners, lineno));
                if member_only && inside.is_none() {
                    continue;
                }
                let kind = match (rule_kind, inside.is_some()) {
                    (SymbolKind::Function, true) => SymbolKind::Method,
                    (k, _) => k,
                };
                // Value declarations inside a class/impl body would be locals
                // more often than fields; only take them at top level.
                if matches!(
                    kind,
                    SymbolKind::Variable | SymbolKind::Constant | SymbolKind::Type
                ) && inside.is_some()
                {
                    continue;
                }

                let end = self.symbol_end(&lines, i, kind);
                let sym = self.build_symbol(path, &lines, name, kind, lineno, end, inside);
                out.symbols.push(sym);
            }
        }

        trace!(
            "fallback extract: {} symbols, {} imports ({})",
            out.symbols.len(),
            out.imports.len(),
            path
        );
        out
    }

    /// First matching declaration rule; `owner` comes from patterns that
    /// capture it inline (Go method receivers).
    fn match_decl(&self, line: &str) -> Option<(SymbolKind, String, bool, Option<String>)> {
        for rule in &self.rules.decls {
            if let Some(caps) = rule.regex.captures(line) {
                if let Some(name) = caps.name("name") {
                    let owner = caps.name("owner").map(|m| m.as_str().to_string());
                    return Some((
                        rule.kind,
                        name.as_str().to_string(),
                        rule.member_only,
                        owner,
                    ));
                }
            }
        }
        None
    }

    /// Pre-pass: spans of class-like bodies and owner regions (impl blocks,
    /// receiver methods come from the decl regex directly).
    fn owner_regions(&self, lines: &[&str]) -> Vec<(String, usize, usize)> {
        let mut regions = Vec::new();
        let mut in_block_comment = false;

        for (i, line) in lines.iter().enumerate() {
            if skip_line(line, &mut in_block_comment) {
                continue;
            }
            let mut named: Option<String> = None;
            for rule in &self.rules.decls {
                if !self.rules.class_like.contains(&rule.kind) {
                    continue;
                }
                if let Some(caps) = rule.regex.captures(line) {
                    named = caps.name("name").map(|m| m.as_str().to_string());
                    break;
                }
            }
            if named.is_none() {
                for opener in &self.rules.region_openers {
                    if let Some(caps) = opener.captures(line) {
                        named = caps.name("owner").map(|m| m.as_str().to_string());
                        break;
                    }
                }
            }
            if let Some(name) = named {
                let end = if self.rules.indent_scoped {
                    indent_block_end(lines, i)
                } else {
                    brace_block_end(lines, i)
                };
                regions.push((name, i + 1, end));
            }
        }
        regions
    }

    fn symbol_end(&self, lines: &[&str], start_idx: usize, kind: SymbolKind) -> usize {
        match kind {
            SymbolKind::Variable | SymbolKind::Constant | SymbolKind::Type => start_idx + 1,
            _ if self.rules.indent_scoped => indent_block_end(lines, start_idx),
            _ => brace_block_end(lines, start_idx),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build_symbol(
        &self,
        path: &str,
        lines: &[&str],
        name: String,
        kind: SymbolKind,
        start: usize,
        end: usize,
        owner: Option<&str>,
    ) -> SymbolNode {
        let decl_line = lines[start - 1];
        let body = &lines[start - 1..end.min(lines.len())];
        let is_callable = matches!(kind, SymbolKind::Function | SymbolKind::Method);

        SymbolNode {
            qualified_name: qualified_name(path, owner, &name),
            visibility: self.visibility_for(decl_line, &name),
            is_async: decl_line.contains("async "),
            is_static: decl_line.contains("static "),
            complexity: self.approx_complexity(body),
            calls: if is_callable {
                self.extract_calls(body, start, &name)
            } else {
                Vec::new()
            },
            signature: Some(signature_of(decl_line)),
            docstring: doc_above(lines, start, self.language),
            return_type: None,
            parameters: parameters_of(decl_line),
            name,
            kind,
            file: path.to_string(),
            start_line: start,
            end_line: end.max(start),
        }
    }

    fn visibility_for(&self, decl_line: &str, name: &str) -> Visibility {
        if decl_line.contains("private ") {
            return Visibility::Private;
        }
        if decl_line.contains("protected ") {
            return Visibility::Protected;
        }
        match self.language {
            Language::Rust => {
                if decl_line.trim_start().starts_with("pub") {
                    Visibility::Public
                } else {
                    Visibility::Private
                }
            }
            Language::Go => {
                if name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false) {
                    Visibility::Public
                } else {
                    Visibility::Private
                }
            }
            Language::Python => {
                let dunder = name.starts_with("__") && name.ends_with("__");
                if name.starts_with('_') && !dunder {
                    Visibility::Private
                } else {
                    Visibility::Public
                }
            }
            _ => Visibility::Public,
        }
    }

    /// Keyword-count approximation of cyclomatic complexity. Only the floor
    /// (>= 1) and monotonicity are contractual for the fallback path.
    fn approx_complexity(&self, body: &[&str]) -> u32 {
        let mut count = 1u32;
        for line in body {
            count += self.rules.branch_keywords.find_iter(line).count() as u32;
        }
        count
    }

    fn extract_calls(&self, body: &[&str], start_line: usize, own_name: &str) -> Vec<CallInfo> {
        let call_re = call_regex();
        let mut out = Vec::new();
        let mut cond = ConditionalTracker::new(self.rules.indent_scoped);

        for (offset, line) in body.iter().enumerate() {
            let trimmed = line.trim_start();
            if trimmed.starts_with("//") || trimmed.starts_with('#') || trimmed.starts_with('*') {
                continue;
            }
            let line_conditional =
                cond.observe(line, self.rules.conditional_keywords.is_match(line));

            for caps in call_re.captures_iter(line) {
                let Some(name) = caps.name("callee") else {
                    continue;
                };
                let callee = name.as_str();
                if self.rules.call_blocklist.contains(&callee) {
                    continue;
                }
                // The declaration line matches its own name followed by `(`.
                if offset == 0 && callee == own_name {
                    continue;
                }
                out.push(CallInfo {
                    callee: callee.to_string(),
                    line: start_line + offset,
                    is_conditional: line_conditional,
                });
            }
        }
        out
    }

    fn match_imports(&self, line: &str, lineno: usize, out: &mut Vec<Import>) {
        for re in &self.rules.imports {
            let Some(caps) = re.captures(line) else {
                continue;
            };
            let Some(source) = caps.name("source").map(|m| m.as_str().to_string()) else {
                continue;
            };
            let clause = caps.name("clause").map(|m| m.as_str().trim().to_string());

            let (import_type, imported) = classify_clause(clause.as_deref());
            let internal = source.starts_with('.') || source.starts_with('/');
            let package = (!internal).then(|| {
                if source.starts_with('@') {
                    source.splitn(3, '/').take(2).collect::<Vec<_>>().join("/")
                } else {
                    source
                        .split(['/', ':'])
                        .next()
                        .unwrap_or(&source)
                        .split('.')
                        .next()
                        .unwrap_or(&source)
                        .to_string()
                }
            });

            out.push(Import {
                source,
                imported_symbols: imported,
                import_type,
                is_external: !internal,
                package_name: package,
                line: lineno,
            });
            return;
        }
    }

    fn match_exports(&self, line: &str, lineno: usize, out: &mut Vec<Export>) {
        if let Some(re) = &self.rules.export_default {
            if let Some(caps) = re.captures(line) {
                out.push(Export {
                    name: caps
                        .name("name")
                        .map(|m| m.as_str().to_string())
                        .unwrap_or_else(|| "default".into()),
                    kind: ExportKind::Default,
                    line: lineno,
                });
                return;
            }
        }
        if let Some(re) = &self.rules.export_named {
            if let Some(caps) = re.captures(line) {
                if let Some(name) = caps.name("name") {
                    out.push(Export {
                        name: name.as_str().to_string(),
                        kind: ExportKind::Named,
                        line: lineno,
                    });
                }
            }
        }
    }
}

fn call_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?:[A-Za-z_$][\w$]*\s*\.\s*)*(?P<callee>[A-Za-z_$][\w$]*)\s*\("#)
            .expect("invalid call pattern")
    })
}

/// Innermost class-like region strictly containing `line` (not opening on it).
fn innermost_owner<'r>(regions: &'r [(String, usize, usize)], line: usize) -> Option<&'r str> {
    regions
        .iter()
        .filter(|(_, start, end)| *start < line && line <= *end)
        .min_by_key(|(_, start, end)| end - start)
        .map(|(name, _, _)| name.as_str())
}

/// Skip comment-only lines and track `/* … */` block state.
fn skip_line(line: &str, in_block: &mut bool) -> bool {
    let t = line.trim_start();
    if *in_block {
        if t.contains("*/") {
            *in_block = false;
        }
        return true;
    }
    if t.starts_with("/*") {
        *in_block = !t.contains("*/");
        return true;
    }
    t.starts_with("//") || t.starts_with('#') && !t.starts_with("#[")
}

/// End line (1-based, inclusive) of a brace-delimited block starting at
/// `start_idx`. Falls back to the start line when no block opens nearby.
fn brace_block_end(lines: &[&str], start_idx: usize) -> usize {
    let mut depth = 0i32;
    let mut opened = false;

    for (i, line) in lines.iter().enumerate().skip(start_idx) {
        for c in line.chars() {
            match c {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        if opened && depth <= 0 {
            return i + 1;
        }
        // Declaration never opened a block within a couple of lines.
        if !opened && i > start_idx + 2 {
            break;
        }
    }
    if opened { lines.len() } else { start_idx + 1 }
}

/// End line of an indentation-scoped block (Python).
fn indent_block_end(lines: &[&str], start_idx: usize) -> usize {
    let base = indent_of(lines[start_idx]);
    let mut end = start_idx + 1;
    for (i, line) in lines.iter().enumerate().skip(start_idx + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if indent_of(line) <= base {
            break;
        }
        end = i + 1;
    }
    end
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn signature_of(decl_line: &str) -> String {
    decl_line
        .trim()
        .trim_end_matches('{')
        .trim_end_matches(':')
        .trim()
        .to_string()
}

fn parameters_of(decl_line: &str) -> Vec<String> {
    let Some(open) = decl_line.find('(') else {
        return Vec::new();
    };
    let Some(close) = decl_line[open..].find(')') else {
        return Vec::new();
    };
    decl_line[open + 1..open + close]
        .split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn classify_clause(clause: Option<&str>) -> (ImportType, Vec<String>) {
    let Some(clause) = clause else {
        return (ImportType::SideEffect, Vec::new());
    };
    let clause = clause.trim();
    if clause.is_empty() {
        return (ImportType::SideEffect, Vec::new());
    }
    if clause.starts_with("* as ") {
        return (
            ImportType::Namespace,
            vec![clause.trim_start_matches("* as ").trim().to_string()],
        );
    }
    if clause.starts_with('{') {
        let names = clause
            .trim_matches(|c| c == '{' || c == '}')
            .split(',')
            .map(|n| n.split(" as ").next().unwrap_or(n).trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        return (ImportType::Named, names);
    }
    if clause == "*" {
        return (ImportType::Namespace, vec!["*".into()]);
    }
    (ImportType::Default, vec![clause.to_string()])
}

/// Tracks whether the current position is inside a conditional block.
struct ConditionalTracker {
    indent_scoped: bool,
    /// Brace languages: stack of open braces, flagged conditional or not.
    brace_stack: Vec<bool>,
    /// Pending flag for the next `{` when the keyword line opens later.
    pending: bool,
    /// Python: indent levels that opened conditional suites.
    indent_stack: Vec<usize>,
}

impl ConditionalTracker {
    fn new(indent_scoped: bool) -> Self {
        Self {
            indent_scoped,
            brace_stack: Vec::new(),
            pending: false,
            indent_stack: Vec::new(),
        }
    }

    /// Feed one line; returns whether calls on this line count as conditional.
    fn observe(&mut self, line: &str, opens_conditional: bool) -> bool {
        if self.indent_scoped {
            let indent = indent_of(line);
            if !line.trim().is_empty() {
                self.indent_stack.retain(|lvl| *lvl < indent);
            }
            let inside = !self.indent_stack.is_empty();
            if opens_conditional {
                self.indent_stack.push(indent);
            }
            return inside || opens_conditional;
        }

        let mut conditional_here =
            opens_conditional || self.brace_stack.iter().any(|c| *c);
        if opens_conditional {
            self.pending = true;
        }
        for c in line.chars() {
            match c {
                '{' => {
                    self.brace_stack.push(self.pending);
                    self.pending = false;
                }
                '}' => {
                    self.brace_stack.pop();
                }
                _ => {}
            }
        }
        if opens_conditional {
            conditional_here = true;
        }
        conditional_here
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typescript_function_and_class_are_found() {
        let parser = FallbackParser::new(Language::Typescript);
        let src = "export function add(a, b) {\n  return a + b;\n}\n\nexport class Calc {\n  total() {\n    return this.sum;\n  }\n}\n";
        let out = parser.extract("src/calc.ts", src);

        let names: Vec<&str> = out.symbols.iter().map(|s| s.name.as_str()).collect();
        assert!(names.contains(&"add"));
        assert!(names.contains(&"Calc"));
        let method = out.symbols.iter().find(|s| s.name == "total").unwrap();
        assert_eq!(method.kind, SymbolKind::Method);
        assert_eq!(method.qualified_name, "src/calc.ts:Calc.total");
    }

    #[test]
    fn malformed_input_never_panics() {
        let parser = FallbackParser::new(Language::Typescript);
        for src in ["{{{{", "function", "class {", "\u{0}\u{1}", "import '"] {
            let out = parser.extract("broken.ts", src);
            assert!(out.symbols.len() < 10);
        }
    }

    #[test]
    fn complexity_has_floor_and_grows_with_branches() {
        let parser = FallbackParser::new(Language::Typescript);
        let flat = parser.extract("a.ts", "function f() {\n  return 1;\n}\n");
        let branchy =
            parser.extract("a.ts", "function f(x) {\n  if (x) {\n    return 1;\n  }\n  return 2;\n}\n");
        assert!(flat.symbols[0].complexity >= 1);
        assert!(branchy.symbols[0].complexity > flat.symbols[0].complexity);
    }

    #[test]
    fn python_methods_get_class_owner() {
        let parser = FallbackParser::new(Language::Python);
        let src = "class Store:\n    def put(self, k, v):\n        self.data[k] = v\n\ndef main():\n    pass\n";
        let out = parser.extract("store.py", src);

        let put = out.symbols.iter().find(|s| s.name == "put").unwrap();
        assert_eq!(put.kind, SymbolKind::Method);
        assert_eq!(put.qualified_name, "store.py:Store.put");
        let main = out.symbols.iter().find(|s| s.name == "main").unwrap();
        assert_eq!(main.kind, SymbolKind::Function);
    }

    #[test]
    fn conditional_calls_are_flagged() {
        let parser = FallbackParser::new(Language::Typescript);
        let src = "function f(x) {\n  if (x) {\n    handle(x);\n  }\n  finish();\n}\n";
        let out = parser.extract("f.ts", src);
        let calls = &out.symbols[0].calls;
        let handle = calls.iter().find(|c| c.callee == "handle").unwrap();
        let finish = calls.iter().find(|c| c.callee == "finish").unwrap();
        assert!(handle.is_conditional);
        assert!(!finish.is_conditional);
    }

    #[test]
    fn imports_are_classified() {
        let parser = FallbackParser::new(Language::Typescript);
        let src = "import fs from 'fs';\nimport { a, b } from './util';\nimport * as path from 'path';\nimport './side';\n";
        let out = parser.extract("i.ts", src);
        assert_eq!(out.imports.len(), 4);
        assert_eq!(out.imports[0].import_type, ImportType::Default);
        assert_eq!(out.imports[1].import_type, ImportType::Named);
        assert!(!out.imports[1].is_external);
        assert_eq!(out.imports[1].imported_symbols, vec!["a", "b"]);
        assert_eq!(out.imports[2].import_type, ImportType::Namespace);
        assert_eq!(out.imports[3].import_type, ImportType::SideEffect);
    }
}
