//! Rust extraction.

use super::Extraction;
use super::helpers::{
    all_nodes, collect_calls, complexity, end_line, node_text, signature_text, start_line,
};
use crate::docstring::doc_above;
use crate::types::{
    CallInfo, Export, ExportKind, Import, ImportType, Language, SymbolKind, SymbolNode, Visibility,
    qualified_name,
};
use tree_sitter::Node;

const BRANCH_KINDS: &[&str] = &[
    "if_expression",
    "else_clause",
    "for_expression",
    "while_expression",
    "match_arm",
];

const CONDITIONAL_KINDS: &[&str] = &[
    "if_expression",
    "else_clause",
    "match_expression",
    "match_arm",
];

pub fn extract(root: Node<'_>, src: &str, path: &str) -> Extraction {
    let lines: Vec<&str> = src.lines().collect();
    let mut out = Extraction::default();

    for node in all_nodes(root) {
        let kind = match node.kind() {
            "function_item" => None, // handled below with owner context
            "struct_item" => Some(SymbolKind::Class),
            "trait_item" => Some(SymbolKind::Interface),
            "enum_item" | "type_item" => Some(SymbolKind::Type),
            "const_item" => Some(SymbolKind::Constant),
            "static_item" => Some(SymbolKind::Variable),
            "use_declaration" => {
                if let Some(import) = use_import(node, src) {
                    out.imports.push(import);
                }
                None
            }
            _ => None,
        };

        if node.kind() == "function_item" {
            if let Some(sym) = function_symbol(node, src, path, &lines) {
                push_export(&sym, node, &mut out.exports);
                out.symbols.push(sym);
            }
        } else if let Some(kind) = kind {
            if let Some(sym) = item_symbol(node, src, path, &lines, kind) {
                push_export(&sym, node, &mut out.exports);
                out.symbols.push(sym);
            }
        }
    }

    out
}

fn name_of(node: Node<'_>, src: &str) -> Option<String> {
    node.child_by_field_name("name")
        .map(|n| node_text(n, src).to_string())
        .filter(|s| !s.is_empty())
}

/// `pub` in any form maps to public; everything else is crate-private.
fn visibility_of(node: Node<'_>, src: &str) -> Visibility {
    let mut cursor = node.walk();
    let public = node
        .children(&mut cursor)
        .any(|c| c.kind() == "visibility_modifier" && node_text(c, src).starts_with("pub"));
    if public {
        Visibility::Public
    } else {
        Visibility::Private
    }
}

fn is_async_fn(node: Node<'_>, src: &str) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .any(|c| c.kind() == "function_modifiers" && node_text(c, src).contains("async"))
}

/// Owner type for methods: enclosing `impl` block's type or enclosing trait.
fn enclosing_owner(node: Node<'_>, src: &str) -> Option<String> {
    let mut cur = node;
    while let Some(parent) = cur.parent() {
        match parent.kind() {
            "impl_item" => {
                return parent.child_by_field_name("type").map(|t| {
                    let raw = node_text(t, src);
                    raw.split('<').next().unwrap_or(raw).trim().to_string()
                });
            }
            "trait_item" => return name_of(parent, src),
            _ => {}
        }
        cur = parent;
    }
    None
}

fn callee_of(call: Node<'_>, src: &str) -> Option<String> {
    let target = call.child_by_field_name("function")?;
    match target.kind() {
        "identifier" => Some(node_text(target, src).to_string()),
        "field_expression" => target
            .child_by_field_name("field")
            .map(|f| node_text(f, src).to_string()),
        "scoped_identifier" => target
            .child_by_field_name("name")
            .map(|n| node_text(n, src).to_string()),
        _ => None,
    }
}

fn body_calls(body: Node<'_>, src: &str) -> Vec<CallInfo> {
    collect_calls(body, src, &["call_expression"], CONDITIONAL_KINDS, callee_of)
}

fn function_symbol(node: Node<'_>, src: &str, path: &str, lines: &[&str]) -> Option<SymbolNode> {
    let name = name_of(node, src)?;
    let owner = enclosing_owner(node, src);
    let kind = if owner.is_some() {
        SymbolKind::Method
    } else {
        SymbolKind::Function
    };
    let body = node.child_by_field_name("body");

    Some(SymbolNode {
        qualified_name: qualified_name(path, owner.as_deref(), &name),
        name,
        kind,
        file: path.to_string(),
        start_line: start_line(node),
        end_line: end_line(node),
        signature: Some(signature_text(node, body, src)),
        docstring: doc_above(lines, start_line(node), Language::Rust),
        return_type: node
            .child_by_field_name("return_type")
            .map(|n| node_text(n, src).to_string()),
        parameters: parameters_of(node, src),
        visibility: visibility_of(node, src),
        is_async: is_async_fn(node, src),
        is_static: false,
        complexity: complexity(node, BRANCH_KINDS),
        calls: body.map(|b| body_calls(b, src)).unwrap_or_default(),
    })
}

fn item_symbol(
    node: Node<'_>,
    src: &str,
    path: &str,
    lines: &[&str],
    kind: SymbolKind,
) -> Option<SymbolNode> {
    let name = name_of(node, src)?;
    Some(SymbolNode {
        qualified_name: qualified_name(path, None, &name),
        name,
        kind,
        file: path.to_string(),
        start_line: start_line(node),
        end_line: end_line(node),
        signature: Some(signature_text(node, node.child_by_field_name("body"), src)),
        docstring: doc_above(lines, start_line(node), Language::Rust),
        return_type: None,
        parameters: Vec::new(),
        visibility: visibility_of(node, src),
        is_async: false,
        is_static: false,
        complexity: complexity(node, BRANCH_KINDS),
        calls: Vec::new(),
    })
}

fn parameters_of(node: Node<'_>, src: &str) -> Vec<String> {
    let Some(params) = node.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let mut cursor = params.walk();
    params
        .named_children(&mut cursor)
        .filter(|c| !matches!(c.kind(), "comment" | "attribute_item"))
        .map(|c| node_text(c, src).to_string())
        .collect()
}

/// Public items at file scope count as named exports.
fn push_export(sym: &SymbolNode, node: Node<'_>, out: &mut Vec<Export>) {
    let at_file_scope = node.parent().map(|p| p.kind() == "source_file").unwrap_or(false);
    if at_file_scope && sym.visibility == Visibility::Public {
        out.push(Export {
            name: sym.name.clone(),
            kind: ExportKind::Named,
            line: sym.start_line,
        });
    }
}

fn use_import(node: Node<'_>, src: &str) -> Option<Import> {
    let arg = node.child_by_field_name("argument")?;
    let source = node_text(arg, src).to_string();
    let line = start_line(node);

    let first = source
        .split("::")
        .next()
        .unwrap_or(&source)
        .trim()
        .to_string();
    let is_external = !matches!(first.as_str(), "crate" | "self" | "super");
    let wildcard = source.ends_with('*');

    // Last path segment (or the list of leaf names for grouped uses).
    let mut imported = Vec::new();
    if let Some(tail) = source.rsplit("::").next() {
        if tail.starts_with('{') {
            for name in tail.trim_matches(|c| c == '{' || c == '}').split(',') {
                let name = name.trim();
                if !name.is_empty() && name != "*" {
                    imported.push(name.to_string());
                }
            }
        } else if tail != "*" {
            imported.push(tail.to_string());
        }
    }

    Some(Import {
        source,
        imported_symbols: imported,
        import_type: if wildcard {
            ImportType::Namespace
        } else {
            ImportType::Named
        },
        is_external,
        package_name: is_external.then_some(first),
        line,
    })
}
