//! Java extraction.

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

// `else` has no clause node in the Java grammar; the anonymous token stands in.
const BRANCH_KINDS: &[&str] = &[
    "if_statement",
    "else",
    "for_statement",
    "enhanced_for_statement",
    "while_statement",
    "do_statement",
    "switch_label",
    "catch_clause",
    "ternary_expression",
];

const CONDITIONAL_KINDS: &[&str] = &[
    "if_statement",
    "try_statement",
    "try_with_resources_statement",
    "catch_clause",
    "switch_expression",
    "switch_block_statement_group",
    "ternary_expression",
];

const CALL_KINDS: &[&str] = &["method_invocation", "object_creation_expression"];

pub fn extract(root: Node<'_>, src: &str, path: &str) -> Extraction {
    let lines: Vec<&str> = src.lines().collect();
    let mut out = Extraction::default();

    for node in all_nodes(root) {
        match node.kind() {
            "class_declaration" | "record_declaration" => {
                if let Some(sym) = type_symbol(node, src, path, &lines, SymbolKind::Class) {
                    push_export(&sym, node, &mut out.exports);
                    out.symbols.push(sym);
                }
            }
            "interface_declaration" => {
                if let Some(sym) = type_symbol(node, src, path, &lines, SymbolKind::Interface) {
                    push_export(&sym, node, &mut out.exports);
                    out.symbols.push(sym);
                }
            }
            "enum_declaration" => {
                if let Some(sym) = type_symbol(node, src, path, &lines, SymbolKind::Type) {
                    push_export(&sym, node, &mut out.exports);
                    out.symbols.push(sym);
                }
            }
            "method_declaration" | "constructor_declaration" => {
                if let Some(sym) = method_symbol(node, src, path, &lines) {
                    out.symbols.push(sym);
                }
            }
            "field_declaration" => field_symbols(node, src, path, &lines, &mut out.symbols),
            "import_declaration" => {
                if let Some(import) = import_directive(node, src) {
                    out.imports.push(import);
                }
            }
            _ => {}
        }
    }

    out
}

fn name_of(node: Node<'_>, src: &str) -> Option<String> {
    node.child_by_field_name("name")
        .map(|n| node_text(n, src).to_string())
        .filter(|s| !s.is_empty())
}

fn modifiers_text<'s>(node: Node<'_>, src: &'s str) -> &'s str {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "modifiers" {
            return node_text(child, src);
        }
    }
    ""
}

fn visibility_of(node: Node<'_>, src: &str) -> Visibility {
    let mods = modifiers_text(node, src);
    if mods.contains("private") {
        Visibility::Private
    } else if mods.contains("protected") {
        Visibility::Protected
    } else {
        Visibility::Public
    }
}

fn enclosing_type(node: Node<'_>, src: &str) -> Option<String> {
    let mut cur = node;
    while let Some(parent) = cur.parent() {
        if matches!(
            parent.kind(),
            "class_declaration" | "interface_declaration" | "enum_declaration"
                | "record_declaration"
        ) {
            return name_of(parent, src);
        }
        cur = parent;
    }
    None
}

fn callee_of(call: Node<'_>, src: &str) -> Option<String> {
    match call.kind() {
        "method_invocation" => call
            .child_by_field_name("name")
            .map(|n| node_text(n, src).to_string()),
        "object_creation_expression" => call.child_by_field_name("type").map(|t| {
            let raw = node_text(t, src);
            raw.split('<').next().unwrap_or(raw).trim().to_string()
        }),
        _ => None,
    }
}

fn body_calls(body: Node<'_>, src: &str) -> Vec<CallInfo> {
    collect_calls(body, src, CALL_KINDS, CONDITIONAL_KINDS, callee_of)
}

fn type_symbol(
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
        docstring: doc_above(lines, start_line(node), Language::Java),
        return_type: None,
        parameters: Vec::new(),
        visibility: visibility_of(node, src),
        is_async: false,
        is_static: modifiers_text(node, src).contains("static"),
        complexity: complexity(node, BRANCH_KINDS),
        calls: Vec::new(),
    })
}

fn method_symbol(node: Node<'_>, src: &str, path: &str, lines: &[&str]) -> Option<SymbolNode> {
    let name = name_of(node, src)?;
    let owner = enclosing_type(node, src);
    let body = node.child_by_field_name("body");

    Some(SymbolNode {
        qualified_name: qualified_name(path, owner.as_deref(), &name),
        name,
        kind: SymbolKind::Method,
        file: path.to_string(),
        start_line: start_line(node),
        end_line: end_line(node),
        signature: Some(signature_text(node, body, src)),
        docstring: doc_above(lines, start_line(node), Language::Java),
        return_type: node
            .child_by_field_name("type")
            .map(|n| node_text(n, src).to_string()),
        parameters: parameters_of(node, src),
        visibility: visibility_of(node, src),
        is_async: false,
        is_static: modifiers_text(node, src).contains("static"),
        complexity: complexity(node, BRANCH_KINDS),
        calls: body.map(|b| body_calls(b, src)).unwrap_or_default(),
    })
}

fn parameters_of(node: Node<'_>, src: &str) -> Vec<String> {
    let Some(params) = node.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let mut cursor = params.walk();
    params
        .named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .map(|c| node_text(c, src).to_string())
        .collect()
}

/// Class fields: `static final` fields count as constants.
fn field_symbols(node: Node<'_>, src: &str, path: &str, lines: &[&str], out: &mut Vec<SymbolNode>) {
    let mods = modifiers_text(node, src);
    let kind = if mods.contains("static") && mods.contains("final") {
        SymbolKind::Constant
    } else {
        SymbolKind::Variable
    };
    let owner = enclosing_type(node, src);

    for n in all_nodes(node) {
        if n.kind() != "variable_declarator" {
            continue;
        }
        let Some(name) = name_of(n, src) else { continue };
        out.push(SymbolNode {
            qualified_name: qualified_name(path, owner.as_deref(), &name),
            name,
            kind,
            file: path.to_string(),
            start_line: start_line(node),
            end_line: end_line(node),
            signature: Some(signature_text(node, None, src)),
            docstring: doc_above(lines, start_line(node), Language::Java),
            return_type: None,
            parameters: Vec::new(),
            visibility: visibility_of(node, src),
            is_async: false,
            is_static: mods.contains("static"),
            complexity: 1,
            calls: Vec::new(),
        });
    }
}

fn push_export(sym: &SymbolNode, node: Node<'_>, out: &mut Vec<Export>) {
    let at_file_scope = node.parent().map(|p| p.kind() == "program").unwrap_or(false);
    if at_file_scope && sym.visibility == Visibility::Public {
        out.push(Export {
            name: sym.name.clone(),
            kind: ExportKind::Named,
            line: sym.start_line,
        });
    }
}

fn import_directive(node: Node<'_>, src: &str) -> Option<Import> {
    let mut cursor = node.walk();
    let target = node
        .named_children(&mut cursor)
        .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"))?;
    let source = node_text(target, src).to_string();
    let wildcard = node_text(node, src).contains(".*");
    let leaf = source.rsplit('.').next().unwrap_or(&source).to_string();
    let package = source
        .split('.')
        .take(2)
        .collect::<Vec<_>>()
        .join(".");

    Some(Import {
        line: start_line(node),
        imported_symbols: if wildcard { vec!["*".into()] } else { vec![leaf] },
        import_type: if wildcard {
            ImportType::Namespace
        } else {
            ImportType::Named
        },
        is_external: true,
        package_name: Some(package),
        source,
    })
}
