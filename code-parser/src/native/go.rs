//! Go extraction.

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

// `else` has no clause node in the Go grammar; the anonymous token stands in.
const BRANCH_KINDS: &[&str] = &[
    "if_statement",
    "else",
    "for_statement",
    "expression_case",
    "type_case",
    "communication_case",
];

const CONDITIONAL_KINDS: &[&str] = &[
    "if_statement",
    "expression_switch_statement",
    "type_switch_statement",
    "select_statement",
    "expression_case",
    "type_case",
    "communication_case",
    "default_case",
];

pub fn extract(root: Node<'_>, src: &str, path: &str) -> Extraction {
    let lines: Vec<&str> = src.lines().collect();
    let mut out = Extraction::default();

    for node in all_nodes(root) {
        match node.kind() {
            "function_declaration" => {
                if let Some(sym) = callable_symbol(node, src, path, &lines, None) {
                    push_export(&sym, &mut out.exports);
                    out.symbols.push(sym);
                }
            }
            "method_declaration" => {
                let owner = receiver_type(node, src);
                if let Some(sym) = callable_symbol(node, src, path, &lines, owner) {
                    push_export(&sym, &mut out.exports);
                    out.symbols.push(sym);
                }
            }
            "type_spec" => {
                if let Some(sym) = type_symbol(node, src, path, &lines) {
                    push_export(&sym, &mut out.exports);
                    out.symbols.push(sym);
                }
            }
            "const_spec" | "var_spec" => {
                if top_level_spec(node) {
                    value_symbols(node, src, path, &lines, &mut out);
                }
            }
            "import_spec" => {
                if let Some(import) = import_spec(node, src) {
                    out.imports.push(import);
                }
            }
            _ => {}
        }
    }

    out
}

fn exported_name(name: &str) -> bool {
    name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
}

fn visibility_for(name: &str) -> Visibility {
    if exported_name(name) {
        Visibility::Public
    } else {
        Visibility::Private
    }
}

fn push_export(sym: &SymbolNode, out: &mut Vec<Export>) {
    if sym.visibility == Visibility::Public {
        out.push(Export {
            name: sym.name.clone(),
            kind: ExportKind::Named,
            line: sym.start_line,
        });
    }
}

/// Receiver type name for methods: `func (s *Server) Run()` → `Server`.
fn receiver_type(node: Node<'_>, src: &str) -> Option<String> {
    let receiver = node.child_by_field_name("receiver")?;
    for n in all_nodes(receiver) {
        if n.kind() == "type_identifier" {
            return Some(node_text(n, src).to_string());
        }
    }
    None
}

fn callee_of(call: Node<'_>, src: &str) -> Option<String> {
    let target = call.child_by_field_name("function")?;
    match target.kind() {
        "identifier" => Some(node_text(target, src).to_string()),
        "selector_expression" => target
            .child_by_field_name("field")
            .map(|f| node_text(f, src).to_string()),
        _ => None,
    }
}

fn body_calls(body: Node<'_>, src: &str) -> Vec<CallInfo> {
    collect_calls(body, src, &["call_expression"], CONDITIONAL_KINDS, callee_of)
}

fn callable_symbol(
    node: Node<'_>,
    src: &str,
    path: &str,
    lines: &[&str],
    owner: Option<String>,
) -> Option<SymbolNode> {
    let name = node
        .child_by_field_name("name")
        .map(|n| node_text(n, src).to_string())?;
    let body = node.child_by_field_name("body");
    let kind = if owner.is_some() {
        SymbolKind::Method
    } else {
        SymbolKind::Function
    };

    Some(SymbolNode {
        qualified_name: qualified_name(path, owner.as_deref(), &name),
        visibility: visibility_for(&name),
        name,
        kind,
        file: path.to_string(),
        start_line: start_line(node),
        end_line: end_line(node),
        signature: Some(signature_text(node, body, src)),
        docstring: doc_above(lines, start_line(node), Language::Go),
        return_type: node
            .child_by_field_name("result")
            .map(|n| node_text(n, src).to_string()),
        parameters: parameters_of(node, src),
        is_async: false,
        is_static: false,
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

fn type_symbol(node: Node<'_>, src: &str, path: &str, lines: &[&str]) -> Option<SymbolNode> {
    let name = node
        .child_by_field_name("name")
        .map(|n| node_text(n, src).to_string())?;
    let kind = match node.child_by_field_name("type").map(|t| t.kind()) {
        Some("struct_type") => SymbolKind::Class,
        Some("interface_type") => SymbolKind::Interface,
        _ => SymbolKind::Type,
    };
    // Anchor the span at the enclosing `type` declaration when present.
    let decl = node
        .parent()
        .filter(|p| p.kind() == "type_declaration")
        .unwrap_or(node);

    Some(SymbolNode {
        qualified_name: qualified_name(path, None, &name),
        visibility: visibility_for(&name),
        name,
        kind,
        file: path.to_string(),
        start_line: start_line(decl),
        end_line: end_line(decl),
        signature: Some(signature_text(node, node.child_by_field_name("type"), src)),
        docstring: doc_above(lines, start_line(decl), Language::Go),
        return_type: None,
        parameters: Vec::new(),
        is_async: false,
        is_static: false,
        complexity: 1,
        calls: Vec::new(),
    })
}

fn top_level_spec(node: Node<'_>) -> bool {
    node.parent()
        .and_then(|decl| decl.parent())
        .map(|p| p.kind() == "source_file")
        .unwrap_or(false)
}

fn value_symbols(node: Node<'_>, src: &str, path: &str, lines: &[&str], out: &mut Extraction) {
    let kind = if node.kind() == "const_spec" {
        SymbolKind::Constant
    } else {
        SymbolKind::Variable
    };
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() != "identifier" {
            continue;
        }
        let name = node_text(child, src).to_string();
        if name == "_" {
            continue;
        }
        let sym = SymbolNode {
            qualified_name: qualified_name(path, None, &name),
            visibility: visibility_for(&name),
            name,
            kind,
            file: path.to_string(),
            start_line: start_line(node),
            end_line: end_line(node),
            signature: Some(signature_text(node, None, src)),
            docstring: doc_above(lines, start_line(node), Language::Go),
            return_type: None,
            parameters: Vec::new(),
            is_async: false,
            is_static: false,
            complexity: 1,
            calls: Vec::new(),
        };
        push_export(&sym, &mut out.exports);
        out.symbols.push(sym);
    }
}

fn import_spec(node: Node<'_>, src: &str) -> Option<Import> {
    let source = node
        .child_by_field_name("path")
        .map(|p| node_text(p, src).trim_matches('"').to_string())?;
    let alias = node
        .child_by_field_name("name")
        .map(|n| node_text(n, src).to_string());
    let package = source.rsplit('/').next().unwrap_or(&source).to_string();

    Some(Import {
        line: start_line(node),
        imported_symbols: alias.clone().into_iter().collect(),
        import_type: ImportType::Namespace,
        // Go import paths always name packages, never repo-relative files.
        is_external: true,
        package_name: Some(alias.unwrap_or(package)),
        source,
    })
}
