//! Python extraction.

use super::Extraction;
use super::helpers::{
    all_nodes, collect_calls, complexity, end_line, has_keyword_child, node_text, signature_text,
    start_line,
};
use crate::docstring::doc_above;
use crate::types::{
    CallInfo, Import, ImportType, Language, SymbolKind, SymbolNode, Visibility, qualified_name,
};
use tree_sitter::Node;

const BRANCH_KINDS: &[&str] = &[
    "if_statement",
    "elif_clause",
    "else_clause",
    "for_statement",
    "while_statement",
    "except_clause",
    "conditional_expression",
    "case_clause",
];

const CONDITIONAL_KINDS: &[&str] = &[
    "if_statement",
    "elif_clause",
    "else_clause",
    "try_statement",
    "except_clause",
    "match_statement",
    "case_clause",
    "conditional_expression",
];

pub fn extract(root: Node<'_>, src: &str, path: &str) -> Extraction {
    let lines: Vec<&str> = src.lines().collect();
    let mut out = Extraction::default();

    for node in all_nodes(root) {
        match node.kind() {
            "function_definition" => {
                if let Some(sym) = function_symbol(node, src, path, &lines) {
                    out.symbols.push(sym);
                }
            }
            "class_definition" => {
                if let Some(sym) = class_symbol(node, src, path, &lines) {
                    out.symbols.push(sym);
                }
            }
            "assignment" => {
                if let Some(sym) = module_assignment_symbol(node, src, path, &lines) {
                    out.symbols.push(sym);
                }
            }
            "import_statement" => plain_imports(node, src, &mut out.imports),
            "import_from_statement" => {
                if let Some(import) = from_import(node, src) {
                    out.imports.push(import);
                }
            }
            _ => {}
        }
    }

    // Python has no export statements; the exports list stays empty.
    out
}

fn name_of(node: Node<'_>, src: &str) -> Option<String> {
    node.child_by_field_name("name")
        .map(|n| node_text(n, src).to_string())
        .filter(|s| !s.is_empty())
}

fn visibility_for(name: &str) -> Visibility {
    let dunder = name.starts_with("__") && name.ends_with("__");
    if name.starts_with('_') && !dunder {
        Visibility::Private
    } else {
        Visibility::Public
    }
}

fn enclosing_class(node: Node<'_>, src: &str) -> Option<String> {
    let mut cur = node;
    while let Some(parent) = cur.parent() {
        if parent.kind() == "class_definition" {
            return name_of(parent, src);
        }
        cur = parent;
    }
    None
}

/// First statement of the body, when it is a bare string literal.
fn body_docstring(body: Node<'_>, src: &str) -> Option<String> {
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = first.named_child(0)?;
    (expr.kind() == "string").then(|| node_text(expr, src).to_string())
}

fn callee_of(call: Node<'_>, src: &str) -> Option<String> {
    let target = call.child_by_field_name("function")?;
    match target.kind() {
        "identifier" => Some(node_text(target, src).to_string()),
        "attribute" => target
            .child_by_field_name("attribute")
            .map(|a| node_text(a, src).to_string()),
        _ => None,
    }
}

fn body_calls(body: Node<'_>, src: &str) -> Vec<CallInfo> {
    collect_calls(body, src, &["call"], CONDITIONAL_KINDS, callee_of)
}

fn function_symbol(node: Node<'_>, src: &str, path: &str, lines: &[&str]) -> Option<SymbolNode> {
    let name = name_of(node, src)?;
    let owner = enclosing_class(node, src);
    let kind = if owner.is_some() {
        SymbolKind::Method
    } else {
        SymbolKind::Function
    };
    let body = node.child_by_field_name("body");
    let docstring = doc_above(lines, start_line(node), Language::Python)
        .or_else(|| body.and_then(|b| body_docstring(b, src)));
    let is_static = has_decorator(node, src, "staticmethod");

    Some(SymbolNode {
        qualified_name: qualified_name(path, owner.as_deref(), &name),
        visibility: visibility_for(&name),
        name,
        kind,
        file: path.to_string(),
        start_line: start_line(node),
        end_line: end_line(node),
        signature: Some(signature_text(node, body, src)),
        docstring,
        return_type: node
            .child_by_field_name("return_type")
            .map(|n| node_text(n, src).to_string()),
        parameters: parameters_of(node, src),
        is_async: has_keyword_child(node, "async"),
        is_static,
        complexity: complexity(node, BRANCH_KINDS),
        calls: body.map(|b| body_calls(b, src)).unwrap_or_default(),
    })
}

fn class_symbol(node: Node<'_>, src: &str, path: &str, lines: &[&str]) -> Option<SymbolNode> {
    let name = name_of(node, src)?;
    let body = node.child_by_field_name("body");
    let docstring = doc_above(lines, start_line(node), Language::Python)
        .or_else(|| body.and_then(|b| body_docstring(b, src)));

    Some(SymbolNode {
        qualified_name: qualified_name(path, None, &name),
        visibility: visibility_for(&name),
        name,
        kind: SymbolKind::Class,
        file: path.to_string(),
        start_line: start_line(node),
        end_line: end_line(node),
        signature: Some(signature_text(node, body, src)),
        docstring,
        return_type: None,
        parameters: Vec::new(),
        is_async: false,
        is_static: false,
        complexity: complexity(node, BRANCH_KINDS),
        calls: Vec::new(),
    })
}

/// Module-level `NAME = value` assignments: constants when ALL_CAPS.
fn module_assignment_symbol(
    node: Node<'_>,
    src: &str,
    path: &str,
    lines: &[&str],
) -> Option<SymbolNode> {
    let stmt = node.parent().filter(|p| p.kind() == "expression_statement")?;
    stmt.parent().filter(|p| p.kind() == "module")?;

    let left = node.child_by_field_name("left")?;
    if left.kind() != "identifier" {
        return None;
    }
    let name = node_text(left, src).to_string();
    let all_caps = name
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
    let kind = if all_caps {
        SymbolKind::Constant
    } else {
        SymbolKind::Variable
    };

    Some(SymbolNode {
        qualified_name: qualified_name(path, None, &name),
        visibility: visibility_for(&name),
        name,
        kind,
        file: path.to_string(),
        start_line: start_line(node),
        end_line: end_line(node),
        signature: Some(signature_text(node, None, src)),
        docstring: doc_above(lines, start_line(node), Language::Python),
        return_type: None,
        parameters: Vec::new(),
        is_async: false,
        is_static: false,
        complexity: 1,
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
        .filter(|c| c.kind() != "comment")
        .map(|c| node_text(c, src).to_string())
        .collect()
}

fn has_decorator(node: Node<'_>, src: &str, decorator: &str) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    if parent.kind() != "decorated_definition" {
        return false;
    }
    let mut cursor = parent.walk();
    parent.named_children(&mut cursor).any(|c| {
        c.kind() == "decorator" && node_text(c, src).trim_start_matches('@').trim() == decorator
    })
}

fn import_meta(module: &str) -> (bool, Option<String>) {
    if module.starts_with('.') {
        return (false, None);
    }
    let package = module.split('.').next().unwrap_or(module).to_string();
    (true, Some(package))
}

/// `import a.b, c as d`: one Import per dotted name.
fn plain_imports(node: Node<'_>, src: &str, out: &mut Vec<Import>) {
    let line = start_line(node);
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        let (module, alias) = match child.kind() {
            "dotted_name" => (node_text(child, src).to_string(), None),
            "aliased_import" => {
                let module = child
                    .child_by_field_name("name")
                    .map(|n| node_text(n, src).to_string());
                let alias = child
                    .child_by_field_name("alias")
                    .map(|n| node_text(n, src).to_string());
                match module {
                    Some(m) => (m, alias),
                    None => continue,
                }
            }
            _ => continue,
        };
        let (is_external, package_name) = import_meta(&module);
        out.push(Import {
            source: module,
            imported_symbols: alias.into_iter().collect(),
            import_type: ImportType::Namespace,
            is_external,
            package_name,
            line,
        });
    }
}

fn from_import(node: Node<'_>, src: &str) -> Option<Import> {
    let module = node
        .child_by_field_name("module_name")
        .map(|n| node_text(n, src).to_string())?;
    let line = start_line(node);
    let mut imported = Vec::new();
    let mut import_type = ImportType::Named;

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "wildcard_import" => {
                import_type = ImportType::Namespace;
                imported.push("*".to_string());
            }
            "dotted_name" if node_text(child, src) != module => {
                imported.push(node_text(child, src).to_string());
            }
            "aliased_import" => {
                if let Some(name) = child.child_by_field_name("name") {
                    imported.push(node_text(name, src).to_string());
                }
            }
            _ => {}
        }
    }

    let (is_external, package_name) = import_meta(&module);
    Some(Import {
        source: module,
        imported_symbols: imported,
        import_type,
        is_external,
        package_name,
        line,
    })
}
