//! TypeScript/JavaScript extraction (shared grammar family).

use super::Extraction;
use super::helpers::{
    all_nodes, collect_calls, complexity, end_line, has_keyword_child, node_text, signature_text,
    start_line,
};
use crate::docstring::doc_above;
use crate::types::{
    CallInfo, Export, ExportKind, Import, ImportType, Language, SymbolKind, SymbolNode, Visibility,
    qualified_name,
};
use tree_sitter::Node;

const BRANCH_KINDS: &[&str] = &[
    "if_statement",
    "else_clause",
    "for_statement",
    "for_in_statement",
    "while_statement",
    "do_statement",
    "switch_case",
    "catch_clause",
    "ternary_expression",
];

const CONDITIONAL_KINDS: &[&str] = &[
    "if_statement",
    "else_clause",
    "try_statement",
    "catch_clause",
    "switch_statement",
    "switch_case",
    "switch_default",
    "ternary_expression",
];

const CALL_KINDS: &[&str] = &["call_expression", "new_expression"];

pub fn extract(root: Node<'_>, src: &str, path: &str) -> Extraction {
    let lines: Vec<&str> = src.lines().collect();
    let mut out = Extraction::default();

    for node in all_nodes(root) {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => {
                if let Some(sym) = function_symbol(node, src, path, &lines, SymbolKind::Function) {
                    out.symbols.push(sym);
                }
            }
            "class_declaration" | "abstract_class_declaration" => {
                if let Some(sym) = named_symbol(node, src, path, &lines, SymbolKind::Class) {
                    out.symbols.push(sym);
                }
            }
            "interface_declaration" => {
                if let Some(sym) = named_symbol(node, src, path, &lines, SymbolKind::Interface) {
                    out.symbols.push(sym);
                }
            }
            "type_alias_declaration" | "enum_declaration" => {
                if let Some(sym) = named_symbol(node, src, path, &lines, SymbolKind::Type) {
                    out.symbols.push(sym);
                }
            }
            "method_definition" => {
                if let Some(sym) = method_symbol(node, src, path, &lines) {
                    out.symbols.push(sym);
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                if top_level(node) {
                    declarator_symbols(node, src, path, &lines, &mut out.symbols);
                }
            }
            "import_statement" => {
                if let Some(import) = import_directive(node, src) {
                    out.imports.push(import);
                }
            }
            "export_statement" => export_directives(node, src, &mut out.exports),
            _ => {}
        }
    }

    out
}

fn top_level(node: Node<'_>) -> bool {
    matches!(
        node.parent().map(|p| p.kind()),
        Some("program") | Some("export_statement")
    )
}

fn name_of(node: Node<'_>, src: &str) -> Option<String> {
    node.child_by_field_name("name")
        .map(|n| node_text(n, src).to_string())
        .filter(|s| !s.is_empty())
}

fn visibility_of(node: Node<'_>, src: &str) -> Visibility {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "accessibility_modifier" {
            return match node_text(child, src) {
                "private" => Visibility::Private,
                "protected" => Visibility::Protected,
                _ => Visibility::Public,
            };
        }
    }
    Visibility::Public
}

fn return_type_of(node: Node<'_>, src: &str) -> Option<String> {
    node.child_by_field_name("return_type")
        .map(|n| node_text(n, src).trim_start_matches(':').trim().to_string())
        .filter(|s| !s.is_empty())
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

fn enclosing_class(node: Node<'_>, src: &str) -> Option<String> {
    let mut cur = node;
    while let Some(parent) = cur.parent() {
        if matches!(
            parent.kind(),
            "class_declaration" | "abstract_class_declaration"
        ) {
            return name_of(parent, src);
        }
        cur = parent;
    }
    None
}

fn callee_of(call: Node<'_>, src: &str) -> Option<String> {
    let target = call
        .child_by_field_name("function")
        .or_else(|| call.child_by_field_name("constructor"))?;
    match target.kind() {
        "identifier" => Some(node_text(target, src).to_string()),
        "member_expression" => target
            .child_by_field_name("property")
            .map(|p| node_text(p, src).to_string()),
        _ => None,
    }
}

fn body_calls(body: Node<'_>, src: &str) -> Vec<CallInfo> {
    collect_calls(body, src, CALL_KINDS, CONDITIONAL_KINDS, callee_of)
}

fn function_symbol(
    node: Node<'_>,
    src: &str,
    path: &str,
    lines: &[&str],
    kind: SymbolKind,
) -> Option<SymbolNode> {
    let name = name_of(node, src)?;
    let body = node.child_by_field_name("body");
    Some(SymbolNode {
        qualified_name: qualified_name(path, None, &name),
        name,
        kind,
        file: path.to_string(),
        start_line: start_line(node),
        end_line: end_line(node),
        signature: Some(signature_text(node, body, src)),
        docstring: doc_above(lines, start_line(node), Language::Typescript),
        return_type: return_type_of(node, src),
        parameters: parameters_of(node, src),
        visibility: Visibility::Public,
        is_async: has_keyword_child(node, "async"),
        is_static: false,
        complexity: complexity(node, BRANCH_KINDS),
        calls: body.map(|b| body_calls(b, src)).unwrap_or_default(),
    })
}

fn named_symbol(
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
        signature: Some(signature_text(
            node,
            node.child_by_field_name("body"),
            src,
        )),
        docstring: doc_above(lines, start_line(node), Language::Typescript),
        return_type: None,
        parameters: Vec::new(),
        visibility: Visibility::Public,
        is_async: false,
        is_static: false,
        complexity: complexity(node, BRANCH_KINDS),
        calls: Vec::new(),
    })
}

fn method_symbol(node: Node<'_>, src: &str, path: &str, lines: &[&str]) -> Option<SymbolNode> {
    let name = name_of(node, src)?;
    let owner = enclosing_class(node, src);
    let body = node.child_by_field_name("body");
    Some(SymbolNode {
        qualified_name: qualified_name(path, owner.as_deref(), &name),
        name,
        kind: SymbolKind::Method,
        file: path.to_string(),
        start_line: start_line(node),
        end_line: end_line(node),
        signature: Some(signature_text(node, body, src)),
        docstring: doc_above(lines, start_line(node), Language::Typescript),
        return_type: return_type_of(node, src),
        parameters: parameters_of(node, src),
        visibility: visibility_of(node, src),
        is_async: has_keyword_child(node, "async"),
        is_static: has_keyword_child(node, "static"),
        complexity: complexity(node, BRANCH_KINDS),
        calls: body.map(|b| body_calls(b, src)).unwrap_or_default(),
    })
}

/// `const f = (…) => …` declares a function; other declarators are
/// constants (`const`) or variables (`let`/`var`).
fn declarator_symbols(
    decl: Node<'_>,
    src: &str,
    path: &str,
    lines: &[&str],
    out: &mut Vec<SymbolNode>,
) {
    let is_const = has_keyword_child(decl, "const");
    let mut cursor = decl.walk();
    for declarator in decl.named_children(&mut cursor) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let Some(name) = name_of(declarator, src) else {
            continue;
        };
        let value = declarator.child_by_field_name("value");
        let is_fn = matches!(
            value.map(|v| v.kind()),
            Some("arrow_function") | Some("function_expression") | Some("function")
        );
        let kind = if is_fn {
            SymbolKind::Function
        } else if is_const {
            SymbolKind::Constant
        } else {
            SymbolKind::Variable
        };
        let fn_body = value.and_then(|v| v.child_by_field_name("body"));
        out.push(SymbolNode {
            qualified_name: qualified_name(path, None, &name),
            name,
            kind,
            file: path.to_string(),
            start_line: start_line(decl),
            end_line: end_line(decl),
            signature: if is_fn {
                value.map(|v| signature_text(v, fn_body, src))
            } else {
                Some(signature_text(declarator, None, src))
            },
            docstring: doc_above(lines, start_line(decl), Language::Typescript),
            return_type: value.and_then(|v| return_type_of(v, src)),
            parameters: value.map(|v| parameters_of(v, src)).unwrap_or_default(),
            visibility: Visibility::Public,
            is_async: value.map(|v| has_keyword_child(v, "async")).unwrap_or(false),
            is_static: false,
            complexity: value
                .map(|v| complexity(v, BRANCH_KINDS))
                .unwrap_or(1),
            calls: fn_body.map(|b| body_calls(b, src)).unwrap_or_default(),
        });
    }
}

fn strip_quotes(s: &str) -> String {
    s.trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string()
}

fn import_meta(source: &str) -> (bool, Option<String>) {
    let external = !(source.starts_with('.') || source.starts_with('/'));
    if !external {
        return (false, None);
    }
    let package = if source.starts_with('@') {
        source.splitn(3, '/').take(2).collect::<Vec<_>>().join("/")
    } else {
        source.split('/').next().unwrap_or(source).to_string()
    };
    (true, Some(package))
}

fn import_directive(node: Node<'_>, src: &str) -> Option<Import> {
    let source = strip_quotes(node_text(node.child_by_field_name("source")?, src));
    let (is_external, package_name) = import_meta(&source);
    let line = start_line(node);

    let mut imported = Vec::new();
    let mut import_type = ImportType::SideEffect;
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() != "import_clause" {
            continue;
        }
        let mut clause_cursor = child.walk();
        for part in child.named_children(&mut clause_cursor) {
            match part.kind() {
                "identifier" => {
                    import_type = ImportType::Default;
                    imported.push(node_text(part, src).to_string());
                }
                "namespace_import" => {
                    import_type = ImportType::Namespace;
                    let mut ns = part.walk();
                    if let Some(alias) =
                        part.named_children(&mut ns).find(|c| c.kind() == "identifier")
                    {
                        imported.push(node_text(alias, src).to_string());
                    }
                }
                "named_imports" => {
                    if import_type == ImportType::SideEffect {
                        import_type = ImportType::Named;
                    }
                    let mut spec = part.walk();
                    for s in part.named_children(&mut spec) {
                        if s.kind() == "import_specifier" {
                            if let Some(name) = name_of(s, src) {
                                imported.push(name);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    Some(Import {
        source,
        imported_symbols: imported,
        import_type,
        is_external,
        package_name,
        line,
    })
}

fn export_directives(node: Node<'_>, src: &str, out: &mut Vec<Export>) {
    let line = start_line(node);
    let is_default = has_keyword_child(node, "default");

    if let Some(decl) = node.child_by_field_name("declaration") {
        match decl.kind() {
            "lexical_declaration" | "variable_declaration" => {
                let mut cursor = decl.walk();
                for d in decl.named_children(&mut cursor) {
                    if d.kind() == "variable_declarator" {
                        if let Some(name) = name_of(d, src) {
                            out.push(Export {
                                name,
                                kind: ExportKind::Named,
                                line,
                            });
                        }
                    }
                }
            }
            _ => {
                let name = name_of(decl, src).unwrap_or_else(|| "default".into());
                out.push(Export {
                    name,
                    kind: if is_default {
                        ExportKind::Default
                    } else {
                        ExportKind::Named
                    },
                    line,
                });
            }
        }
        return;
    }

    if is_default {
        // `export default <expr>`: use the identifier when there is one.
        let name = node
            .child_by_field_name("value")
            .filter(|v| v.kind() == "identifier")
            .map(|v| node_text(v, src).to_string())
            .unwrap_or_else(|| "default".into());
        out.push(Export {
            name,
            kind: ExportKind::Default,
            line,
        });
        return;
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() != "export_clause" {
            continue;
        }
        let mut spec = child.walk();
        for s in child.named_children(&mut spec) {
            if s.kind() == "export_specifier" {
                let exported = s
                    .child_by_field_name("alias")
                    .or_else(|| s.child_by_field_name("name"))
                    .map(|n| node_text(n, src).to_string());
                if let Some(name) = exported {
                    out.push(Export {
                        name,
                        kind: ExportKind::Named,
                        line,
                    });
                }
            }
        }
    }
}
