//! Low-level Tree-sitter walking shared by the language extractors.

use crate::types::CallInfo;
use tree_sitter::Node;

/// Preorder traversal over every node, anonymous tokens included.
pub fn all_nodes(root: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    let mut cursor = root.walk();
    'outer: loop {
        out.push(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                continue 'outer;
            }
            if !cursor.goto_parent() {
                break 'outer;
            }
        }
    }
    out
}

pub fn node_text<'s>(n: Node<'_>, src: &'s str) -> &'s str {
    src.get(n.byte_range()).unwrap_or("")
}

/// 1-based start line.
pub fn start_line(n: Node<'_>) -> usize {
    n.start_position().row + 1
}

/// 1-based inclusive end line.
pub fn end_line(n: Node<'_>) -> usize {
    n.end_position().row + 1
}

/// McCabe cyclomatic complexity: 1 plus one per branching construct.
///
/// `branch_kinds` must be chosen per language so that a source-level branch is
/// counted exactly once (e.g. count `else_clause` nodes where the grammar has
/// them, the anonymous `else` token where it does not).
pub fn complexity(scope: Node<'_>, branch_kinds: &[&str]) -> u32 {
    let mut count = 1u32;
    for n in all_nodes(scope) {
        if branch_kinds.contains(&n.kind()) {
            count += 1;
        }
    }
    count
}

/// True iff a conditional construct lies strictly between `node` and `scope`.
pub fn has_conditional_ancestor(node: Node<'_>, scope: Node<'_>, conditional_kinds: &[&str]) -> bool {
    let mut cur = node;
    while let Some(parent) = cur.parent() {
        if parent.id() == scope.id() {
            return false;
        }
        if conditional_kinds.contains(&parent.kind()) {
            return true;
        }
        cur = parent;
    }
    false
}

/// Collect call sites inside `scope`.
///
/// `callee_of` maps a call node to the recorded callee text: bare identifiers
/// as-is, member/field calls by the member name.
pub fn collect_calls<'t>(
    scope: Node<'t>,
    src: &str,
    call_kinds: &[&str],
    conditional_kinds: &[&str],
    callee_of: impl Fn(Node<'t>, &str) -> Option<String>,
) -> Vec<CallInfo> {
    let mut out = Vec::new();
    for n in all_nodes(scope) {
        if !call_kinds.contains(&n.kind()) {
            continue;
        }
        if let Some(callee) = callee_of(n, src) {
            out.push(CallInfo {
                callee,
                line: start_line(n),
                is_conditional: has_conditional_ancestor(n, scope, conditional_kinds),
            });
        }
    }
    out
}

/// Declaration text up to (not including) the body, single-line collapsed.
pub fn signature_text(decl: Node<'_>, body: Option<Node<'_>>, src: &str) -> String {
    let end = body.map(|b| b.start_byte()).unwrap_or(decl.end_byte());
    let raw = src.get(decl.start_byte()..end).unwrap_or("");
    let mut sig = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if let Some(stripped) = sig.strip_suffix('{') {
        sig = stripped.trim_end().to_string();
    }
    sig
}

/// Whether the declaration carries the given anonymous keyword token as a
/// direct child (e.g. `async`, `static`).
pub fn has_keyword_child(decl: Node<'_>, keyword: &str) -> bool {
    let mut cursor = decl.walk();
    let found = decl.children(&mut cursor).any(|c| c.kind() == keyword);
    found
}
