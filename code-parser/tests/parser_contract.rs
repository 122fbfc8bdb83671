//! Contract tests for the native parsers across languages.

use code_parser::{ImportType, Language, ParserRegistry, SymbolKind, Visibility};
use pretty_assertions::assert_eq;

fn registry() -> ParserRegistry {
    ParserRegistry::with_defaults()
}

#[test]
fn grammars_load_natively() {
    let r = registry();
    assert!(
        r.load_failures().is_empty(),
        "grammar load failures: {:?}",
        r.load_failures()
    );
}

#[test]
fn empty_file_is_empty_everywhere() {
    let parsed = registry().parse_file("file.ts", "", None);
    assert!(parsed.symbols.is_empty());
    assert!(parsed.imports.is_empty());
    assert!(parsed.exports.is_empty());
    assert!(parsed.chunks.is_empty());
}

#[test]
fn single_function_one_line() {
    let parsed = registry().parse_file("file.ts", "export function add(a,b){return a+b}", None);

    assert_eq!(parsed.symbols.len(), 1);
    let sym = &parsed.symbols[0];
    assert_eq!(sym.name, "add");
    assert_eq!(sym.kind, SymbolKind::Function);
    assert_eq!(sym.complexity, 1);
    assert_eq!(sym.start_line, 1);
    assert_eq!(sym.end_line, 1);
    assert_eq!(sym.qualified_name, "file.ts:add");

    assert_eq!(parsed.chunks.len(), 1);
    assert_eq!(parsed.chunks[0].id, "file.ts:1-1");

    assert_eq!(parsed.exports.len(), 1);
    assert_eq!(parsed.exports[0].name, "add");
}

#[test]
fn branching_complexity_counts_if_else_for_ternary() {
    let src = "function f(x) {\n  if (x > 0) {\n    return 1;\n  } else {\n    for (let i = 0; i < x; i++) {}\n  }\n  return x > 2 ? 1 : 0;\n}\n";
    let parsed = registry().parse_file("f.ts", src, None);
    assert_eq!(parsed.symbols[0].complexity, 5);
}

#[test]
fn complexity_floor_holds_for_every_symbol() {
    let src = "const N = 1;\nlet s = 'x';\nfunction f() {}\nclass C {\n  m() {}\n}\n";
    let parsed = registry().parse_file("floor.ts", src, None);
    assert!(!parsed.symbols.is_empty());
    for sym in &parsed.symbols {
        assert!(sym.complexity >= 1, "{} has complexity 0", sym.name);
    }
}

#[test]
fn call_lines_are_exact() {
    let src = "function caller(x) {\n  helper(x);\n  if (x) {\n    guarded();\n  }\n  obj.method();\n}\n";
    let parsed = registry().parse_file("calls.ts", src, None);
    let calls = &parsed.symbols[0].calls;

    let helper = calls.iter().find(|c| c.callee == "helper").unwrap();
    assert_eq!(helper.line, 2);
    assert!(!helper.is_conditional);

    let guarded = calls.iter().find(|c| c.callee == "guarded").unwrap();
    assert_eq!(guarded.line, 4);
    assert!(guarded.is_conditional);

    // Method calls record the bare member name.
    let method = calls.iter().find(|c| c.callee == "method").unwrap();
    assert_eq!(method.line, 6);
}

#[test]
fn typescript_class_and_methods() {
    let src = "/**\n * A counter.\n */\nexport class Counter {\n  private count = 0;\n\n  increment(): number {\n    return ++this.count;\n  }\n\n  static create(): Counter {\n    return new Counter();\n  }\n}\n";
    let parsed = registry().parse_file("counter.ts", src, None);

    let class = parsed
        .symbols
        .iter()
        .find(|s| s.kind == SymbolKind::Class)
        .unwrap();
    assert_eq!(class.name, "Counter");
    assert!(class.docstring.as_deref().unwrap().contains("A counter."));

    let inc = parsed.symbols.iter().find(|s| s.name == "increment").unwrap();
    assert_eq!(inc.kind, SymbolKind::Method);
    assert_eq!(inc.qualified_name, "counter.ts:Counter.increment");
    assert_eq!(inc.return_type.as_deref(), Some("number"));

    let create = parsed.symbols.iter().find(|s| s.name == "create").unwrap();
    assert!(create.is_static);
}

#[test]
fn typescript_imports_and_exports() {
    let src = "import fs from 'fs';\nimport { join, resolve } from 'path';\nimport * as os from 'os';\nimport './side-effect';\nimport { local } from './util';\n\nexport default function main() {}\n";
    let parsed = registry().parse_file("app.ts", src, None);

    assert_eq!(parsed.imports.len(), 5);
    assert_eq!(parsed.imports[0].import_type, ImportType::Default);
    assert!(parsed.imports[0].is_external);
    assert_eq!(parsed.imports[1].import_type, ImportType::Named);
    assert_eq!(parsed.imports[1].imported_symbols, vec!["join", "resolve"]);
    assert_eq!(parsed.imports[2].import_type, ImportType::Namespace);
    assert_eq!(parsed.imports[3].import_type, ImportType::SideEffect);
    assert!(!parsed.imports[4].is_external);

    assert_eq!(parsed.exports.len(), 1);
    assert_eq!(parsed.exports[0].name, "main");
}

#[test]
fn arrow_function_consts_are_functions() {
    let src = "export const handler = async (req) => {\n  respond(req);\n};\nconst LIMIT = 10;\n";
    let parsed = registry().parse_file("h.ts", src, None);

    let handler = parsed.symbols.iter().find(|s| s.name == "handler").unwrap();
    assert_eq!(handler.kind, SymbolKind::Function);
    assert!(handler.is_async);
    assert_eq!(handler.calls.len(), 1);

    let limit = parsed.symbols.iter().find(|s| s.name == "LIMIT").unwrap();
    assert_eq!(limit.kind, SymbolKind::Constant);
}

#[test]
fn python_symbols_and_docstrings() {
    let src = "import os\nfrom collections import OrderedDict\n\nMAX_SIZE = 10\n\nclass Store:\n    \"\"\"Key-value store.\"\"\"\n\n    def put(self, key, value):\n        \"\"\"Insert a value.\"\"\"\n        self.data[key] = value\n\n    def _evict(self):\n        pass\n\nasync def run():\n    store = Store()\n    store.put('a', 1)\n";
    let parsed = registry().parse_file("store.py", src, Some(Language::Python));

    let class = parsed.symbols.iter().find(|s| s.name == "Store").unwrap();
    assert_eq!(class.kind, SymbolKind::Class);
    assert_eq!(class.docstring.as_deref(), Some("\"\"\"Key-value store.\"\"\""));

    let put = parsed.symbols.iter().find(|s| s.name == "put").unwrap();
    assert_eq!(put.kind, SymbolKind::Method);
    assert_eq!(put.qualified_name, "store.py:Store.put");

    let evict = parsed.symbols.iter().find(|s| s.name == "_evict").unwrap();
    assert_eq!(evict.visibility, Visibility::Private);

    let run = parsed.symbols.iter().find(|s| s.name == "run").unwrap();
    assert!(run.is_async);
    assert!(run.calls.iter().any(|c| c.callee == "put"));

    let max = parsed.symbols.iter().find(|s| s.name == "MAX_SIZE").unwrap();
    assert_eq!(max.kind, SymbolKind::Constant);

    assert_eq!(parsed.imports.len(), 2);
    assert_eq!(parsed.imports[1].imported_symbols, vec!["OrderedDict"]);
}

#[test]
fn rust_symbols() {
    let src = "use std::collections::HashMap;\n\npub struct Cache {\n    map: HashMap<String, u64>,\n}\n\nimpl Cache {\n    /// Look one key up.\n    pub fn get(&self, key: &str) -> Option<u64> {\n        self.map.get(key).copied()\n    }\n}\n\nfn helper() {}\n";
    let parsed = registry().parse_file("cache.rs", src, None);

    let cache = parsed.symbols.iter().find(|s| s.name == "Cache").unwrap();
    assert_eq!(cache.kind, SymbolKind::Class);
    assert_eq!(cache.visibility, Visibility::Public);

    let get = parsed.symbols.iter().find(|s| s.name == "get").unwrap();
    assert_eq!(get.kind, SymbolKind::Method);
    assert_eq!(get.qualified_name, "cache.rs:Cache.get");
    assert!(get.docstring.as_deref().unwrap().contains("Look one key up."));

    let helper = parsed.symbols.iter().find(|s| s.name == "helper").unwrap();
    assert_eq!(helper.visibility, Visibility::Private);
    assert_eq!(helper.kind, SymbolKind::Function);

    assert_eq!(parsed.imports.len(), 1);
    assert!(parsed.imports[0].is_external);
    assert_eq!(parsed.imports[0].package_name.as_deref(), Some("std"));

    // Only public file-scope items are exports.
    assert!(parsed.exports.iter().any(|e| e.name == "Cache"));
    assert!(!parsed.exports.iter().any(|e| e.name == "helper"));
}

#[test]
fn go_symbols() {
    let src = "package main\n\nimport \"fmt\"\n\ntype Server struct {\n\tport int\n}\n\nfunc (s *Server) Run() error {\n\tif s.port == 0 {\n\t\treturn fmt.Errorf(\"no port\")\n\t}\n\treturn nil\n}\n\nfunc helper() {}\n";
    let parsed = registry().parse_file("server.go", src, None);

    let server = parsed.symbols.iter().find(|s| s.name == "Server").unwrap();
    assert_eq!(server.kind, SymbolKind::Class);
    assert_eq!(server.visibility, Visibility::Public);

    let run = parsed.symbols.iter().find(|s| s.name == "Run").unwrap();
    assert_eq!(run.kind, SymbolKind::Method);
    assert_eq!(run.qualified_name, "server.go:Server.Run");
    assert_eq!(run.complexity, 2);
    assert!(run.calls.iter().any(|c| c.callee == "Errorf" && c.is_conditional));

    let helper = parsed.symbols.iter().find(|s| s.name == "helper").unwrap();
    assert_eq!(helper.visibility, Visibility::Private);
}

#[test]
fn java_symbols() {
    let src = "import java.util.List;\n\npublic class Greeter {\n    private static final String PREFIX = \"hi\";\n\n    protected String greet(String name) {\n        if (name == null) {\n            return PREFIX;\n        }\n        return PREFIX + name;\n    }\n}\n";
    let parsed = registry().parse_file("Greeter.java", src, None);

    let class = parsed.symbols.iter().find(|s| s.name == "Greeter").unwrap();
    assert_eq!(class.kind, SymbolKind::Class);

    let greet = parsed.symbols.iter().find(|s| s.name == "greet").unwrap();
    assert_eq!(greet.kind, SymbolKind::Method);
    assert_eq!(greet.visibility, Visibility::Protected);
    assert_eq!(greet.complexity, 2);

    let prefix = parsed.symbols.iter().find(|s| s.name == "PREFIX").unwrap();
    assert_eq!(prefix.kind, SymbolKind::Constant);
    assert_eq!(prefix.visibility, Visibility::Private);

    assert_eq!(parsed.imports.len(), 1);
    assert_eq!(parsed.imports[0].source, "java.util.List");
}

#[test]
fn markdown_has_no_symbols_but_chunks() {
    let src = "# Title\n\nIntro text.\n\n## Section\n\nBody.\n";
    let parsed = registry().parse_file("README.md", src, None);
    assert!(parsed.symbols.is_empty());
    assert_eq!(parsed.chunks.len(), 2);
    assert_eq!(parsed.chunks[0].symbol_name.as_deref(), Some("Title"));
}

#[test]
fn end_line_never_precedes_start_line() {
    let sources = [
        ("a.ts", "export function f() {\n  return 1;\n}\n"),
        ("b.py", "def g():\n    pass\n"),
        ("c.rs", "pub fn h() -> u8 {\n    0\n}\n"),
    ];
    let r = registry();
    for (path, src) in sources {
        for sym in r.parse_file(path, src, None).symbols {
            assert!(sym.end_line >= sym.start_line, "{}", sym.qualified_name);
        }
    }
}
