//! Generic syntax probe over tree-sitter grammars.
//!
//! One walker serves every language: grammar sets supply the node-kind maps,
//! the walker supplies scoping, qualified names, and import/call extraction.
//! Parse failures never escape; an unparseable or unsupported buffer yields
//! an empty result and the caller treats the file as opaque.

use crate::entity::{CallSite, EntityDescriptor, ImportKind, ImportRecord, ProbeResult};
use crate::grammar::GrammarSet;
use crate::languages;
use repograph_core::EntityKind;
use std::path::Path;
use tree_sitter::{Node, Parser};

pub struct SyntaxProbe;

impl SyntaxProbe {
    pub fn new() -> Self {
        Self
    }

    /// Language tag for a path, by extension. `None` for unsupported files.
    pub fn language_for_path(path: &str) -> Option<&'static str> {
        let ext = Path::new(path).extension().and_then(|e| e.to_str())?;
        languages::language_for_extension(ext)
    }

    pub fn supports_language(language: &str) -> bool {
        languages::grammar_for(language).is_some()
    }

    /// Extract entities and imports from a source buffer.
    pub fn probe(&self, source: &str, language: &str, file_path: &str) -> ProbeResult {
        let Some(tree) = parse(source, language, file_path) else {
            return ProbeResult::default();
        };
        let (grammar, tree) = tree;
        let mut result = ProbeResult::default();
        let mut scope = Vec::new();
        walk_entities(
            tree.root_node(),
            source.as_bytes(),
            &grammar,
            &mut scope,
            &mut result,
        );
        result
    }

    /// Extract call sites from a source buffer.
    pub fn call_sites(&self, source: &str, language: &str, file_path: &str) -> Vec<CallSite> {
        let Some((grammar, tree)) = parse(source, language, file_path) else {
            return Vec::new();
        };
        let mut sites = Vec::new();
        let mut scope = Vec::new();
        walk_calls(
            tree.root_node(),
            source.as_bytes(),
            &grammar,
            file_path,
            &mut scope,
            &mut sites,
        );
        sites
    }
}

impl Default for SyntaxProbe {
    fn default() -> Self {
        Self::new()
    }
}

fn parse(
    source: &str,
    language: &str,
    file_path: &str,
) -> Option<(GrammarSet, tree_sitter::Tree)> {
    let grammar = languages::grammar_for(language)?;
    let mut parser = Parser::new();
    if parser.set_language(&grammar.grammar).is_err() {
        tracing::debug!(language, "grammar rejected by parser");
        return None;
    }
    match parser.parse(source, None) {
        Some(tree) => Some((grammar, tree)),
        None => {
            tracing::debug!(language, file_path, "parse failed");
            None
        }
    }
}

// ── Entity Extraction ─────────────────────────────────────────────────────

#[derive(Clone)]
struct ScopeEntry {
    name: String,
    kind: EntityKind,
}

fn walk_entities(
    node: Node,
    source: &[u8],
    grammar: &GrammarSet,
    scope: &mut Vec<ScopeEntry>,
    out: &mut ProbeResult,
) {
    if let Some(import_kind) = grammar.import_kind(node.kind()) {
        extract_imports(node, source, grammar, import_kind, &mut out.imports);
        return;
    }

    if let Some(base_kind) = grammar.entity_kind(node.kind()) {
        if let Some(name) = entity_name(node, source, grammar) {
            let kind = promote_to_method(base_kind, scope);
            emit_entity(node, source, kind, &name, scope, out);
            scope.push(ScopeEntry { name, kind });
            recurse(node, source, grammar, scope, out);
            scope.pop();
            return;
        }
    }

    // Scope-only constructs (Rust impl blocks): qualify children, emit nothing.
    if grammar.is_scope(node.kind()) {
        if let Some(name) = entity_name(node, source, grammar) {
            scope.push(ScopeEntry {
                name,
                kind: EntityKind::Class,
            });
            recurse(node, source, grammar, scope, out);
            scope.pop();
            return;
        }
    }

    // Function values bound to a named declarator adopt the declarator's name.
    if grammar.arrow_declarators && is_declarator_kind(node.kind()) {
        if let Some((name, value)) = declarator_function(node, source) {
            let kind = promote_to_method(EntityKind::Function, scope);
            emit_entity(node, source, kind, &name, scope, out);
            scope.push(ScopeEntry { name, kind });
            walk_entities(value, source, grammar, scope, out);
            scope.pop();
            return;
        }
    }

    if grammar.commonjs_require && node.kind() == "call_expression" {
        if let Some(record) = require_import(node, source) {
            out.imports.push(record);
        }
    }

    recurse(node, source, grammar, scope, out);
}

fn recurse(
    node: Node,
    source: &[u8],
    grammar: &GrammarSet,
    scope: &mut Vec<ScopeEntry>,
    out: &mut ProbeResult,
) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_entities(child, source, grammar, scope, out);
    }
}

fn emit_entity(
    node: Node,
    source: &[u8],
    kind: EntityKind,
    name: &str,
    scope: &[ScopeEntry],
    out: &mut ProbeResult,
) {
    out.entities.push(EntityDescriptor {
        kind,
        name: name.to_string(),
        qualified_name: qualify(scope, name),
        start_line: node.start_position().row as u32 + 1,
        end_line: node.end_position().row as u32 + 1,
        source: node_text(node, source),
    });
}

/// A plain function nested directly in a class scope is a method.
fn promote_to_method(kind: EntityKind, scope: &[ScopeEntry]) -> EntityKind {
    if kind == EntityKind::Function
        && scope.last().is_some_and(|s| s.kind == EntityKind::Class)
    {
        EntityKind::Method
    } else {
        kind
    }
}

fn qualify(scope: &[ScopeEntry], name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        let mut parts: Vec<&str> = scope.iter().map(|s| s.name.as_str()).collect();
        parts.push(name);
        parts.join(".")
    }
}

fn is_declarator_kind(kind: &str) -> bool {
    matches!(
        kind,
        "variable_declarator" | "public_field_definition" | "field_definition"
    )
}

/// `const foo = () => ...` / `bar = function() {...}` class fields.
fn declarator_function<'t>(node: Node<'t>, source: &[u8]) -> Option<(String, Node<'t>)> {
    let value = node.child_by_field_name("value")?;
    if !matches!(
        value.kind(),
        "arrow_function" | "function_expression" | "function"
    ) {
        return None;
    }
    let name_node = node.child_by_field_name("name")?;
    if name_node.kind() != "identifier" && name_node.kind() != "property_identifier" {
        return None;
    }
    Some((node_text(name_node, source), value))
}

fn entity_name(node: Node, source: &[u8], grammar: &GrammarSet) -> Option<String> {
    match (grammar.language, node.kind()) {
        // `type Foo struct {...}`: the name sits on the inner type_spec.
        ("go", "type_declaration") => {
            let mut cursor = node.walk();
            let result = node
                .children(&mut cursor)
                .find(|c| c.kind() == "type_spec")
                .and_then(|spec| spec.child_by_field_name("name"))
                .map(|n| node_text(n, source));
            result
        }
        // `impl Foo { ... }` / `impl Trait for Foo { ... }`.
        ("rust", "impl_item") => node
            .child_by_field_name("type")
            .map(|n| node_text(n, source)),
        _ => node
            .child_by_field_name("name")
            .map(|n| node_text(n, source)),
    }
}

// ── Import Extraction ─────────────────────────────────────────────────────

fn extract_imports(
    node: Node,
    source: &[u8],
    grammar: &GrammarSet,
    kind: ImportKind,
    out: &mut Vec<ImportRecord>,
) {
    let line = node.start_position().row as u32 + 1;
    match grammar.language {
        "typescript" | "javascript" => {
            if let Some(src) = node.child_by_field_name("source") {
                out.push(ImportRecord {
                    module: strip_quotes(&node_text(src, source)),
                    kind,
                    line,
                });
            }
        }
        "python" => match kind {
            ImportKind::From => {
                if let Some(module) = node.child_by_field_name("module_name") {
                    out.push(ImportRecord {
                        module: node_text(module, source),
                        kind,
                        line,
                    });
                }
            }
            _ => {
                // `import a, b.c as d`: one record per imported module.
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    let target = match child.kind() {
                        "dotted_name" => Some(child),
                        "aliased_import" => child.child_by_field_name("name"),
                        _ => None,
                    };
                    if let Some(target) = target {
                        out.push(ImportRecord {
                            module: node_text(target, source),
                            kind,
                            line,
                        });
                    }
                }
            }
        },
        "rust" => {
            if let Some(argument) = node.child_by_field_name("argument") {
                out.push(ImportRecord {
                    module: node_text(argument, source),
                    kind,
                    line,
                });
            }
        }
        "go" => collect_string_literals(node, source, kind, out),
        "java" => {
            let mut cursor = node.walk();
            let found = node
                .named_children(&mut cursor)
                .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"));
            if let Some(path) = found {
                out.push(ImportRecord {
                    module: node_text(path, source),
                    kind,
                    line,
                });
            }
        }
        _ => {}
    }
}

/// Go import blocks carry one string literal per imported package.
fn collect_string_literals(
    node: Node,
    source: &[u8],
    kind: ImportKind,
    out: &mut Vec<ImportRecord>,
) {
    if node.kind() == "interpreted_string_literal" {
        out.push(ImportRecord {
            module: strip_quotes(&node_text(node, source)),
            kind,
            line: node.start_position().row as u32 + 1,
        });
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_string_literals(child, source, kind, out);
    }
}

fn require_import(node: Node, source: &[u8]) -> Option<ImportRecord> {
    let function = node.child_by_field_name("function")?;
    if node_text(function, source) != "require" {
        return None;
    }
    let arguments = node.child_by_field_name("arguments")?;
    let mut cursor = arguments.walk();
    let arg = arguments
        .named_children(&mut cursor)
        .find(|c| c.kind() == "string")?;
    Some(ImportRecord {
        module: strip_quotes(&node_text(arg, source)),
        kind: ImportKind::Require,
        line: node.start_position().row as u32 + 1,
    })
}

// ── Call-Site Extraction ──────────────────────────────────────────────────

fn walk_calls(
    node: Node,
    source: &[u8],
    grammar: &GrammarSet,
    file_path: &str,
    scope: &mut Vec<ScopeEntry>,
    out: &mut Vec<CallSite>,
) {
    let callee = match (grammar.language, node.kind()) {
        ("java", "method_invocation") => node
            .child_by_field_name("name")
            .map(|n| node_text(n, source)),
        ("java", "object_creation_expression") => node
            .child_by_field_name("type")
            .map(|n| node_text(n, source)),
        (_, "call_expression") => node
            .child_by_field_name("function")
            .map(|n| node_text(n, source)),
        (_, "new_expression") => node
            .child_by_field_name("constructor")
            .map(|n| node_text(n, source)),
        _ => None,
    };

    if let Some(raw) = callee {
        let symbol = trailing_symbol(&raw);
        if !symbol.is_empty() {
            let caller_entity = if scope.is_empty() {
                file_path.to_string()
            } else {
                scope
                    .iter()
                    .map(|s| s.name.as_str())
                    .collect::<Vec<_>>()
                    .join(".")
            };
            out.push(CallSite {
                callee: symbol,
                caller_file: file_path.to_string(),
                caller_entity,
                line: node.start_position().row as u32 + 1,
            });
        }
    }

    // Track enclosing entities so call sites attribute to their caller.
    let entered = grammar
        .entity_kind(node.kind())
        .or_else(|| {
            if grammar.is_scope(node.kind()) {
                Some(EntityKind::Class)
            } else {
                None
            }
        })
        .and_then(|kind| entity_name(node, source, grammar).map(|name| (name, kind)));

    let pushed = entered.is_some();
    if let Some((name, kind)) = entered {
        scope.push(ScopeEntry { name, kind });
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_calls(child, source, grammar, file_path, scope, out);
    }
    if pushed {
        scope.pop();
    }
}

/// Trailing identifier of a callee expression: `a.b.c` → `c`, `a?.b` → `b`,
/// `X<T>` → `X`, `ns::f` → `f`.
fn trailing_symbol(raw: &str) -> String {
    let cut = raw.split(['<', '(']).next().unwrap_or(raw);
    let last = cut.rsplit(['.', ':']).next().unwrap_or(cut);
    last.trim_matches(['?', '!', ' ']).to_string()
}

// ── Helpers ───────────────────────────────────────────────────────────────

fn node_text(node: Node, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or("").to_string()
}

fn strip_quotes(text: &str) -> String {
    text.trim_matches(['\'', '"', '`']).to_string()
}
