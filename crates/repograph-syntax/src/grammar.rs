//! GrammarSet: per-language parsing configuration.
//!
//! A grammar set bundles a tree-sitter language handle with the node-kind →
//! entity-kind map and the list of import-bearing node kinds. The probe's
//! generic walker is driven entirely by this data, so adding a language means
//! adding one constructor in `languages/`.

use crate::entity::ImportKind;
use repograph_core::EntityKind;

pub struct GrammarSet {
    /// Language tag (`typescript`, `python`, ...).
    pub language: &'static str,
    /// File extensions resolved to this grammar.
    pub extensions: &'static [&'static str],
    /// Parser handle.
    pub grammar: tree_sitter::Language,
    /// AST node kind → entity kind.
    pub entity_kinds: &'static [(&'static str, EntityKind)],
    /// Import-bearing AST node kinds.
    pub import_kinds: &'static [(&'static str, ImportKind)],
    /// AST node kinds that contribute a qualification scope without emitting
    /// an entity themselves (e.g. Rust `impl` blocks).
    pub scope_kinds: &'static [&'static str],
    /// Whether function values bound to named declarators adopt the
    /// declarator's name (JS/TS arrow functions).
    pub arrow_declarators: bool,
    /// Whether `require("...")` call expressions count as imports.
    pub commonjs_require: bool,
}

impl GrammarSet {
    pub fn entity_kind(&self, node_kind: &str) -> Option<EntityKind> {
        self.entity_kinds
            .iter()
            .find(|(k, _)| *k == node_kind)
            .map(|(_, kind)| *kind)
    }

    pub fn import_kind(&self, node_kind: &str) -> Option<ImportKind> {
        self.import_kinds
            .iter()
            .find(|(k, _)| *k == node_kind)
            .map(|(_, kind)| *kind)
    }

    pub fn is_scope(&self, node_kind: &str) -> bool {
        self.scope_kinds.contains(&node_kind)
    }
}
