//! Rust grammar set.
//!
//! `impl` blocks are scope-only: they qualify the functions inside them
//! (emitted as methods) without being entities themselves.

use crate::entity::ImportKind;
use crate::grammar::GrammarSet;
use repograph_core::EntityKind;

pub fn grammar() -> GrammarSet {
    GrammarSet {
        language: "rust",
        extensions: &["rs"],
        grammar: tree_sitter_rust::LANGUAGE.into(),
        entity_kinds: &[
            ("function_item", EntityKind::Function),
            ("struct_item", EntityKind::Class),
            ("enum_item", EntityKind::Class),
            ("trait_item", EntityKind::Class),
            ("mod_item", EntityKind::Module),
        ],
        import_kinds: &[("use_declaration", ImportKind::Import)],
        scope_kinds: &["impl_item"],
        arrow_declarators: false,
        commonjs_require: false,
    }
}
