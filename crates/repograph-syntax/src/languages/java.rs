//! Java grammar set.

use crate::entity::ImportKind;
use crate::grammar::GrammarSet;
use repograph_core::EntityKind;

pub fn grammar() -> GrammarSet {
    GrammarSet {
        language: "java",
        extensions: &["java"],
        grammar: tree_sitter_java::LANGUAGE.into(),
        entity_kinds: &[
            ("class_declaration", EntityKind::Class),
            ("interface_declaration", EntityKind::Class),
            ("enum_declaration", EntityKind::Class),
            ("method_declaration", EntityKind::Method),
            ("constructor_declaration", EntityKind::Method),
        ],
        import_kinds: &[("import_declaration", ImportKind::Import)],
        scope_kinds: &[],
        arrow_declarators: false,
        commonjs_require: false,
    }
}
