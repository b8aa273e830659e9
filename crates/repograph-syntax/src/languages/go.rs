//! Go grammar set.

use crate::entity::ImportKind;
use crate::grammar::GrammarSet;
use repograph_core::EntityKind;

pub fn grammar() -> GrammarSet {
    GrammarSet {
        language: "go",
        extensions: &["go"],
        grammar: tree_sitter_go::LANGUAGE.into(),
        entity_kinds: &[
            ("function_declaration", EntityKind::Function),
            ("method_declaration", EntityKind::Method),
            ("type_declaration", EntityKind::Class),
        ],
        import_kinds: &[("import_declaration", ImportKind::Import)],
        scope_kinds: &[],
        arrow_declarators: false,
        commonjs_require: false,
    }
}
