//! Python grammar set.

use crate::entity::ImportKind;
use crate::grammar::GrammarSet;
use repograph_core::EntityKind;

pub fn grammar() -> GrammarSet {
    GrammarSet {
        language: "python",
        extensions: &["py"],
        grammar: tree_sitter_python::LANGUAGE.into(),
        entity_kinds: &[
            ("function_definition", EntityKind::Function),
            ("class_definition", EntityKind::Class),
        ],
        import_kinds: &[
            ("import_statement", ImportKind::Import),
            ("import_from_statement", ImportKind::From),
        ],
        scope_kinds: &[],
        arrow_declarators: false,
        commonjs_require: false,
    }
}
