//! TypeScript/TSX grammar set.
//!
//! Uses the TSX grammar (a superset of TypeScript) so both `.ts` and `.tsx`
//! parse with a single configuration.

use crate::entity::ImportKind;
use crate::grammar::GrammarSet;
use repograph_core::EntityKind;

pub fn grammar() -> GrammarSet {
    GrammarSet {
        language: "typescript",
        extensions: &["ts", "tsx"],
        grammar: tree_sitter_typescript::LANGUAGE_TSX.into(),
        entity_kinds: &[
            ("function_declaration", EntityKind::Function),
            ("generator_function_declaration", EntityKind::Function),
            ("class_declaration", EntityKind::Class),
            ("abstract_class_declaration", EntityKind::Class),
            ("method_definition", EntityKind::Method),
            ("module", EntityKind::Module),
            ("internal_module", EntityKind::Module),
        ],
        import_kinds: &[("import_statement", ImportKind::Import)],
        scope_kinds: &[],
        arrow_declarators: true,
        commonjs_require: false,
    }
}
