//! JavaScript/JSX grammar set.

use crate::entity::ImportKind;
use crate::grammar::GrammarSet;
use repograph_core::EntityKind;

pub fn grammar() -> GrammarSet {
    GrammarSet {
        language: "javascript",
        extensions: &["js", "jsx", "mjs", "cjs"],
        grammar: tree_sitter_javascript::LANGUAGE.into(),
        entity_kinds: &[
            ("function_declaration", EntityKind::Function),
            ("generator_function_declaration", EntityKind::Function),
            ("class_declaration", EntityKind::Class),
            ("method_definition", EntityKind::Method),
        ],
        import_kinds: &[("import_statement", ImportKind::Import)],
        scope_kinds: &[],
        arrow_declarators: true,
        commonjs_require: true,
    }
}
