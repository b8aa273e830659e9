//! Canonical node ID construction.
//!
//! Low-level entities: `<filePath>:<entityType>:<entityName>[:<startLine>]`.
//! Directory nodes: `<directoryPath>:dir`.
//!
//! Evolution-produced IDs omit the trailing line so that line churn does not
//! change identity; initial encoding may include it, and the evolver's
//! matching rule tolerates both.

use crate::EntityKind;

/// Build a line-less entity ID.
pub fn entity_id(file_path: &str, kind: EntityKind, name: &str) -> String {
    format!("{file_path}:{kind}:{name}")
}

/// Build an entity ID carrying the start line.
pub fn entity_id_with_line(file_path: &str, kind: EntityKind, name: &str, line: u32) -> String {
    format!("{file_path}:{kind}:{name}:{line}")
}

/// Build a directory node ID.
pub fn dir_id(directory_path: &str) -> String {
    format!("{directory_path}:dir")
}

/// Strip a trailing `:<line>` suffix if present, leaving the stable prefix.
pub fn strip_line_suffix(id: &str) -> &str {
    match id.rsplit_once(':') {
        Some((prefix, tail)) if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) => {
            prefix
        }
        _ => id,
    }
}

/// Whether `id` identifies the same entity as the line-less `prefix`,
/// tolerating an optional `:<line>` suffix on `id`.
pub fn matches_prefix(id: &str, prefix: &str) -> bool {
    id == prefix || strip_line_suffix(id) == prefix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_format() {
        assert_eq!(
            entity_id("src/x.ts", EntityKind::Function, "foo"),
            "src/x.ts:function:foo"
        );
        assert_eq!(
            entity_id_with_line("src/x.ts", EntityKind::Function, "foo", 12),
            "src/x.ts:function:foo:12"
        );
    }

    #[test]
    fn dir_id_format() {
        assert_eq!(dir_id("src/utils"), "src/utils:dir");
    }

    #[test]
    fn strip_line_suffix_only_strips_numeric_tail() {
        assert_eq!(
            strip_line_suffix("src/x.ts:function:foo:12"),
            "src/x.ts:function:foo"
        );
        assert_eq!(
            strip_line_suffix("src/x.ts:function:foo"),
            "src/x.ts:function:foo"
        );
        // A file-level ID ends in the path itself, never a bare number.
        assert_eq!(
            strip_line_suffix("src/x.ts:file:src/x.ts"),
            "src/x.ts:file:src/x.ts"
        );
    }

    #[test]
    fn matches_prefix_tolerates_line_suffix() {
        assert!(matches_prefix(
            "src/x.ts:function:foo:12",
            "src/x.ts:function:foo"
        ));
        assert!(matches_prefix(
            "src/x.ts:function:foo",
            "src/x.ts:function:foo"
        ));
        assert!(!matches_prefix(
            "src/x.ts:function:bar",
            "src/x.ts:function:foo"
        ));
    }
}
