//! Structural diff extraction from VCS name-status output.
//!
//! For each changed file the syntax probe runs against the before/after
//! revisions; entities pair by `(entityType, qualifiedName)` into
//! insertions, deletions, and modifications. The parser never invents
//! structure: entities the probe does not produce do not exist here.

use crate::vcs::GitProbe;
use repograph_core::{ids, EntityKind, RpgError};
use repograph_syntax::{EntityDescriptor, ImportRecord, SyntaxProbe};
use std::collections::BTreeMap;
use std::path::Path;

// ── Changed Entities ──────────────────────────────────────────────────────

/// One entity on either side of a structural diff.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangedEntity {
    pub id: String,
    pub entity_kind: EntityKind,
    pub name: String,
    pub qualified_name: String,
    pub file_path: String,
    pub start_line: Option<u32>,
    pub end_line: Option<u32>,
    pub source: Option<String>,
    /// Populated only on file-level entities.
    pub imports: Vec<ImportRecord>,
}

impl ChangedEntity {
    fn from_descriptor(descriptor: &EntityDescriptor, file_path: &str) -> Self {
        Self {
            id: ids::entity_id(file_path, descriptor.kind, &descriptor.qualified_name),
            entity_kind: descriptor.kind,
            name: descriptor.name.clone(),
            qualified_name: descriptor.qualified_name.clone(),
            file_path: file_path.to_string(),
            start_line: Some(descriptor.start_line),
            end_line: Some(descriptor.end_line),
            source: Some(descriptor.source.clone()),
            imports: Vec::new(),
        }
    }

    /// The mandatory file-level entity for a changed file: it anchors
    /// cross-file dependency edges.
    fn file_level(file_path: &str, source: String, imports: Vec<ImportRecord>) -> Self {
        Self {
            id: ids::entity_id(file_path, EntityKind::File, file_path),
            entity_kind: EntityKind::File,
            name: file_path.to_string(),
            qualified_name: file_path.to_string(),
            file_path: file_path.to_string(),
            start_line: None,
            end_line: None,
            source: Some(source),
            imports,
        }
    }
}

/// A paired modification.
#[derive(Debug, Clone, PartialEq)]
pub struct Modification {
    pub old: ChangedEntity,
    pub new: ChangedEntity,
}

/// The full structural diff for a commit range.
#[derive(Debug, Clone, Default)]
pub struct DiffResult {
    pub insertions: Vec<ChangedEntity>,
    pub deletions: Vec<ChangedEntity>,
    pub modifications: Vec<Modification>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.insertions.is_empty() && self.deletions.is_empty() && self.modifications.is_empty()
    }
}

// ── Name-Status Parsing ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChangeStatus {
    Added,
    Modified,
    Deleted,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FileChange {
    pub status: ChangeStatus,
    pub path: String,
}

/// Parse raw name-status text. Renames split into delete + add, copies add
/// only; whitespace-only and malformed lines are skipped.
pub(crate) fn parse_name_status(text: &str) -> Vec<FileChange> {
    let mut changes = Vec::new();
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        let Some(status) = fields.next() else {
            continue;
        };
        let Some(first_path) = fields.next().map(str::trim) else {
            continue;
        };
        if first_path.is_empty() {
            continue;
        }
        let second_path = fields.next().map(str::trim);

        match status.chars().next() {
            Some('A') => changes.push(FileChange {
                status: ChangeStatus::Added,
                path: first_path.to_string(),
            }),
            Some('M') | Some('T') => changes.push(FileChange {
                status: ChangeStatus::Modified,
                path: first_path.to_string(),
            }),
            Some('D') => changes.push(FileChange {
                status: ChangeStatus::Deleted,
                path: first_path.to_string(),
            }),
            Some('R') => {
                let Some(new_path) = second_path.filter(|p| !p.is_empty()) else {
                    continue;
                };
                changes.push(FileChange {
                    status: ChangeStatus::Deleted,
                    path: first_path.to_string(),
                });
                changes.push(FileChange {
                    status: ChangeStatus::Added,
                    path: new_path.to_string(),
                });
            }
            Some('C') => {
                let Some(new_path) = second_path.filter(|p| !p.is_empty()) else {
                    continue;
                };
                changes.push(FileChange {
                    status: ChangeStatus::Added,
                    path: new_path.to_string(),
                });
            }
            _ => {
                tracing::debug!(line, "skipping unrecognized name-status line");
            }
        }
    }
    changes
}

/// The two revisions a range compares.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RangeSpec {
    pub old: String,
    pub new: String,
}

pub(crate) fn split_range(range: &str) -> RangeSpec {
    if let Some((old, new)) = range.split_once("...") {
        RangeSpec {
            old: old.to_string(),
            new: new.to_string(),
        }
    } else if let Some((old, new)) = range.split_once("..") {
        RangeSpec {
            old: old.to_string(),
            new: new.to_string(),
        }
    } else {
        // A single revision compares against its first parent.
        RangeSpec {
            old: format!("{range}^"),
            new: range.to_string(),
        }
    }
}

// ── Diff Parser ───────────────────────────────────────────────────────────

pub struct DiffParser<'a> {
    probe: &'a SyntaxProbe,
    vcs: &'a GitProbe,
}

impl<'a> DiffParser<'a> {
    pub fn new(probe: &'a SyntaxProbe, vcs: &'a GitProbe) -> Self {
        Self { probe, vcs }
    }

    /// Build the structural diff for `range` in `repo`.
    pub fn parse(&self, repo: &Path, range: &str) -> Result<DiffResult, RpgError> {
        let raw = self.vcs.name_status(repo, range)?;
        let changes = parse_name_status(&raw);
        let spec = split_range(range);

        let mut result = DiffResult::default();
        for change in changes {
            // Unsupported languages are dropped entirely.
            let Some(language) = SyntaxProbe::language_for_path(&change.path) else {
                continue;
            };
            match change.status {
                ChangeStatus::Added => {
                    let Some(content) =
                        self.vcs.file_at_revision(repo, &spec.new, &change.path)?
                    else {
                        tracing::warn!(path = %change.path, "added file missing at new revision");
                        continue;
                    };
                    self.collect_side(&change.path, language, content, &mut result.insertions);
                }
                ChangeStatus::Deleted => {
                    let Some(content) =
                        self.vcs.file_at_revision(repo, &spec.old, &change.path)?
                    else {
                        tracing::warn!(path = %change.path, "deleted file missing at old revision");
                        continue;
                    };
                    self.collect_side(&change.path, language, content, &mut result.deletions);
                }
                ChangeStatus::Modified => {
                    let old = self.vcs.file_at_revision(repo, &spec.old, &change.path)?;
                    let new = self.vcs.file_at_revision(repo, &spec.new, &change.path)?;
                    match (old, new) {
                        (Some(old), Some(new)) => {
                            self.pair_modified(&change.path, language, &old, &new, &mut result);
                        }
                        (None, Some(new)) => {
                            self.collect_side(&change.path, language, new, &mut result.insertions);
                        }
                        (Some(old), None) => {
                            self.collect_side(&change.path, language, old, &mut result.deletions);
                        }
                        (None, None) => {}
                    }
                }
            }
        }
        Ok(result)
    }

    /// Probe one side of an add/delete into `out`, file-level entity first.
    fn collect_side(
        &self,
        path: &str,
        language: &str,
        content: String,
        out: &mut Vec<ChangedEntity>,
    ) {
        let probed = self.probe.probe(&content, language, path);
        out.push(ChangedEntity::file_level(
            path,
            content,
            probed.imports.clone(),
        ));
        for descriptor in &probed.entities {
            out.push(ChangedEntity::from_descriptor(descriptor, path));
        }
    }

    /// Pair the before/after entity lists of a modified file.
    fn pair_modified(
        &self,
        path: &str,
        language: &str,
        old_content: &str,
        new_content: &str,
        result: &mut DiffResult,
    ) {
        let old_probe = self.probe.probe(old_content, language, path);
        let new_probe = self.probe.probe(new_content, language, path);

        // The file-level entity always changes on an M status.
        result.modifications.push(Modification {
            old: ChangedEntity::file_level(
                path,
                old_content.to_string(),
                old_probe.imports.clone(),
            ),
            new: ChangedEntity::file_level(
                path,
                new_content.to_string(),
                new_probe.imports.clone(),
            ),
        });

        let key = |d: &EntityDescriptor| (d.kind, d.qualified_name.clone());
        let old_map: BTreeMap<_, _> = old_probe.entities.iter().map(|d| (key(d), d)).collect();
        let new_map: BTreeMap<_, _> = new_probe.entities.iter().map(|d| (key(d), d)).collect();

        for (entity_key, old_descriptor) in &old_map {
            match new_map.get(entity_key) {
                None => result
                    .deletions
                    .push(ChangedEntity::from_descriptor(old_descriptor, path)),
                Some(new_descriptor) if new_descriptor.source != old_descriptor.source => {
                    result.modifications.push(Modification {
                        old: ChangedEntity::from_descriptor(old_descriptor, path),
                        new: ChangedEntity::from_descriptor(new_descriptor, path),
                    });
                }
                Some(_) => {}
            }
        }
        for (entity_key, new_descriptor) in &new_map {
            if !old_map.contains_key(entity_key) {
                result
                    .insertions
                    .push(ChangedEntity::from_descriptor(new_descriptor, path));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_add() {
        let changes = parse_name_status("A\tsrc/new.ts\n");
        assert_eq!(
            changes,
            vec![FileChange {
                status: ChangeStatus::Added,
                path: "src/new.ts".to_string(),
            }]
        );
    }

    #[test]
    fn rename_splits_into_delete_plus_add() {
        let changes = parse_name_status("R100\tsrc/old.ts\tsrc/new.ts\n");
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].status, ChangeStatus::Deleted);
        assert_eq!(changes[0].path, "src/old.ts");
        assert_eq!(changes[1].status, ChangeStatus::Added);
        assert_eq!(changes[1].path, "src/new.ts");
    }

    #[test]
    fn copy_adds_only() {
        let changes = parse_name_status("C100\tsrc/a.ts\tsrc/b.ts\n");
        assert_eq!(
            changes,
            vec![FileChange {
                status: ChangeStatus::Added,
                path: "src/b.ts".to_string(),
            }]
        );
    }

    #[test]
    fn blank_and_malformed_lines_skipped() {
        let text = "\n   \nM\tsrc/a.ts\nnonsense-without-tab\nX\tweird.ts\nD\tsrc/b.py\n";
        let changes = parse_name_status(text);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].path, "src/a.ts");
        assert_eq!(changes[1].status, ChangeStatus::Deleted);
    }

    #[test]
    fn split_range_variants() {
        assert_eq!(
            split_range("abc..def"),
            RangeSpec {
                old: "abc".into(),
                new: "def".into()
            }
        );
        assert_eq!(
            split_range("abc...def"),
            RangeSpec {
                old: "abc".into(),
                new: "def".into()
            }
        );
        assert_eq!(
            split_range("abc123"),
            RangeSpec {
                old: "abc123^".into(),
                new: "abc123".into()
            }
        );
    }

    #[test]
    fn file_level_entity_shape() {
        let entity = ChangedEntity::file_level("src/a.ts", "content".into(), vec![]);
        assert_eq!(entity.id, "src/a.ts:file:src/a.ts");
        assert_eq!(entity.entity_kind, EntityKind::File);
        assert_eq!(entity.qualified_name, "src/a.ts");
        assert_eq!(entity.start_line, None);
    }
}
