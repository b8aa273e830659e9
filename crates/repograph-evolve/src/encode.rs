//! Initial encoder: build a fresh planning graph from a repository tree.
//!
//! Walks the tree honoring `.gitignore`, creates one directory node per
//! directory holding supported source, one file node per supported file,
//! and one node per probed entity, wired file → class → function. Import
//! dependency edges resolve in a second pass once every file node exists.
//! Entity IDs embed the start line here; the evolver tolerates both forms.

use crate::imports;
use repograph_core::{EntityKind, RpgError, StructuralMetadata};
use repograph_graph::RepoGraph;
use repograph_semantic::{ExtractInput, SemanticExtractor};
use repograph_syntax::{ImportRecord, SyntaxProbe};
use std::collections::BTreeMap;
use std::path::Path;

pub struct Encoder {
    probe: SyntaxProbe,
}

impl Encoder {
    pub fn new() -> Self {
        Self {
            probe: SyntaxProbe::new(),
        }
    }

    /// Encode the repository at `root` into a new graph named `name`.
    pub fn encode(
        &self,
        root: &Path,
        name: &str,
        extractor: &mut SemanticExtractor,
        include_source: bool,
    ) -> Result<RepoGraph, RpgError> {
        let mut graph = RepoGraph::new(name);
        graph.set_root_path(root.to_string_lossy());

        // Deterministic order regardless of walker scheduling.
        let mut files: Vec<String> = Vec::new();
        let walker = ignore::WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .build();
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("walk error: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");
            if SyntaxProbe::language_for_path(&relative).is_some() {
                files.push(relative);
            }
        }
        files.sort();

        // (file node id, imports) pairs deferred to the dependency pass.
        let mut pending_imports: Vec<(String, String, Vec<ImportRecord>)> = Vec::new();

        for relative in &files {
            let content = match std::fs::read_to_string(root.join(relative)) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(path = relative.as_str(), "unreadable file skipped: {e}");
                    continue;
                }
            };
            let dir_id = self.ensure_directories(&mut graph, relative, extractor)?;
            let file_id = self.encode_file(
                &mut graph,
                relative,
                &content,
                dir_id.as_deref(),
                extractor,
                include_source,
            )?;
            let language = SyntaxProbe::language_for_path(relative)
                .expect("files were filtered to supported languages");
            let probed = self.probe.probe(&content, language, relative);
            self.encode_entities(&mut graph, relative, &probed.entities, &file_id, extractor)?;
            pending_imports.push((file_id, relative.clone(), probed.imports));
        }

        // Second pass: cross-file import edges.
        for (file_id, relative, records) in &pending_imports {
            for import in records {
                let Some(resolved) = imports::resolve_relative(relative, &import.module) else {
                    continue;
                };
                for target_id in imports::candidate_file_ids(&resolved) {
                    if &target_id == file_id || !graph.has_node(&target_id) {
                        continue;
                    }
                    if !graph.has_dependency_edge(
                        file_id,
                        &target_id,
                        repograph_core::DependencyType::Import,
                    ) {
                        graph.add_dependency_edge(
                            file_id,
                            &target_id,
                            repograph_core::DependencyType::Import,
                            Some(import.line),
                        )?;
                    }
                    break;
                }
            }
        }

        tracing::info!(
            files = files.len(),
            nodes = graph.stats().node_count,
            "initial encoding complete"
        );
        Ok(graph)
    }

    /// Ensure directory nodes for every ancestor of `relative`, returning
    /// the immediate parent directory's node ID (None for root-level files).
    fn ensure_directories(
        &self,
        graph: &mut RepoGraph,
        relative: &str,
        extractor: &mut SemanticExtractor,
    ) -> Result<Option<String>, RpgError> {
        let Some((dir_path, _)) = relative.rsplit_once('/') else {
            return Ok(None);
        };

        let mut parent: Option<String> = None;
        let mut prefix = String::new();
        for component in dir_path.split('/') {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(component);

            let id = repograph_core::ids::dir_id(&prefix);
            if !graph.has_node(&id) {
                let feature = extractor.extract(&ExtractInput {
                    kind: EntityKind::Module,
                    name: component,
                    file_path: &prefix,
                    source: None,
                    parent_qualified_name: None,
                });
                graph.add_directory_node(&prefix, feature)?;
                if let Some(parent_id) = &parent {
                    graph.add_functional_edge(parent_id, &id, None, None)?;
                }
            }
            parent = Some(id);
        }
        Ok(parent)
    }

    fn encode_file(
        &self,
        graph: &mut RepoGraph,
        relative: &str,
        content: &str,
        parent_dir: Option<&str>,
        extractor: &mut SemanticExtractor,
        include_source: bool,
    ) -> Result<String, RpgError> {
        let file_name = relative.rsplit('/').next().unwrap_or(relative);
        let feature = extractor.extract(&ExtractInput {
            kind: EntityKind::File,
            name: file_name,
            file_path: relative,
            source: Some(content),
            parent_qualified_name: None,
        });
        let file_id = graph.add_low_level_node(
            StructuralMetadata {
                file_path: relative.to_string(),
                entity_kind: EntityKind::File,
                qualified_name: relative.to_string(),
                start_line: None,
                end_line: None,
            },
            feature,
            include_source.then(|| content.to_string()),
            false,
        )?;
        if let Some(parent_id) = parent_dir {
            graph.add_functional_edge(parent_id, &file_id, None, None)?;
        }
        Ok(file_id)
    }

    /// Encode probed entities under their file, nesting methods under their
    /// enclosing class when it was emitted earlier in source order.
    fn encode_entities(
        &self,
        graph: &mut RepoGraph,
        relative: &str,
        entities: &[repograph_syntax::EntityDescriptor],
        file_id: &str,
        extractor: &mut SemanticExtractor,
    ) -> Result<(), RpgError> {
        let mut by_qualified: BTreeMap<String, String> = BTreeMap::new();
        for descriptor in entities {
            let feature = extractor.extract(&ExtractInput {
                kind: descriptor.kind,
                name: &descriptor.name,
                file_path: relative,
                source: Some(&descriptor.source),
                parent_qualified_name: descriptor
                    .qualified_name
                    .rsplit_once('.')
                    .map(|(prefix, _)| prefix),
            });
            let id = match graph.add_low_level_node(
                StructuralMetadata {
                    file_path: relative.to_string(),
                    entity_kind: descriptor.kind,
                    qualified_name: descriptor.qualified_name.clone(),
                    start_line: Some(descriptor.start_line),
                    end_line: Some(descriptor.end_line),
                },
                feature,
                None,
                true,
            ) {
                Ok(id) => id,
                Err(RpgError::Invariant(msg)) => {
                    // Duplicate qualified names (overloads) keep the first.
                    tracing::debug!(entity = %descriptor.qualified_name, "skipped: {msg}");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let parent_id = descriptor
                .qualified_name
                .rsplit_once('.')
                .and_then(|(prefix, _)| by_qualified.get(prefix).cloned())
                .unwrap_or_else(|| file_id.to_string());
            graph.add_functional_edge(&parent_id, &id, None, None)?;
            by_qualified.insert(descriptor.qualified_name.clone(), id);
        }
        Ok(())
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}
