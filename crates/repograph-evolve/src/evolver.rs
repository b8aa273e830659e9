//! The evolution engine: reconciles a planning graph against a commit range.
//!
//! Schedule is strictly Delete → Modify → Insert. Deletions first clear
//! stale structure so re-routing and parent search see a clean hierarchy;
//! modifications precede insertions so a rerouted entity is never shadowed
//! by a freshly inserted duplicate. Entities within a stage process in
//! ID-ascending order.

use crate::diff::{ChangedEntity, DiffParser, DiffResult};
use crate::imports;
use crate::vcs::GitProbe;
use repograph_core::{
    ids, DependencyType, Describer, Embedder, EntityKind, Node, RpgError, SemanticFeature,
    StructuralMetadata,
};
use repograph_graph::RepoGraph;
use repograph_semantic::{
    cosine, set_jaccard, text_jaccard, ExtractInput, SemanticCache, SemanticExtractor,
    SemanticRouter,
};
use repograph_syntax::SyntaxProbe;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Tuning for one evolution pass.
#[derive(Clone)]
pub struct EvolutionOptions {
    pub repo_path: PathBuf,
    pub commit_range: String,
    /// Reroute when drift is strictly greater than this.
    pub drift_threshold: f64,
    /// Gate on the configured Describer (extraction + arbitration).
    pub use_llm: bool,
    /// Keep entity source text on the graph nodes.
    pub include_source: bool,
    /// Persistent semantic cache location; `None` disables persistence.
    pub cache_path: Option<PathBuf>,
    /// Checked between entities; a set flag stops the pass cleanly.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl EvolutionOptions {
    pub fn new(repo_path: impl Into<PathBuf>, commit_range: impl Into<String>) -> Self {
        Self {
            repo_path: repo_path.into(),
            commit_range: commit_range.into(),
            drift_threshold: 0.4,
            use_llm: false,
            include_source: false,
            cache_path: None,
            cancel: None,
        }
    }
}

/// Counters for one completed (or cancelled) pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvolutionReport {
    pub inserted: usize,
    pub deleted: usize,
    pub modified: usize,
    pub rerouted: usize,
    pub pruned_nodes: usize,
    pub llm_calls: u64,
    pub duration_ms: u64,
}

pub struct Evolver {
    probe: SyntaxProbe,
    vcs: GitProbe,
    describer: Option<Arc<dyn Describer>>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl Evolver {
    pub fn new(
        vcs: GitProbe,
        describer: Option<Arc<dyn Describer>>,
        embedder: Option<Arc<dyn Embedder>>,
    ) -> Self {
        Self {
            probe: SyntaxProbe::new(),
            vcs,
            describer,
            embedder,
        }
    }

    /// Fully offline evolver.
    pub fn offline(vcs: GitProbe) -> Self {
        Self::new(vcs, None, None)
    }

    /// Run one evolution pass: parse the diff for the commit range, then
    /// apply it to `graph`.
    pub fn evolve(
        &self,
        graph: &mut RepoGraph,
        options: &EvolutionOptions,
    ) -> Result<EvolutionReport, RpgError> {
        let started = Instant::now();
        if options.commit_range.trim().is_empty() {
            return Ok(EvolutionReport {
                duration_ms: started.elapsed().as_millis() as u64,
                ..Default::default()
            });
        }

        let diff =
            DiffParser::new(&self.probe, &self.vcs).parse(&options.repo_path, &options.commit_range)?;
        let mut report = self.apply_diff(graph, diff, options)?;
        report.duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            inserted = report.inserted,
            deleted = report.deleted,
            modified = report.modified,
            rerouted = report.rerouted,
            pruned = report.pruned_nodes,
            "evolution pass complete"
        );
        Ok(report)
    }

    /// Apply a pre-computed diff. Exposed separately so the schedule is
    /// testable without a live repository.
    pub fn apply_diff(
        &self,
        graph: &mut RepoGraph,
        diff: DiffResult,
        options: &EvolutionOptions,
    ) -> Result<EvolutionReport, RpgError> {
        let describer = if options.use_llm {
            self.describer.clone()
        } else {
            None
        };
        let cache = options
            .cache_path
            .clone()
            .map(SemanticCache::new)
            .unwrap_or_else(SemanticCache::disabled);
        let mut extractor = SemanticExtractor::new(describer.clone(), cache);
        let mut router = SemanticRouter::new(self.embedder.clone(), describer);

        let mut report = EvolutionReport::default();

        // ── Stage 1: deletions ──────────────────────────────────────────
        let mut deletions = diff.deletions;
        deletions.sort_by(|a, b| a.id.cmp(&b.id));
        for entity in &deletions {
            if cancelled(options) {
                return Ok(report);
            }
            match self.delete_entity(graph, &entity.id) {
                Ok(Some(pruned)) => {
                    report.deleted += 1;
                    report.pruned_nodes += pruned;
                }
                Ok(None) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => tracing::warn!(id = %entity.id, "delete failed: {e}"),
            }
        }

        // ── Stage 2: modifications ──────────────────────────────────────
        let mut modifications = diff.modifications;
        modifications.sort_by(|a, b| a.old.id.cmp(&b.old.id));
        for pair in &modifications {
            if cancelled(options) {
                return Ok(report);
            }
            let outcome = self.modify_entity(
                graph,
                pair,
                options,
                &mut extractor,
                &mut router,
                &mut report,
            );
            match outcome {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => tracing::warn!(id = %pair.old.id, "modify failed: {e}"),
            }
        }

        // ── Stage 3: insertions ─────────────────────────────────────────
        let mut insertions = diff.insertions;
        insertions.sort_by(|a, b| a.id.cmp(&b.id));
        for entity in &insertions {
            if cancelled(options) {
                return Ok(report);
            }
            match self.insert_entity(graph, entity, options, &mut extractor, &mut router) {
                Ok(true) => report.inserted += 1,
                Ok(false) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => tracing::warn!(id = %entity.id, "insert failed: {e}"),
            }
        }

        report.llm_calls = extractor.llm_calls() + router.llm_calls();
        if let Err(e) = extractor.flush_cache() {
            // The cache is advisory; losing it only costs re-extraction.
            tracing::warn!("semantic cache flush failed: {e}");
        }
        Ok(report)
    }

    /// Locate a node for an evolution-produced (line-less) ID, tolerating
    /// line-suffixed IDs from initial encoding.
    fn resolve_node(&self, graph: &RepoGraph, id: &str) -> Option<String> {
        if graph.has_node(id) {
            return Some(id.to_string());
        }
        graph
            .low_level_nodes()
            .into_iter()
            .map(|n| n.id)
            .find(|candidate| ids::matches_prefix(candidate, id))
    }

    /// Idempotent delete with recursive orphan pruning. `Ok(None)` means the
    /// node was already absent.
    fn delete_entity(&self, graph: &mut RepoGraph, id: &str) -> Result<Option<usize>, RpgError> {
        let Some(resolved) = self.resolve_node(graph, id) else {
            tracing::debug!(id, "delete target absent, skipping");
            return Ok(None);
        };

        let mut ancestor = graph.parent(&resolved).map(|n| n.id().to_string());
        graph.remove_node(&resolved)?;

        // Walk upward pruning high-level nodes that just lost their last
        // child.
        let mut pruned = 0usize;
        while let Some(current) = ancestor {
            let Some(node) = graph.node(&current) else {
                break;
            };
            if !node.is_high_level() || !graph.children(&current).is_empty() {
                break;
            }
            ancestor = graph.parent(&current).map(|n| n.id().to_string());
            graph.remove_node(&current)?;
            pruned += 1;
        }
        Ok(Some(pruned))
    }

    fn modify_entity(
        &self,
        graph: &mut RepoGraph,
        pair: &crate::diff::Modification,
        options: &EvolutionOptions,
        extractor: &mut SemanticExtractor,
        router: &mut SemanticRouter,
        report: &mut EvolutionReport,
    ) -> Result<(), RpgError> {
        let Some(resolved) = self.resolve_node(graph, &pair.old.id) else {
            // Unknown to the graph: treat as an insertion.
            if self.insert_entity(graph, &pair.new, options, extractor, router)? {
                report.inserted += 1;
            }
            return Ok(());
        };

        let Some(Node::LowLevel(existing)) = graph.node(&resolved) else {
            return Err(RpgError::Invariant(format!(
                "modification target is not a low-level node: {resolved}"
            )));
        };

        let new_feature = extractor.extract(&extract_input(&pair.new));
        let drift = self.compute_drift(&existing.feature, &new_feature);

        if drift > options.drift_threshold {
            tracing::debug!(id = %resolved, drift, "drift above threshold, rerouting");
            if let Some(pruned) = self.delete_entity(graph, &resolved)? {
                report.pruned_nodes += pruned;
            }
            self.insert_entity(graph, &pair.new, options, extractor, router)?;
            report.rerouted += 1;
        } else {
            let mut updated = existing;
            updated.feature = new_feature;
            updated.metadata = metadata_of(&pair.new);
            updated.source = if options.include_source {
                pair.new.source.clone()
            } else {
                None
            };
            graph.update_node(Node::LowLevel(updated))?;
            report.modified += 1;
        }
        Ok(())
    }

    /// Normalized semantic distance between the stored and re-extracted
    /// feature: embedding cosine when available, keyword Jaccard otherwise,
    /// description Jaccard when both keyword sets are empty.
    fn compute_drift(&self, old: &SemanticFeature, new: &SemanticFeature) -> f64 {
        if let Some(embedder) = &self.embedder {
            match (
                embedder.embed(old.description()),
                embedder.embed(new.description()),
            ) {
                (Ok(a), Ok(b)) => return (1.0 - cosine(&a, &b)).clamp(0.0, 1.0),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::warn!("embedder failed during drift, using keyword overlap: {e}");
                }
            }
        }

        let old_keywords: BTreeSet<String> =
            old.keywords().iter().map(|k| k.to_lowercase()).collect();
        let new_keywords: BTreeSet<String> =
            new.keywords().iter().map(|k| k.to_lowercase()).collect();

        if old_keywords.is_empty() && new_keywords.is_empty() {
            return (1.0 - text_jaccard(old.description(), new.description())).clamp(0.0, 1.0);
        }
        (1.0 - set_jaccard(&old_keywords, &new_keywords)).clamp(0.0, 1.0)
    }

    /// Insert one entity: extract, route to a parent, attach, and inject
    /// import dependency edges for file-level entities. Returns `false` when
    /// the entity already exists.
    fn insert_entity(
        &self,
        graph: &mut RepoGraph,
        entity: &ChangedEntity,
        options: &EvolutionOptions,
        extractor: &mut SemanticExtractor,
        router: &mut SemanticRouter,
    ) -> Result<bool, RpgError> {
        if self.resolve_node(graph, &entity.id).is_some() {
            tracing::debug!(id = %entity.id, "insert target already present, skipping");
            return Ok(false);
        }

        let feature = extractor.extract(&extract_input(entity));

        let parents: Vec<(String, String)> = graph
            .high_level_nodes()
            .into_iter()
            .map(|h| (h.id, h.feature.description().to_string()))
            .collect();
        let parent = router.find_best_parent(&parents, feature.description());

        let source = if options.include_source {
            entity.source.clone()
        } else {
            None
        };
        let id = graph.add_low_level_node(metadata_of(entity), feature, source, false)?;

        if let Some(parent_id) = parent {
            if let Err(e) = graph.add_functional_edge(&parent_id, &id, None, None) {
                // A node without its hierarchy edge would leak; revert it.
                let _ = graph.remove_node(&id);
                return Err(e);
            }
        }

        if entity.entity_kind == EntityKind::File {
            self.inject_import_edges(graph, entity, &id);
        }
        Ok(true)
    }

    /// For each relative import of a newly inserted file, add an import
    /// dependency edge when the resolved target exists in the graph.
    /// Pre-existing edges and self-edges are silently ignored.
    fn inject_import_edges(&self, graph: &mut RepoGraph, entity: &ChangedEntity, id: &str) {
        for import in &entity.imports {
            let Some(resolved) = imports::resolve_relative(&entity.file_path, &import.module)
            else {
                continue;
            };
            for target_id in imports::candidate_file_ids(&resolved) {
                if target_id == id || !graph.has_node(&target_id) {
                    continue;
                }
                if !graph.has_dependency_edge(id, &target_id, DependencyType::Import) {
                    if let Err(e) = graph.add_dependency_edge(
                        id,
                        &target_id,
                        DependencyType::Import,
                        Some(import.line),
                    ) {
                        tracing::warn!(source = id, target = %target_id, "import edge failed: {e}");
                    }
                }
                break;
            }
        }
    }
}

fn cancelled(options: &EvolutionOptions) -> bool {
    options
        .cancel
        .as_ref()
        .is_some_and(|flag| flag.load(Ordering::Relaxed))
}

fn extract_input(entity: &ChangedEntity) -> ExtractInput<'_> {
    ExtractInput {
        kind: entity.entity_kind,
        name: &entity.name,
        file_path: &entity.file_path,
        source: entity.source.as_deref(),
        parent_qualified_name: None,
    }
}

fn metadata_of(entity: &ChangedEntity) -> StructuralMetadata {
    StructuralMetadata {
        file_path: entity.file_path.clone(),
        entity_kind: entity.entity_kind,
        qualified_name: entity.qualified_name.clone(),
        start_line: entity.start_line,
        end_line: entity.end_line,
    }
}
