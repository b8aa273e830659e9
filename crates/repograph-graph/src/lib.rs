//! repograph-graph: planning-graph store, typed facade, and JSON persistence.
//!
//! The facade is the only mutation surface the rest of the system uses; it
//! enforces invariants at the API boundary and delegates storage to any
//! `GraphStore` implementation (the in-memory reference store by default).

mod serialize;
mod store;

pub use serialize::{load_graph, save_graph};
pub use store::MemoryGraphStore;

use repograph_core::{
    ids, DependencyEdge, DependencyType, Edge, EdgeKind, EntityKind, FunctionalEdge,
    GraphEnvelope, GraphMeta, GraphStore, HighLevelNode, LowLevelNode, Node, RpgError,
    SemanticFeature, StoreStats, StructuralMetadata,
};

/// Typed wrapper over a `GraphStore`.
pub struct RepoGraph {
    store: Box<dyn GraphStore>,
    meta: GraphMeta,
}

impl std::fmt::Debug for RepoGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoGraph").field("meta", &self.meta).finish()
    }
}

impl RepoGraph {
    /// Create an empty graph over the in-memory reference store.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            store: Box::new(MemoryGraphStore::new()),
            meta: GraphMeta {
                name: name.into(),
                root_path: None,
                description: None,
            },
        }
    }

    /// Create an empty graph over a caller-supplied store.
    pub fn with_store(store: Box<dyn GraphStore>, meta: GraphMeta) -> Self {
        Self { store, meta }
    }

    pub fn meta(&self) -> &GraphMeta {
        &self.meta
    }

    pub fn set_root_path(&mut self, root: impl Into<String>) {
        self.meta.root_path = Some(root.into());
    }

    // ── Typed factories ─────────────────────────────────────────────────

    /// Add an architectural node with an explicit ID.
    pub fn add_high_level_node(
        &mut self,
        id: impl Into<String>,
        feature: SemanticFeature,
        directory_path: Option<String>,
    ) -> Result<String, RpgError> {
        let id = id.into();
        self.store.add_node(Node::HighLevel(HighLevelNode {
            id: id.clone(),
            feature,
            directory_path,
        }))?;
        Ok(id)
    }

    /// Add a directory node; the canonical `<path>:dir` ID is derived here.
    pub fn add_directory_node(
        &mut self,
        directory_path: &str,
        feature: SemanticFeature,
    ) -> Result<String, RpgError> {
        let id = ids::dir_id(directory_path);
        self.add_high_level_node(id, feature, Some(directory_path.to_string()))
    }

    /// Add an implementation node. The canonical ID is derived from the
    /// metadata; pass `with_line = true` only during initial encoding.
    pub fn add_low_level_node(
        &mut self,
        metadata: StructuralMetadata,
        feature: SemanticFeature,
        source: Option<String>,
        with_line: bool,
    ) -> Result<String, RpgError> {
        let id = match (with_line, metadata.start_line) {
            (true, Some(line)) => ids::entity_id_with_line(
                &metadata.file_path,
                metadata.entity_kind,
                &metadata.qualified_name,
                line,
            ),
            _ => ids::entity_id(
                &metadata.file_path,
                metadata.entity_kind,
                &metadata.qualified_name,
            ),
        };
        self.store.add_node(Node::LowLevel(LowLevelNode {
            id: id.clone(),
            feature,
            metadata,
            source,
        }))?;
        Ok(id)
    }

    pub fn add_functional_edge(
        &mut self,
        parent: &str,
        child: &str,
        level: Option<u32>,
        sibling_order: Option<u32>,
    ) -> Result<(), RpgError> {
        self.check_directory_consistency(parent, child)?;
        self.store.add_edge(Edge::Functional(FunctionalEdge {
            source: parent.to_string(),
            target: child.to_string(),
            level,
            sibling_order,
        }))
    }

    /// A file node's qualified name is its path, so it must sit inside every
    /// ancestor directory it is attached under. Other entity kinds carry
    /// code-scope names that no high-level node mirrors, and semantic
    /// routing may group them by theme, so they are exempt.
    fn check_directory_consistency(&self, parent: &str, child: &str) -> Result<(), RpgError> {
        let Some(Node::LowLevel(node)) = self.store.get_node(child) else {
            return Ok(());
        };
        if node.metadata.entity_kind != EntityKind::File {
            return Ok(());
        }

        let mut current = Some(parent.to_string());
        while let Some(id) = current {
            let Some(ancestor) = self.store.get_node(&id) else {
                break;
            };
            if let Node::HighLevel(high) = &ancestor {
                if let Some(dir) = high.directory_path.as_deref() {
                    let contained = node
                        .metadata
                        .file_path
                        .strip_prefix(dir)
                        .is_some_and(|rest| rest.starts_with('/'));
                    if !contained {
                        return Err(RpgError::Invariant(format!(
                            "file {} is not under ancestor directory {}",
                            node.metadata.file_path, dir
                        )));
                    }
                }
            }
            current = self.store.parent(&id).map(|n| n.id().to_string());
        }
        Ok(())
    }

    pub fn add_dependency_edge(
        &mut self,
        source: &str,
        target: &str,
        dependency_type: DependencyType,
        line: Option<u32>,
    ) -> Result<(), RpgError> {
        self.store.add_edge(Edge::Dependency(DependencyEdge {
            source: source.to_string(),
            target: target.to_string(),
            dependency_type,
            is_runtime: None,
            line,
        }))
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn has_node(&self, id: &str) -> bool {
        self.store.has_node(id)
    }

    pub fn node(&self, id: &str) -> Option<Node> {
        self.store.get_node(id)
    }

    /// All architectural nodes, ID-ascending.
    pub fn high_level_nodes(&self) -> Vec<HighLevelNode> {
        self.store
            .all_nodes()
            .into_iter()
            .filter_map(|n| match n {
                Node::HighLevel(h) => Some(h),
                Node::LowLevel(_) => None,
            })
            .collect()
    }

    pub fn low_level_nodes(&self) -> Vec<LowLevelNode> {
        self.store
            .all_nodes()
            .into_iter()
            .filter_map(|n| match n {
                Node::LowLevel(l) => Some(l),
                Node::HighLevel(_) => None,
            })
            .collect()
    }

    pub fn children(&self, id: &str) -> Vec<Node> {
        self.store.children(id)
    }

    pub fn parent(&self, id: &str) -> Option<Node> {
        self.store.parent(id)
    }

    pub fn dependencies(&self, id: &str) -> Vec<Node> {
        self.store.dependencies(id)
    }

    pub fn dependents(&self, id: &str) -> Vec<Node> {
        self.store.dependents(id)
    }

    pub fn out_edges(&self, id: &str, kind: Option<EdgeKind>) -> Vec<Edge> {
        self.store.out_edges(id, kind)
    }

    pub fn in_edges(&self, id: &str, kind: Option<EdgeKind>) -> Vec<Edge> {
        self.store.in_edges(id, kind)
    }

    pub fn topological_order(&self) -> Vec<String> {
        self.store.topological_order()
    }

    pub fn search_by_feature(&self, query: &str) -> Vec<(String, f64)> {
        self.store.search_by_feature(query)
    }

    pub fn search_by_path(&self, pattern: &str) -> Result<Vec<Node>, RpgError> {
        self.store.search_by_path(pattern)
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Whether a dependency edge with this exact tuple already exists.
    pub fn has_dependency_edge(
        &self,
        source: &str,
        target: &str,
        dependency_type: DependencyType,
    ) -> bool {
        self.store
            .out_edges(source, Some(EdgeKind::Dependency))
            .iter()
            .any(|e| match e {
                Edge::Dependency(d) => {
                    d.target == target && d.dependency_type == dependency_type
                }
                Edge::Functional(_) => false,
            })
    }

    // ── Mutation ────────────────────────────────────────────────────────

    /// Replace a node's payload in place. Missing IDs are an error; the
    /// facade never silently ignores a bad mutation.
    pub fn update_node(&mut self, node: Node) -> Result<(), RpgError> {
        self.store.update_node(node)
    }

    /// Remove a node, cascading every incident edge. Returns the number of
    /// edges removed.
    pub fn remove_node(&mut self, id: &str) -> Result<usize, RpgError> {
        self.store.remove_node(id)
    }

    pub fn close(&mut self) -> Result<(), RpgError> {
        self.store.close()
    }

    // ── Serialization ───────────────────────────────────────────────────

    pub fn to_envelope(&self) -> GraphEnvelope {
        self.store.export_envelope(self.meta.clone())
    }

    pub fn from_envelope(envelope: GraphEnvelope) -> Result<Self, RpgError> {
        let mut store = MemoryGraphStore::new();
        let meta = store.import_envelope(envelope)?;
        Ok(Self {
            store: Box::new(store),
            meta,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repograph_core::EntityKind;

    fn feature(desc: &str) -> SemanticFeature {
        SemanticFeature::new(desc, vec![], None).unwrap()
    }

    fn meta_for(path: &str, name: &str) -> StructuralMetadata {
        StructuralMetadata {
            file_path: path.to_string(),
            entity_kind: EntityKind::Function,
            qualified_name: name.to_string(),
            start_line: Some(4),
            end_line: Some(9),
        }
    }

    #[test]
    fn factories_build_canonical_ids() {
        let mut graph = RepoGraph::new("demo");
        let dir = graph
            .add_directory_node("src", feature("source root"))
            .unwrap();
        assert_eq!(dir, "src:dir");

        let id = graph
            .add_low_level_node(meta_for("src/a.ts", "foo"), feature("foo fn"), None, false)
            .unwrap();
        assert_eq!(id, "src/a.ts:function:foo");

        let with_line = graph
            .add_low_level_node(meta_for("src/a.ts", "bar"), feature("bar fn"), None, true)
            .unwrap();
        assert_eq!(with_line, "src/a.ts:function:bar:4");
    }

    #[test]
    fn duplicate_insert_rejected_at_facade() {
        let mut graph = RepoGraph::new("demo");
        graph
            .add_low_level_node(meta_for("a.ts", "f"), feature("f"), None, false)
            .unwrap();
        let err = graph
            .add_low_level_node(meta_for("a.ts", "f"), feature("f2"), None, false)
            .unwrap_err();
        assert!(matches!(err, RpgError::Invariant(_)));
    }

    #[test]
    fn update_preserves_edges() {
        let mut graph = RepoGraph::new("demo");
        graph
            .add_directory_node("src", feature("source root"))
            .unwrap();
        let id = graph
            .add_low_level_node(meta_for("src/a.ts", "f"), feature("old"), None, false)
            .unwrap();
        graph
            .add_functional_edge("src:dir", &id, None, None)
            .unwrap();

        let mut node = graph.node(&id).unwrap();
        if let Node::LowLevel(ref mut n) = node {
            n.feature = feature("new description");
        }
        graph.update_node(node).unwrap();

        assert_eq!(graph.parent(&id).unwrap().id(), "src:dir");
        assert_eq!(graph.node(&id).unwrap().feature().description(), "new description");
    }

    #[test]
    fn envelope_roundtrip_preserves_graph() {
        let mut graph = RepoGraph::new("demo");
        graph.set_root_path("/repo");
        graph
            .add_directory_node("src", feature("source root"))
            .unwrap();
        let a = graph
            .add_low_level_node(meta_for("src/a.ts", "a"), feature("fn a"), None, false)
            .unwrap();
        let b = graph
            .add_low_level_node(meta_for("src/b.ts", "b"), feature("fn b"), None, false)
            .unwrap();
        graph.add_functional_edge("src:dir", &a, None, None).unwrap();
        graph
            .add_dependency_edge(&a, &b, DependencyType::Import, Some(1))
            .unwrap();

        let envelope = graph.to_envelope();
        let restored = RepoGraph::from_envelope(envelope).unwrap();

        assert_eq!(restored.meta().name, "demo");
        assert_eq!(restored.meta().root_path.as_deref(), Some("/repo"));

        let mut original_nodes = graph.to_envelope().nodes;
        let mut restored_nodes = restored.to_envelope().nodes;
        original_nodes.sort_by(|x, y| x.id().cmp(y.id()));
        restored_nodes.sort_by(|x, y| x.id().cmp(y.id()));
        assert_eq!(original_nodes, restored_nodes);
        assert_eq!(graph.to_envelope().edges.len(), restored.to_envelope().edges.len());
        assert_eq!(restored.parent(&a).unwrap().id(), "src:dir");
        assert!(restored.has_dependency_edge(&a, &b, DependencyType::Import));
    }

    #[test]
    fn remove_node_via_facade_errors_on_missing() {
        let mut graph = RepoGraph::new("demo");
        assert!(graph.remove_node("nope").is_err());
    }

    fn file_meta(path: &str) -> StructuralMetadata {
        StructuralMetadata {
            file_path: path.to_string(),
            entity_kind: EntityKind::File,
            qualified_name: path.to_string(),
            start_line: None,
            end_line: None,
        }
    }

    #[test]
    fn file_must_sit_under_its_directory_parent() {
        let mut graph = RepoGraph::new("demo");
        graph
            .add_directory_node("src", feature("source root"))
            .unwrap();
        graph
            .add_directory_node("docs", feature("documentation"))
            .unwrap();
        let file = graph
            .add_low_level_node(file_meta("src/a.ts"), feature("file a"), None, false)
            .unwrap();

        let err = graph
            .add_functional_edge("docs:dir", &file, None, None)
            .unwrap_err();
        assert!(matches!(err, RpgError::Invariant(_)));
        // The rejected edge left nothing behind.
        assert!(graph.parent(&file).is_none());

        graph
            .add_functional_edge("src:dir", &file, None, None)
            .unwrap();
        assert_eq!(graph.parent(&file).unwrap().id(), "src:dir");
    }

    #[test]
    fn file_checks_the_whole_ancestor_chain() {
        let mut graph = RepoGraph::new("demo");
        graph
            .add_directory_node("src", feature("source root"))
            .unwrap();
        graph
            .add_directory_node("src/inner", feature("inner module"))
            .unwrap();
        graph
            .add_functional_edge("src:dir", "src/inner:dir", None, None)
            .unwrap();

        let good = graph
            .add_low_level_node(file_meta("src/inner/x.ts"), feature("file x"), None, false)
            .unwrap();
        graph
            .add_functional_edge("src/inner:dir", &good, None, None)
            .unwrap();

        // "src/other/y.ts" is under "src" but not under "src/inner".
        let bad = graph
            .add_low_level_node(file_meta("src/other/y.ts"), feature("file y"), None, false)
            .unwrap();
        let err = graph
            .add_functional_edge("src/inner:dir", &bad, None, None)
            .unwrap_err();
        assert!(matches!(err, RpgError::Invariant(_)));
    }

    #[test]
    fn non_file_entities_may_group_by_theme() {
        // Semantic routing can re-parent functions anywhere; the path check
        // binds only file nodes, whose qualified name is the path itself.
        let mut graph = RepoGraph::new("demo");
        graph
            .add_directory_node("routing", feature("request routing"))
            .unwrap();
        let func = graph
            .add_low_level_node(
                meta_for("src/handlers.ts", "dispatch"),
                feature("dispatches requests"),
                None,
                false,
            )
            .unwrap();
        graph
            .add_functional_edge("routing:dir", &func, None, None)
            .unwrap();
        assert_eq!(graph.parent(&func).unwrap().id(), "routing:dir");
    }
}
