//! In-memory reference implementation of the `GraphStore` interface.
//!
//! Nodes live in an ID-indexed arena; a petgraph `DiGraph` mirrors the
//! adjacency so hierarchy and dependency queries stay index-based. Edges
//! reference IDs, never direct handles, so dependency cycles are
//! representable without ownership knots.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use repograph_core::{Edge, EdgeKind, GraphStore, Node, RpgError, StoreStats};
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub struct MemoryGraphStore {
    graph: DiGraph<String, EdgeKind>,
    id_to_index: HashMap<String, NodeIndex>,
    nodes: BTreeMap<String, Node>,
    /// Edge payloads keyed by a composed uniqueness key; BTreeMap keeps
    /// enumeration deterministic.
    edges: BTreeMap<String, Edge>,
}

fn edge_key(edge: &Edge) -> String {
    match edge {
        Edge::Functional(e) => format!("f:{}->{}", e.source, e.target),
        Edge::Dependency(e) => {
            format!("d:{}:{}->{}", e.dependency_type, e.source, e.target)
        }
    }
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            id_to_index: HashMap::new(),
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
        }
    }

    fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.id_to_index.get(id).copied()
    }

    /// Functional parent ID of `id`, if any.
    fn parent_id(&self, id: &str) -> Option<String> {
        let idx = self.index_of(id)?;
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .find(|e| *e.weight() == EdgeKind::Functional)
            .and_then(|e| self.graph.node_weight(e.source()).cloned())
    }

    /// Whether making `parent -> child` functional would close a cycle in
    /// the hierarchy. Since every node has at most one parent, walking the
    /// parent chain upward from `parent` suffices.
    fn would_cycle(&self, parent: &str, child: &str) -> bool {
        let mut current = parent.to_string();
        loop {
            if current == child {
                return true;
            }
            match self.parent_id(&current) {
                Some(next) => current = next,
                None => return false,
            }
        }
    }

    fn check_edge(&self, edge: &Edge) -> Result<(), RpgError> {
        let (source, target) = (edge.source(), edge.target());
        if !self.nodes.contains_key(source) {
            return Err(RpgError::Invariant(format!(
                "edge source does not exist: {source}"
            )));
        }
        if !self.nodes.contains_key(target) {
            return Err(RpgError::Invariant(format!(
                "edge target does not exist: {target}"
            )));
        }
        if self.edges.contains_key(&edge_key(edge)) {
            return Err(RpgError::Invariant(format!(
                "duplicate edge: {source} -> {target}"
            )));
        }
        match edge {
            Edge::Functional(e) => {
                let has_parent = self
                    .index_of(&e.target)
                    .map(|idx| {
                        self.graph
                            .edges_directed(idx, Direction::Incoming)
                            .any(|er| *er.weight() == EdgeKind::Functional)
                    })
                    .unwrap_or(false);
                if has_parent {
                    return Err(RpgError::Invariant(format!(
                        "node already has a parent: {}",
                        e.target
                    )));
                }
                if self.would_cycle(&e.source, &e.target) {
                    return Err(RpgError::Invariant(format!(
                        "functional edge would create a cycle: {} -> {}",
                        e.source, e.target
                    )));
                }
            }
            Edge::Dependency(e) => {
                if e.source == e.target {
                    return Err(RpgError::Invariant(format!(
                        "dependency self-loop: {}",
                        e.source
                    )));
                }
            }
        }
        Ok(())
    }

    fn neighbor_ids(&self, id: &str, direction: Direction, kind: EdgeKind) -> Vec<String> {
        let Some(idx) = self.index_of(id) else {
            return Vec::new();
        };
        let mut ids: Vec<String> = self
            .graph
            .edges_directed(idx, direction)
            .filter(|e| *e.weight() == kind)
            .filter_map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                self.graph.node_weight(other).cloned()
            })
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    fn nodes_for_ids(&self, ids: Vec<String>) -> Vec<Node> {
        ids.iter()
            .filter_map(|id| self.nodes.get(id).cloned())
            .collect()
    }
}

impl Default for MemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore for MemoryGraphStore {
    fn add_node(&mut self, node: Node) -> Result<(), RpgError> {
        let id = node.id().to_string();
        if self.nodes.contains_key(&id) {
            return Err(RpgError::Invariant(format!("duplicate node ID: {id}")));
        }
        let idx = self.graph.add_node(id.clone());
        self.id_to_index.insert(id.clone(), idx);
        self.nodes.insert(id, node);
        Ok(())
    }

    fn has_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    fn get_node(&self, id: &str) -> Option<Node> {
        self.nodes.get(id).cloned()
    }

    fn update_node(&mut self, node: Node) -> Result<(), RpgError> {
        let id = node.id().to_string();
        if !self.nodes.contains_key(&id) {
            return Err(RpgError::Invariant(format!(
                "cannot update missing node: {id}"
            )));
        }
        self.nodes.insert(id, node);
        Ok(())
    }

    fn remove_node(&mut self, id: &str) -> Result<usize, RpgError> {
        let idx = self
            .index_of(id)
            .ok_or_else(|| RpgError::Invariant(format!("cannot remove missing node: {id}")))?;

        let incident: Vec<String> = self
            .edges
            .iter()
            .filter(|(_, e)| e.source() == id || e.target() == id)
            .map(|(k, _)| k.clone())
            .collect();
        let removed = incident.len();
        for key in incident {
            self.edges.remove(&key);
        }

        // petgraph swap-removes: the node that held the last index now holds
        // `idx`, so its map entry must be rewritten.
        self.graph.remove_node(idx);
        if let Some(moved) = self.graph.node_weight(idx) {
            self.id_to_index.insert(moved.clone(), idx);
        }
        self.id_to_index.remove(id);
        self.nodes.remove(id);
        Ok(removed)
    }

    fn add_edge(&mut self, edge: Edge) -> Result<(), RpgError> {
        self.check_edge(&edge)?;
        // Checks passed; all three mutations below are infallible, so the
        // operation is atomic with respect to observable state.
        let source = self.id_to_index[edge.source()];
        let target = self.id_to_index[edge.target()];
        self.graph.add_edge(source, target, edge.kind());
        self.edges.insert(edge_key(&edge), edge);
        Ok(())
    }

    fn out_edges(&self, id: &str, kind: Option<EdgeKind>) -> Vec<Edge> {
        self.edges
            .values()
            .filter(|e| e.source() == id && kind.map_or(true, |k| e.kind() == k))
            .cloned()
            .collect()
    }

    fn in_edges(&self, id: &str, kind: Option<EdgeKind>) -> Vec<Edge> {
        self.edges
            .values()
            .filter(|e| e.target() == id && kind.map_or(true, |k| e.kind() == k))
            .cloned()
            .collect()
    }

    fn children(&self, id: &str) -> Vec<Node> {
        let ids = self.neighbor_ids(id, Direction::Outgoing, EdgeKind::Functional);
        self.nodes_for_ids(ids)
    }

    fn parent(&self, id: &str) -> Option<Node> {
        self.parent_id(id).and_then(|pid| self.nodes.get(&pid).cloned())
    }

    fn dependencies(&self, id: &str) -> Vec<Node> {
        let ids = self.neighbor_ids(id, Direction::Outgoing, EdgeKind::Dependency);
        self.nodes_for_ids(ids)
    }

    fn dependents(&self, id: &str) -> Vec<Node> {
        let ids = self.neighbor_ids(id, Direction::Incoming, EdgeKind::Dependency);
        self.nodes_for_ids(ids)
    }

    fn topological_order(&self) -> Vec<String> {
        // Kahn over dependency edges, dependencies first. A node is ready
        // once all its dependency targets are emitted; ties and cycle breaks
        // always pick the smallest remaining ID.
        let mut pending: HashMap<&str, usize> = HashMap::new();
        let mut dependents_of: HashMap<&str, Vec<&str>> = HashMap::new();
        for id in self.nodes.keys() {
            pending.insert(id, 0);
        }
        for edge in self.edges.values() {
            if let Edge::Dependency(e) = edge {
                *pending.entry(e.source.as_str()).or_insert(0) += 1;
                dependents_of
                    .entry(e.target.as_str())
                    .or_default()
                    .push(e.source.as_str());
            }
        }

        let mut ready: BTreeSet<&str> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut remaining: BTreeSet<&str> = pending
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(id, _)| *id)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while order.len() < self.nodes.len() {
            let next = match ready.pop_first() {
                Some(id) => id,
                // Only dependency cycles reach here; force the smallest
                // remaining ID so cycle members group deterministically.
                None => match remaining.pop_first() {
                    Some(id) => id,
                    None => break,
                },
            };
            remaining.remove(next);
            order.push(next.to_string());
            if let Some(dependents) = dependents_of.get(next) {
                for dependent in dependents {
                    if let Some(count) = pending.get_mut(dependent) {
                        if *count > 0 {
                            *count -= 1;
                            if *count == 0 && remaining.remove(dependent) {
                                ready.insert(*dependent);
                            }
                        }
                    }
                }
            }
        }
        order
    }

    fn search_by_feature(&self, query: &str) -> Vec<(String, f64)> {
        let query_tokens: BTreeSet<String> = tokenize(query);
        if query_tokens.is_empty() {
            return Vec::new();
        }
        let mut hits: Vec<(String, f64)> = self
            .nodes
            .values()
            .filter_map(|node| {
                let feature = node.feature();
                let mut tokens = tokenize(feature.description());
                for keyword in feature.keywords() {
                    tokens.insert(keyword.to_lowercase());
                }
                let overlap = query_tokens.intersection(&tokens).count();
                if overlap == 0 {
                    return None;
                }
                let score = overlap as f64 / query_tokens.len() as f64;
                Some((node.id().to_string(), score))
            })
            .collect();
        hits.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        hits
    }

    fn search_by_path(&self, pattern: &str) -> Result<Vec<Node>, RpgError> {
        let matcher = glob::Pattern::new(pattern)
            .map_err(|e| RpgError::Invariant(format!("invalid glob pattern {pattern:?}: {e}")))?;
        Ok(self
            .nodes
            .values()
            .filter(|node| match node {
                Node::LowLevel(n) => matcher.matches(&n.metadata.file_path),
                Node::HighLevel(n) => n
                    .directory_path
                    .as_deref()
                    .is_some_and(|p| matcher.matches(p)),
            })
            .cloned()
            .collect())
    }

    fn all_nodes(&self) -> Vec<Node> {
        self.nodes.values().cloned().collect()
    }

    fn all_edges(&self) -> Vec<Edge> {
        self.edges.values().cloned().collect()
    }

    fn stats(&self) -> StoreStats {
        let mut stats = StoreStats {
            node_count: self.nodes.len(),
            edge_count: self.edges.len(),
            ..Default::default()
        };
        for node in self.nodes.values() {
            match node {
                Node::HighLevel(_) => stats.high_level_count += 1,
                Node::LowLevel(n) => {
                    stats.low_level_count += 1;
                    *stats
                        .entity_kind_counts
                        .entry(n.metadata.entity_kind.to_string())
                        .or_insert(0) += 1;
                }
            }
        }
        for edge in self.edges.values() {
            if let Edge::Dependency(e) = edge {
                *stats
                    .dependency_type_counts
                    .entry(e.dependency_type.to_string())
                    .or_insert(0) += 1;
            }
        }
        stats
    }
}

fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 2)
        .map(|t| t.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use repograph_core::{
        DependencyType, EntityKind, FunctionalEdge, HighLevelNode, LowLevelNode, SemanticFeature,
        StructuralMetadata,
    };

    fn dependency_edge(source: &str, target: &str, ty: DependencyType) -> Edge {
        Edge::Dependency(repograph_core::DependencyEdge {
            source: source.to_string(),
            target: target.to_string(),
            dependency_type: ty,
            is_runtime: None,
            line: None,
        })
    }

    fn feature(desc: &str) -> SemanticFeature {
        SemanticFeature::new(desc, vec![], None).unwrap()
    }

    fn high(id: &str, desc: &str) -> Node {
        Node::HighLevel(HighLevelNode {
            id: id.to_string(),
            feature: feature(desc),
            directory_path: Some(id.trim_end_matches(":dir").to_string()),
        })
    }

    fn low(id: &str, path: &str, desc: &str) -> Node {
        Node::LowLevel(LowLevelNode {
            id: id.to_string(),
            feature: feature(desc),
            metadata: StructuralMetadata {
                file_path: path.to_string(),
                entity_kind: EntityKind::Function,
                qualified_name: "f".to_string(),
                start_line: None,
                end_line: None,
            },
            source: None,
        })
    }

    fn functional(source: &str, target: &str) -> Edge {
        Edge::Functional(FunctionalEdge {
            source: source.to_string(),
            target: target.to_string(),
            level: None,
            sibling_order: None,
        })
    }

    #[test]
    fn duplicate_node_rejected() {
        let mut store = MemoryGraphStore::new();
        store.add_node(high("a:dir", "alpha")).unwrap();
        let err = store.add_node(high("a:dir", "alpha again")).unwrap_err();
        assert!(matches!(err, RpgError::Invariant(_)));
    }

    #[test]
    fn edge_requires_endpoints() {
        let mut store = MemoryGraphStore::new();
        store.add_node(high("a:dir", "alpha")).unwrap();
        let err = store.add_edge(functional("a:dir", "missing")).unwrap_err();
        assert!(matches!(err, RpgError::Invariant(_)));
        // Failed insert leaves no partial state.
        assert!(store.all_edges().is_empty());
    }

    #[test]
    fn single_parent_enforced() {
        let mut store = MemoryGraphStore::new();
        store.add_node(high("a:dir", "alpha")).unwrap();
        store.add_node(high("b:dir", "beta")).unwrap();
        store.add_node(low("x", "x.ts", "x func")).unwrap();
        store.add_edge(functional("a:dir", "x")).unwrap();
        let err = store.add_edge(functional("b:dir", "x")).unwrap_err();
        assert!(matches!(err, RpgError::Invariant(_)));
    }

    #[test]
    fn functional_cycle_rejected() {
        let mut store = MemoryGraphStore::new();
        store.add_node(high("a:dir", "alpha")).unwrap();
        store.add_node(high("b:dir", "beta")).unwrap();
        store.add_node(high("c:dir", "gamma")).unwrap();
        store.add_edge(functional("a:dir", "b:dir")).unwrap();
        store.add_edge(functional("b:dir", "c:dir")).unwrap();
        let err = store.add_edge(functional("c:dir", "a:dir")).unwrap_err();
        assert!(matches!(err, RpgError::Invariant(_)));
    }

    #[test]
    fn dependency_self_loop_rejected() {
        let mut store = MemoryGraphStore::new();
        store.add_node(low("x", "x.ts", "x")).unwrap();
        let err = store
            .add_edge(dependency_edge("x", "x", DependencyType::Import))
            .unwrap_err();
        assert!(matches!(err, RpgError::Invariant(_)));
    }

    #[test]
    fn duplicate_dependency_rejected_but_types_distinct() {
        let mut store = MemoryGraphStore::new();
        store.add_node(low("x", "x.ts", "x")).unwrap();
        store.add_node(low("y", "y.ts", "y")).unwrap();
        store
            .add_edge(dependency_edge("x", "y", DependencyType::Import))
            .unwrap();
        assert!(store
            .add_edge(dependency_edge("x", "y", DependencyType::Import))
            .is_err());
        // Same endpoints, different type: allowed.
        store
            .add_edge(dependency_edge("x", "y", DependencyType::Call))
            .unwrap();
        assert_eq!(store.all_edges().len(), 2);
    }

    #[test]
    fn remove_cascades_edges() {
        let mut store = MemoryGraphStore::new();
        store.add_node(high("a:dir", "alpha")).unwrap();
        store.add_node(low("x", "x.ts", "x")).unwrap();
        store.add_node(low("y", "y.ts", "y")).unwrap();
        store.add_edge(functional("a:dir", "x")).unwrap();
        store
            .add_edge(dependency_edge("y", "x", DependencyType::Import))
            .unwrap();

        let removed = store.remove_node("x").unwrap();
        assert_eq!(removed, 2);
        assert!(!store.has_node("x"));
        for edge in store.all_edges() {
            assert_ne!(edge.source(), "x");
            assert_ne!(edge.target(), "x");
        }
        // Survivors are still queryable after the petgraph index swap.
        assert!(store.has_node("y"));
        assert!(store.children("a:dir").is_empty());
    }

    #[test]
    fn remove_missing_node_is_error() {
        let mut store = MemoryGraphStore::new();
        assert!(store.remove_node("ghost").is_err());
    }

    #[test]
    fn hierarchy_queries() {
        let mut store = MemoryGraphStore::new();
        store.add_node(high("a:dir", "alpha")).unwrap();
        store.add_node(low("b", "b.ts", "b")).unwrap();
        store.add_node(low("c", "c.ts", "c")).unwrap();
        store.add_edge(functional("a:dir", "c")).unwrap();
        store.add_edge(functional("a:dir", "b")).unwrap();

        let children = store.children("a:dir");
        let ids: Vec<&str> = children.iter().map(|n| n.id()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(store.parent("b").unwrap().id(), "a:dir");
        assert!(store.parent("a:dir").is_none());
    }

    #[test]
    fn dependency_queries() {
        let mut store = MemoryGraphStore::new();
        store.add_node(low("a", "a.ts", "a")).unwrap();
        store.add_node(low("b", "b.ts", "b")).unwrap();
        store
            .add_edge(dependency_edge("a", "b", DependencyType::Import))
            .unwrap();
        assert_eq!(store.dependencies("a")[0].id(), "b");
        assert_eq!(store.dependents("b")[0].id(), "a");
        assert!(store.dependencies("b").is_empty());
    }

    #[test]
    fn topological_order_dependencies_first() {
        let mut store = MemoryGraphStore::new();
        for id in ["a", "b", "c"] {
            store.add_node(low(id, &format!("{id}.ts"), id)).unwrap();
        }
        // a depends on b, b depends on c => order c, b, a
        store
            .add_edge(dependency_edge("a", "b", DependencyType::Import))
            .unwrap();
        store
            .add_edge(dependency_edge("b", "c", DependencyType::Import))
            .unwrap();
        assert_eq!(store.topological_order(), vec!["c", "b", "a"]);
    }

    #[test]
    fn topological_order_handles_cycles() {
        let mut store = MemoryGraphStore::new();
        for id in ["a", "b", "c", "d"] {
            store.add_node(low(id, &format!("{id}.ts"), id)).unwrap();
        }
        // cycle a <-> b; d depends on a; c independent
        store
            .add_edge(dependency_edge("a", "b", DependencyType::Import))
            .unwrap();
        store
            .add_edge(dependency_edge("b", "a", DependencyType::Import))
            .unwrap();
        store
            .add_edge(dependency_edge("d", "a", DependencyType::Import))
            .unwrap();

        let order = store.topological_order();
        assert_eq!(order.len(), 4);
        let pos = |id: &str| order.iter().position(|n| n == id).unwrap();
        // The acyclic edge d -> a still holds: a before d.
        assert!(pos("a") < pos("d"));
        // "c" has no dependency edges, so it drains from the ready set
        // before any cycle break happens.
        assert_eq!(order[0], "c");
        // Then the break picks the smallest cycle member, which unlocks the
        // rest: the whole order is deterministic.
        assert_eq!(order[1], "a");
        assert_eq!(order, vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn search_by_feature_ranks_overlap() {
        let mut store = MemoryGraphStore::new();
        store
            .add_node(high("net:dir", "network socket handling"))
            .unwrap();
        store
            .add_node(high("fs:dir", "filesystem path utilities"))
            .unwrap();
        let hits = store.search_by_feature("network socket");
        assert_eq!(hits[0].0, "net:dir");
        assert!(hits[0].1 > 0.9);
        assert!(store.search_by_feature("zzz").is_empty());
    }

    #[test]
    fn search_by_path_globs() {
        let mut store = MemoryGraphStore::new();
        store.add_node(low("a", "src/a.ts", "a")).unwrap();
        store.add_node(low("b", "lib/b.ts", "b")).unwrap();
        let hits = store.search_by_path("src/*.ts").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id(), "a");
        assert!(store.search_by_path("[").is_err());
    }

    #[test]
    fn stats_counts() {
        let mut store = MemoryGraphStore::new();
        store.add_node(high("a:dir", "alpha")).unwrap();
        store.add_node(low("x", "x.ts", "x")).unwrap();
        store.add_node(low("y", "y.ts", "y")).unwrap();
        store.add_edge(functional("a:dir", "x")).unwrap();
        store
            .add_edge(dependency_edge("x", "y", DependencyType::Import))
            .unwrap();

        let stats = store.stats();
        assert_eq!(stats.node_count, 3);
        assert_eq!(stats.edge_count, 2);
        assert_eq!(stats.high_level_count, 1);
        assert_eq!(stats.low_level_count, 2);
        assert_eq!(stats.entity_kind_counts["function"], 2);
        assert_eq!(stats.dependency_type_counts["import"], 1);
    }
}
