use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{Edge, EdgeKind, GraphEnvelope, GraphMeta, Node, RpgError, FORMAT_VERSION};

// ── Graph Store ─────────────────────────────────────────────────────────────

/// Statistics over a graph store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub high_level_count: usize,
    pub low_level_count: usize,
    pub entity_kind_counts: HashMap<String, usize>,
    pub dependency_type_counts: HashMap<String, usize>,
}

/// Persistence interface for planning-graph nodes and edges.
///
/// Implementations must keep every operation atomic with respect to
/// observable state: a failing `add_edge` leaves no partial mutation.
/// Enumeration order of `all_nodes`/`all_edges` is implementation-defined;
/// everything the evolver relies on is re-sorted by ID at the call site.
pub trait GraphStore: Send {
    /// Insert a node. Duplicate IDs are rejected with `RpgError::Invariant`.
    fn add_node(&mut self, node: Node) -> Result<(), RpgError>;

    fn has_node(&self, id: &str) -> bool;

    fn get_node(&self, id: &str) -> Option<Node>;

    /// Replace a node's payload in place. The ID must already exist; incident
    /// edges are preserved.
    fn update_node(&mut self, node: Node) -> Result<(), RpgError>;

    /// Remove a node and every edge incident on it (CASCADE). Returns the
    /// number of edges removed. Missing IDs are an `Invariant` error.
    fn remove_node(&mut self, id: &str) -> Result<usize, RpgError>;

    /// Insert an edge. Both endpoints must exist; functional edges must keep
    /// the hierarchy a single-parent forest; dependency self-loops and
    /// `(source, target, dependencyType)` duplicates are rejected.
    fn add_edge(&mut self, edge: Edge) -> Result<(), RpgError>;

    fn out_edges(&self, id: &str, kind: Option<EdgeKind>) -> Vec<Edge>;

    fn in_edges(&self, id: &str, kind: Option<EdgeKind>) -> Vec<Edge>;

    /// Functional children of a node, ID-ascending.
    fn children(&self, id: &str) -> Vec<Node>;

    /// Functional parent, if any (at most one by invariant).
    fn parent(&self, id: &str) -> Option<Node>;

    /// Nodes this node depends on (dependency edges out), ID-ascending.
    fn dependencies(&self, id: &str) -> Vec<Node>;

    /// Nodes depending on this node (dependency edges in), ID-ascending.
    fn dependents(&self, id: &str) -> Vec<Node>;

    /// Kahn-style order over dependency edges: dependencies precede their
    /// dependents. Cycle members are emitted grouped, ID-ascending.
    fn topological_order(&self) -> Vec<String>;

    /// Best-effort ranked search over descriptions and keywords. Returns
    /// `(node id, score)` pairs, highest score first.
    fn search_by_feature(&self, query: &str) -> Vec<(String, f64)>;

    /// Glob match over low-level file paths and high-level directory paths.
    fn search_by_path(&self, pattern: &str) -> Result<Vec<Node>, RpgError>;

    fn all_nodes(&self) -> Vec<Node>;

    fn all_edges(&self) -> Vec<Edge>;

    fn stats(&self) -> StoreStats;

    /// Release any held resources. The in-memory store is a no-op.
    fn close(&mut self) -> Result<(), RpgError> {
        Ok(())
    }

    /// Export the full graph as a versioned envelope.
    fn export_envelope(&self, config: GraphMeta) -> GraphEnvelope {
        GraphEnvelope {
            version: FORMAT_VERSION.to_string(),
            config,
            nodes: self.all_nodes(),
            edges: self.all_edges(),
        }
    }

    /// Import an envelope into this (empty) store. Nodes load before edges so
    /// endpoint checks hold during the load.
    fn import_envelope(&mut self, envelope: GraphEnvelope) -> Result<GraphMeta, RpgError> {
        for node in envelope.nodes {
            self.add_node(node)?;
        }
        for edge in envelope.edges {
            self.add_edge(edge)?;
        }
        Ok(envelope.config)
    }
}

// ── Describer ───────────────────────────────────────────────────────────────

/// Request for a natural-language description of a code entity.
#[derive(Debug, Clone)]
pub struct DescribeRequest<'a> {
    pub kind: crate::EntityKind,
    pub name: &'a str,
    pub file_path: &'a str,
    /// Source snippet, already capped by the caller.
    pub source_snippet: Option<&'a str>,
    pub parent: Option<&'a str>,
}

/// A Describer's answer.
#[derive(Debug, Clone, Deserialize)]
pub struct DescribeResponse {
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// A candidate parent offered to the routing arbiter.
#[derive(Debug, Clone)]
pub struct ParentCandidate {
    pub id: String,
    pub description: String,
    pub score: f64,
}

/// External language-model capability: describes entities and arbitrates
/// parent placement. Optional; every call site has a deterministic fallback.
pub trait Describer: Send + Sync {
    fn describe(&self, request: &DescribeRequest<'_>) -> Result<DescribeResponse, RpgError>;

    /// Pick the best parent among `candidates` for `description`. Returning
    /// `Ok(None)` defers to the caller's ranking.
    fn arbitrate(
        &self,
        candidates: &[ParentCandidate],
        description: &str,
    ) -> Result<Option<String>, RpgError>;
}

// ── Embedder ────────────────────────────────────────────────────────────────

/// External embedding capability. The vector dimension is provider-fixed and
/// constant within a run.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, RpgError>;

    fn dimensions(&self) -> usize;
}
