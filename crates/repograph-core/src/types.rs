use serde::{Deserialize, Serialize};

use crate::RpgError;

// ── Entity Kinds ────────────────────────────────────────────────────────────

/// The kinds of code entities tracked by the planning graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    File,
    Class,
    Function,
    Method,
    Module,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Class => write!(f, "class"),
            Self::Function => write!(f, "function"),
            Self::Method => write!(f, "method"),
            Self::Module => write!(f, "module"),
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = RpgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(Self::File),
            "class" => Ok(Self::Class),
            "function" => Ok(Self::Function),
            "method" => Ok(Self::Method),
            "module" => Ok(Self::Module),
            _ => Err(RpgError::Invariant(format!("invalid entity kind: {s}"))),
        }
    }
}

// ── Dependency Types ────────────────────────────────────────────────────────

/// Dependency edge categories between implementation entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    Import,
    Call,
    Inherit,
    Implement,
    Use,
}

impl std::fmt::Display for DependencyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Import => write!(f, "import"),
            Self::Call => write!(f, "call"),
            Self::Inherit => write!(f, "inherit"),
            Self::Implement => write!(f, "implement"),
            Self::Use => write!(f, "use"),
        }
    }
}

impl std::str::FromStr for DependencyType {
    type Err = RpgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "import" => Ok(Self::Import),
            "call" => Ok(Self::Call),
            "inherit" => Ok(Self::Inherit),
            "implement" => Ok(Self::Implement),
            "use" => Ok(Self::Use),
            _ => Err(RpgError::Invariant(format!("invalid dependency type: {s}"))),
        }
    }
}

// ── Semantic Feature ────────────────────────────────────────────────────────

/// Intent classification for a semantic feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentTag {
    Behavior,
    Data,
    Control,
    Io,
    Util,
}

/// Natural-language summary of what an entity does.
///
/// Immutable value object: the description is non-empty and every keyword is
/// non-empty, enforced at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticFeature {
    description: String,
    keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    intent: Option<IntentTag>,
}

impl SemanticFeature {
    pub fn new(
        description: impl Into<String>,
        keywords: Vec<String>,
        intent: Option<IntentTag>,
    ) -> Result<Self, RpgError> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(RpgError::Invariant(
                "semantic feature description must be non-empty".into(),
            ));
        }
        if keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(RpgError::Invariant(
                "semantic feature keywords must be non-empty".into(),
            ));
        }
        Ok(Self {
            description,
            keywords,
            intent,
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn intent(&self) -> Option<IntentTag> {
        self.intent
    }
}

// ── Structural Metadata ─────────────────────────────────────────────────────

/// Location and identity of a code entity within the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralMetadata {
    /// Repo-relative file path.
    pub file_path: String,
    pub entity_kind: EntityKind,
    /// Dotted qualified name (e.g. `Router.dispatch`).
    pub qualified_name: String,
    /// 1-indexed, inclusive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
}

// ── Nodes ───────────────────────────────────────────────────────────────────

/// Architectural node: a directory, module grouping, or other high-level unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighLevelNode {
    pub id: String,
    pub feature: SemanticFeature,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory_path: Option<String>,
}

/// Implementation node: a concrete file, class, function, or method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowLevelNode {
    pub id: String,
    pub feature: SemanticFeature,
    pub metadata: StructuralMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A planning-graph node. The `nodeType` tag discriminates the two variants
/// on the wire; decoding happens once at the store boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "nodeType", rename_all = "snake_case")]
pub enum Node {
    HighLevel(HighLevelNode),
    LowLevel(LowLevelNode),
}

impl Node {
    pub fn id(&self) -> &str {
        match self {
            Self::HighLevel(n) => &n.id,
            Self::LowLevel(n) => &n.id,
        }
    }

    pub fn feature(&self) -> &SemanticFeature {
        match self {
            Self::HighLevel(n) => &n.feature,
            Self::LowLevel(n) => &n.feature,
        }
    }

    pub fn is_high_level(&self) -> bool {
        matches!(self, Self::HighLevel(_))
    }

    pub fn as_high_level(&self) -> Option<&HighLevelNode> {
        match self {
            Self::HighLevel(n) => Some(n),
            Self::LowLevel(_) => None,
        }
    }

    pub fn as_low_level(&self) -> Option<&LowLevelNode> {
        match self {
            Self::HighLevel(_) => None,
            Self::LowLevel(n) => Some(n),
        }
    }
}

// ── Edges ───────────────────────────────────────────────────────────────────

/// Hierarchy edge: parent → child in the architectural tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionalEdge {
    pub source: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sibling_order: Option<u32>,
}

/// Dependency edge: import, call, inheritance, etc. between entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdge {
    pub source: String,
    pub target: String,
    pub dependency_type: DependencyType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_runtime: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

/// A planning-graph edge, discriminated by `edgeType` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "edgeType", rename_all = "snake_case")]
pub enum Edge {
    Functional(FunctionalEdge),
    Dependency(DependencyEdge),
}

impl Edge {
    pub fn source(&self) -> &str {
        match self {
            Self::Functional(e) => &e.source,
            Self::Dependency(e) => &e.source,
        }
    }

    pub fn target(&self) -> &str {
        match self {
            Self::Functional(e) => &e.target,
            Self::Dependency(e) => &e.target,
        }
    }

    pub fn kind(&self) -> EdgeKind {
        match self {
            Self::Functional(_) => EdgeKind::Functional,
            Self::Dependency(_) => EdgeKind::Dependency,
        }
    }
}

/// Edge variant filter for store queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Functional,
    Dependency,
}

// ── Serialized Envelope ─────────────────────────────────────────────────────

/// Current on-disk format version.
pub const FORMAT_VERSION: &str = "1.0.0";

/// Project-level metadata carried in the serialized envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMeta {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The durable JSON form of a planning graph.
///
/// Round-trip safe: importing an exported envelope reproduces the graph up to
/// store-internal enumeration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEnvelope {
    pub version: String,
    pub config: GraphMeta,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_kind_roundtrip() {
        for kind in [
            EntityKind::File,
            EntityKind::Class,
            EntityKind::Function,
            EntityKind::Method,
            EntityKind::Module,
        ] {
            let s = kind.to_string();
            let parsed: EntityKind = s.parse().unwrap();
            assert_eq!(kind, parsed);
        }
    }

    #[test]
    fn dependency_type_roundtrip() {
        for ty in [
            DependencyType::Import,
            DependencyType::Call,
            DependencyType::Inherit,
            DependencyType::Implement,
            DependencyType::Use,
        ] {
            let s = ty.to_string();
            let parsed: DependencyType = s.parse().unwrap();
            assert_eq!(ty, parsed);
        }
    }

    #[test]
    fn feature_rejects_empty_description() {
        assert!(SemanticFeature::new("", vec![], None).is_err());
        assert!(SemanticFeature::new("   ", vec![], None).is_err());
    }

    #[test]
    fn feature_rejects_empty_keyword() {
        let result = SemanticFeature::new("desc", vec!["ok".into(), "".into()], None);
        assert!(result.is_err());
    }

    #[test]
    fn node_serializes_with_tag() {
        let feature = SemanticFeature::new("routes requests", vec!["route".into()], None).unwrap();
        let node = Node::HighLevel(HighLevelNode {
            id: "src:dir".into(),
            feature,
            directory_path: Some("src".into()),
        });
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["nodeType"], "high_level");
        assert_eq!(json["directoryPath"], "src");

        let back: Node = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn edge_serializes_with_tag() {
        let edge = Edge::Dependency(DependencyEdge {
            source: "a".into(),
            target: "b".into(),
            dependency_type: DependencyType::Import,
            is_runtime: None,
            line: Some(3),
        });
        let json = serde_json::to_value(&edge).unwrap();
        assert_eq!(json["edgeType"], "dependency");
        assert_eq!(json["dependencyType"], "import");
        assert_eq!(json["line"], 3);

        let back: Edge = serde_json::from_value(json).unwrap();
        assert_eq!(back, edge);
    }

    #[test]
    fn envelope_roundtrip() {
        let feature = SemanticFeature::new("parses input", vec!["parse".into()], None).unwrap();
        let envelope = GraphEnvelope {
            version: FORMAT_VERSION.into(),
            config: GraphMeta {
                name: "demo".into(),
                root_path: None,
                description: None,
            },
            nodes: vec![Node::LowLevel(LowLevelNode {
                id: "src/a.ts:function:parse".into(),
                feature,
                metadata: StructuralMetadata {
                    file_path: "src/a.ts".into(),
                    entity_kind: EntityKind::Function,
                    qualified_name: "parse".into(),
                    start_line: Some(1),
                    end_line: Some(10),
                },
                source: None,
            })],
            edges: vec![],
        };
        let json = serde_json::to_string(&envelope).unwrap();
        let back: GraphEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back.nodes, envelope.nodes);
        assert_eq!(back.version, FORMAT_VERSION);
    }
}
