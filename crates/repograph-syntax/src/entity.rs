//! Entity, import, and call-site descriptors produced by the probe.

use repograph_core::EntityKind;
use serde::{Deserialize, Serialize};

/// A code entity found in a source buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub kind: EntityKind,
    /// Simple name (e.g. `dispatch`).
    pub name: String,
    /// Dotted qualified name (e.g. `Router.dispatch`).
    pub qualified_name: String,
    /// 1-indexed, inclusive.
    pub start_line: u32,
    pub end_line: u32,
    /// The entity's source slice.
    pub source: String,
}

/// How an import was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Import,
    From,
    Require,
}

/// A single import found in a source buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    /// Module specifier as written (`./util`, `os.path`, `crate::ids`).
    pub module: String,
    pub kind: ImportKind,
    /// 1-indexed.
    pub line: u32,
}

/// A call site found in a source buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSite {
    /// Trailing callee identifier (`c` for `a.b.c()`, `X` for `new X<T>()`).
    pub callee: String,
    pub caller_file: String,
    /// Qualified name of the enclosing entity, or the file path at top level.
    pub caller_entity: String,
    /// 1-indexed.
    pub line: u32,
}

/// Everything the probe extracts from one buffer.
#[derive(Debug, Clone, Default)]
pub struct ProbeResult {
    pub entities: Vec<EntityDescriptor>,
    pub imports: Vec<ImportRecord>,
}
