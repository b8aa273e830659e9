//! Durable JSON form of the planning graph.
//!
//! Writes go to a temp file in the target directory first, then rename into
//! place, so readers never observe a torn artifact.

use repograph_core::{GraphEnvelope, RpgError, FORMAT_VERSION};
use std::path::Path;

use crate::RepoGraph;

/// Persist `graph` at `path`.
pub fn save_graph(graph: &RepoGraph, path: &Path) -> Result<(), RpgError> {
    let envelope = graph.to_envelope();
    let json = serde_json::to_string_pretty(&envelope)?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;
    let tmp = dir.join(format!(
        ".{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "graph.json".to_string())
    ));
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    tracing::debug!(path = %path.display(), "graph saved");
    Ok(())
}

/// Load a graph from `path`. Unknown future format versions are rejected.
pub fn load_graph(path: &Path) -> Result<RepoGraph, RpgError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| RpgError::Store(format!("cannot read {}: {e}", path.display())))?;
    let envelope: GraphEnvelope = serde_json::from_str(&content)?;

    let major = envelope.version.split('.').next().unwrap_or("");
    let supported_major = FORMAT_VERSION.split('.').next().unwrap_or("");
    if major != supported_major {
        return Err(RpgError::Store(format!(
            "unsupported graph format version {} (supported: {})",
            envelope.version, FORMAT_VERSION
        )));
    }

    RepoGraph::from_envelope(envelope)
}
