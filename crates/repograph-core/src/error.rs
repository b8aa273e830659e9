/// Unified error type for repograph.
#[derive(Debug, thiserror::Error)]
pub enum RpgError {
    /// VCS subprocess failure, timeout, or malformed output. Fatal.
    #[error("VCS error: {0}")]
    Vcs(String),

    /// Syntax-tree parse failure. Callers downgrade this to an empty
    /// entity list; it never crosses the probe boundary.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Graph invariant violation: duplicate ID, missing edge endpoint,
    /// removing a non-existent node.
    #[error("Graph invariant violated: {0}")]
    Invariant(String),

    /// Storage-layer failure. Fatal for the current evolution pass.
    #[error("Store error: {0}")]
    Store(String),

    /// Describer or Embedder failure. Non-fatal; call sites fall back to
    /// the deterministic offline path.
    #[error("Model error: {0}")]
    Model(String),

    /// Missing or invalid `.rpg/config.json`.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RpgError {
    /// Whether this error aborts an evolution pass (vs. warn-and-continue
    /// at the per-entity level).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Vcs(_) | Self::Io(_))
    }
}
