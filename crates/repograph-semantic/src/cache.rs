//! Persistent semantic-feature cache.
//!
//! A JSON file mapping input hashes to extracted features. Lazy-loaded on
//! first lookup and flushed once at the end of an evolution pass via an
//! atomic temp-file + rename. The cache is advisory: concurrent writers race
//! last-write-wins and a lost cache only costs re-extraction.

use repograph_core::{RpgError, SemanticFeature};
use std::collections::HashMap;
use std::path::PathBuf;

pub struct SemanticCache {
    path: Option<PathBuf>,
    entries: Option<HashMap<String, SemanticFeature>>,
    dirty: bool,
}

impl SemanticCache {
    /// File-backed cache at `path`.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            entries: None,
            dirty: false,
        }
    }

    /// In-memory only; nothing is persisted.
    pub fn disabled() -> Self {
        Self {
            path: None,
            entries: Some(HashMap::new()),
            dirty: false,
        }
    }

    fn entries_mut(&mut self) -> &mut HashMap<String, SemanticFeature> {
        if self.entries.is_none() {
            let loaded = match &self.path {
                Some(path) => match std::fs::read_to_string(path) {
                    Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                        tracing::warn!(path = %path.display(), "corrupt semantic cache, starting fresh: {e}");
                        HashMap::new()
                    }),
                    Err(_) => HashMap::new(),
                },
                None => HashMap::new(),
            };
            tracing::debug!(entries = loaded.len(), "semantic cache loaded");
            self.entries = Some(loaded);
        }
        self.entries.as_mut().expect("entries just populated")
    }

    pub fn get(&mut self, key: &str) -> Option<SemanticFeature> {
        self.entries_mut().get(key).cloned()
    }

    pub fn insert(&mut self, key: String, feature: SemanticFeature) {
        self.entries_mut().insert(key, feature);
        self.dirty = true;
    }

    pub fn len(&mut self) -> usize {
        self.entries_mut().len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    /// Write the cache to disk if anything changed since the last flush.
    pub fn flush(&mut self) -> Result<(), RpgError> {
        if !self.dirty {
            return Ok(());
        }
        let Some(path) = self.path.clone() else {
            self.dirty = false;
            return Ok(());
        };
        let entries = self.entries_mut();
        let json = serde_json::to_string(entries)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        self.dirty = false;
        Ok(())
    }
}
