//! Repository-local configuration and on-disk layout.
//!
//! Everything lives under `<repo>/.rpg/`: `config.json`, the canonical
//! `graph.json`, and the branch-local `local/` state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::RpgError;

/// Top-level configuration, persisted at `.rpg/config.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RpgConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub semantic: SemanticConfig,
    pub evolution: EvolutionConfig,
}

impl RpgConfig {
    pub fn load(path: &Path) -> Result<Self, RpgError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RpgError::Config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| RpgError::Config(format!("invalid config {}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<(), RpgError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// External model configuration. An empty provider keeps the deterministic
/// offline path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SemanticConfig {
    /// "" (offline) or "ollama".
    pub provider: String,
    pub model: String,
    pub url: String,
    pub dimensions: usize,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            provider: String::new(),
            model: "nomic-embed-text".to_string(),
            url: "http://localhost:11434".to_string(),
            dimensions: 768,
        }
    }
}

/// Evolution tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EvolutionConfig {
    pub drift_threshold: f64,
    pub use_llm: bool,
    pub include_source: bool,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            drift_threshold: 0.4,
            use_llm: false,
            include_source: false,
        }
    }
}

// ── Sync State ──────────────────────────────────────────────────────────────

/// Branch-local sync state, persisted at `.rpg/local/state.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    /// 40-hex commit the local graph is synchronized to.
    pub base_commit: String,
    pub branch: String,
    /// ISO-8601 timestamp of the last sync.
    pub last_sync: String,
}

impl SyncState {
    pub fn load(path: &Path) -> Result<Self, RpgError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), RpgError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

// ── Layout ──────────────────────────────────────────────────────────────────

/// Resolver for the `.rpg/` directory layout of a repository.
#[derive(Debug, Clone)]
pub struct RpgPaths {
    root: PathBuf,
}

impl RpgPaths {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self {
            root: repo.into().join(".rpg"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Canonical graph, tracked by VCS.
    pub fn canonical_graph(&self) -> PathBuf {
        self.root.join("graph.json")
    }

    /// Branch-local graph, untracked.
    pub fn local_graph(&self) -> PathBuf {
        self.root.join("local").join("graph.json")
    }

    pub fn state(&self) -> PathBuf {
        self.root.join("local").join("state.json")
    }

    pub fn semantic_cache(&self) -> PathBuf {
        self.root.join("cache").join("semantic.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = RpgConfig::default();
        config.name = "demo".into();
        config.evolution.drift_threshold = 0.55;
        config.save(&path).unwrap();

        let loaded = RpgConfig::load(&path).unwrap();
        assert_eq!(loaded.name, "demo");
        assert!((loaded.evolution.drift_threshold - 0.55).abs() < f64::EPSILON);
        assert_eq!(loaded.semantic.dimensions, 768);
    }

    #[test]
    fn load_missing_config_is_config_error() {
        let result = RpgConfig::load(Path::new("/nonexistent/.rpg/config.json"));
        assert!(matches!(result, Err(RpgError::Config(_))));
    }

    #[test]
    fn partial_config_uses_defaults() {
        let partial = r#"{ "name": "p" }"#;
        let config: RpgConfig = serde_json::from_str(partial).unwrap();
        assert_eq!(config.name, "p");
        assert!((config.evolution.drift_threshold - 0.4).abs() < f64::EPSILON);
        assert_eq!(config.semantic.provider, "");
    }

    #[test]
    fn paths_layout() {
        let paths = RpgPaths::new("/repo");
        assert_eq!(paths.canonical_graph(), PathBuf::from("/repo/.rpg/graph.json"));
        assert_eq!(
            paths.local_graph(),
            PathBuf::from("/repo/.rpg/local/graph.json")
        );
        assert_eq!(paths.state(), PathBuf::from("/repo/.rpg/local/state.json"));
    }

    #[test]
    fn sync_state_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local").join("state.json");
        let state = SyncState {
            base_commit: "a".repeat(40),
            branch: "main".into(),
            last_sync: "2026-01-01T00:00:00Z".into(),
        };
        state.save(&path).unwrap();
        let loaded = SyncState::load(&path).unwrap();
        assert_eq!(loaded.branch, "main");
        assert_eq!(loaded.base_commit.len(), 40);
    }
}
