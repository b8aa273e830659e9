//! Semantic feature extraction for code entities.
//!
//! With a Describer configured, extraction asks it for a description and
//! keywords under a capped prompt; otherwise a deterministic heuristic keeps
//! the system fully functional offline. Results are cached by a SHA-256 of
//! the extraction inputs.

use crate::cache::SemanticCache;
use repograph_core::{DescribeRequest, Describer, EntityKind, SemanticFeature};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Snippet cap: ~2000 tokens at ~4 chars per token.
const MAX_SNIPPET_CHARS: usize = 8000;

/// Inputs to one extraction.
#[derive(Debug, Clone)]
pub struct ExtractInput<'a> {
    pub kind: EntityKind,
    pub name: &'a str,
    pub file_path: &'a str,
    pub source: Option<&'a str>,
    pub parent_qualified_name: Option<&'a str>,
}

pub struct SemanticExtractor {
    describer: Option<Arc<dyn Describer>>,
    cache: SemanticCache,
    llm_calls: u64,
}

impl SemanticExtractor {
    pub fn new(describer: Option<Arc<dyn Describer>>, cache: SemanticCache) -> Self {
        Self {
            describer,
            cache,
            llm_calls: 0,
        }
    }

    /// Offline extractor with no persistent cache.
    pub fn offline() -> Self {
        Self::new(None, SemanticCache::disabled())
    }

    pub fn llm_calls(&self) -> u64 {
        self.llm_calls
    }

    /// Extract a semantic feature, consulting the cache first.
    pub fn extract(&mut self, input: &ExtractInput<'_>) -> SemanticFeature {
        let key = cache_key(input);
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        let feature = match &self.describer {
            Some(describer) => {
                let snippet = input.source.map(|s| cap_snippet(s));
                let request = DescribeRequest {
                    kind: input.kind,
                    name: input.name,
                    file_path: input.file_path,
                    source_snippet: snippet.as_deref(),
                    parent: input.parent_qualified_name,
                };
                self.llm_calls += 1;
                match describer.describe(&request) {
                    Ok(response) => {
                        let keywords = response
                            .keywords
                            .into_iter()
                            .map(|k| k.trim().to_lowercase())
                            .filter(|k| k.len() >= 2)
                            .collect();
                        SemanticFeature::new(response.description.trim(), keywords, None)
                            .unwrap_or_else(|_| heuristic_feature(input))
                    }
                    Err(e) => {
                        tracing::warn!(name = input.name, "describer failed, using heuristic: {e}");
                        heuristic_feature(input)
                    }
                }
            }
            None => heuristic_feature(input),
        };

        self.cache.insert(key, feature.clone());
        feature
    }

    /// Persist the cache. Called once per evolution pass.
    pub fn flush_cache(&mut self) -> Result<(), repograph_core::RpgError> {
        self.cache.flush()
    }
}

fn cap_snippet(source: &str) -> String {
    if source.len() <= MAX_SNIPPET_CHARS {
        return source.to_string();
    }
    // Cut on a char boundary at or below the cap.
    let mut end = MAX_SNIPPET_CHARS;
    while !source.is_char_boundary(end) {
        end -= 1;
    }
    source[..end].to_string()
}

/// Deterministic fallback: templated description plus identifier-fragment
/// keywords.
fn heuristic_feature(input: &ExtractInput<'_>) -> SemanticFeature {
    let description = format!("{} {} in {}", input.kind, input.name, input.file_path);
    let keywords = split_identifier(input.name);
    SemanticFeature::new(description, keywords, None)
        .expect("templated description is never empty")
}

/// Split an identifier into lower-cased fragments on camelCase and
/// snake_case boundaries; fragments shorter than 2 chars are dropped.
pub fn split_identifier(name: &str) -> Vec<String> {
    let mut fragments: Vec<String> = Vec::new();
    let mut current = String::new();

    for c in name.chars() {
        if c == '_' || c == '-' || c == '.' || c == ' ' {
            if !current.is_empty() {
                fragments.push(std::mem::take(&mut current));
            }
        } else if c.is_uppercase() && !current.is_empty()
            && current.chars().last().is_some_and(|p| p.is_lowercase())
        {
            fragments.push(std::mem::take(&mut current));
            current.push(c);
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        fragments.push(current);
    }

    let mut seen = std::collections::BTreeSet::new();
    fragments
        .into_iter()
        .map(|f| f.to_lowercase())
        .filter(|f| f.len() >= 2)
        .filter(|f| seen.insert(f.clone()))
        .collect()
}

fn cache_key(input: &ExtractInput<'_>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.kind.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(input.name.as_bytes());
    hasher.update(b"|");
    hasher.update(input.file_path.as_bytes());
    hasher.update(b"|");
    if let Some(source) = input.source {
        hasher.update(source.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
