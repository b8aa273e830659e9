//! Parent routing: pick the best high-level node for a new entity.

use crate::similarity::{cosine, text_jaccard};
use repograph_core::{Describer, Embedder, ParentCandidate, RpgError};
use std::sync::Arc;

/// Candidates forwarded to an external arbiter.
const TOP_K: usize = 5;

/// Routes new low-level entities to high-level parents by description
/// similarity, optionally arbitrated by an external model.
pub struct SemanticRouter {
    embedder: Option<Arc<dyn Embedder>>,
    arbiter: Option<Arc<dyn Describer>>,
    llm_calls: u64,
}

impl SemanticRouter {
    pub fn new(embedder: Option<Arc<dyn Embedder>>, arbiter: Option<Arc<dyn Describer>>) -> Self {
        Self {
            embedder,
            arbiter,
            llm_calls: 0,
        }
    }

    pub fn offline() -> Self {
        Self::new(None, None)
    }

    pub fn llm_calls(&self) -> u64 {
        self.llm_calls
    }

    /// Pick the best parent among `(id, description)` candidates for
    /// `description`. Returns `None` when there are no candidates.
    ///
    /// Ranking is score-descending with ID-ascending ties; an arbiter's
    /// choice is honored only when it names one of the top-K candidates.
    pub fn find_best_parent(
        &mut self,
        candidates: &[(String, String)],
        description: &str,
    ) -> Option<String> {
        if candidates.is_empty() {
            return None;
        }

        let mut scored: Vec<ParentCandidate> = candidates
            .iter()
            .map(|(id, candidate_description)| ParentCandidate {
                id: id.clone(),
                description: candidate_description.clone(),
                score: self.score(candidate_description, description),
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(TOP_K);

        if let Some(arbiter) = self.arbiter.clone() {
            self.llm_calls += 1;
            match arbiter.arbitrate(&scored, description) {
                Ok(Some(choice)) if scored.iter().any(|c| c.id == choice) => {
                    return Some(choice);
                }
                Ok(Some(choice)) => {
                    tracing::warn!(%choice, "arbiter picked an unknown candidate, ignoring");
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("arbiter failed, using top-ranked candidate: {e}");
                }
            }
        }

        scored.first().map(|c| c.id.clone())
    }

    /// Similarity of a candidate description to the entity description:
    /// embedding cosine when an embedder is available, token Jaccard
    /// otherwise (or on embedder failure).
    fn score(&self, candidate: &str, description: &str) -> f64 {
        if let Some(embedder) = &self.embedder {
            match (embedder.embed(candidate), embedder.embed(description)) {
                (Ok(a), Ok(b)) => return cosine(&a, &b),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::warn!("embedder failed, falling back to token overlap: {e}");
                }
            }
        }
        text_jaccard(candidate, description)
    }
}
