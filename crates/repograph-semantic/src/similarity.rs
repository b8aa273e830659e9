//! Similarity measures shared by the router and the drift computation.

use std::collections::BTreeSet;

/// Cosine similarity of two vectors. Mismatched or zero-norm inputs score 0.
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += (*x as f64) * (*y as f64);
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Lower-cased whitespace token set of a text.
pub fn token_set(text: &str) -> BTreeSet<String> {
    text.split_whitespace()
        .map(|t| t.to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Jaccard similarity over the whitespace token sets of two texts.
/// Two empty texts are identical (1.0).
pub fn text_jaccard(a: &str, b: &str) -> f64 {
    set_jaccard(&token_set(a), &token_set(b))
}

/// Jaccard similarity over two sets. Empty-over-empty is 1.0.
pub fn set_jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    intersection as f64 / union as f64
}
