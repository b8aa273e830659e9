//! repograph-semantic: feature extraction, parent routing, and the
//! persistent semantic cache.
//!
//! External models (Describer, Embedder) are optional capabilities; every
//! path has a deterministic offline fallback so the system runs end-to-end
//! without network access.

mod cache;
mod extract;
mod providers;
mod router;
mod similarity;

pub use cache::SemanticCache;
pub use extract::{split_identifier, ExtractInput, SemanticExtractor};
pub use providers::{from_config, OllamaDescriber, OllamaEmbedder};
pub use router::SemanticRouter;
pub use similarity::{cosine, set_jaccard, text_jaccard, token_set};
