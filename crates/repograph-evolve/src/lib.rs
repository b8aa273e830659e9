//! repograph-evolve: the evolution engine.
//!
//! Consumes a VCS commit range, extracts entity-level changes from syntax
//! trees, and reconciles the planning graph: deletions with orphan pruning,
//! drift-measured modifications with re-routing, insertions with parent
//! search and import dependency injection.

mod diff;
mod encode;
mod evolver;
mod imports;
mod vcs;

pub use diff::{ChangedEntity, DiffParser, DiffResult, Modification};
pub use encode::Encoder;
pub use evolver::{EvolutionOptions, EvolutionReport, Evolver};
pub use vcs::GitProbe;
