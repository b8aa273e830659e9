//! repograph-syntax: tree-sitter syntax probe for the planning graph.
//!
//! Parses a source buffer under a named grammar and yields a flat list of
//! entities (classes, functions, methods, modules) with spans and dotted
//! qualified names, plus import records and optional call sites.

mod entity;
mod grammar;
mod languages;
mod probe;

pub use entity::{CallSite, EntityDescriptor, ImportKind, ImportRecord, ProbeResult};
pub use grammar::GrammarSet;
pub use languages::{grammar_for, language_for_extension};
pub use probe::SyntaxProbe;
