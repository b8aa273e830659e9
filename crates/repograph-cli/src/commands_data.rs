//! Encode, stats, and export commands.

use repograph_core::{RpgConfig, RpgError, RpgPaths};
use repograph_evolve::Encoder;
use repograph_graph::{load_graph, save_graph, RepoGraph};
use repograph_semantic::{SemanticCache, SemanticExtractor};
use std::path::Path;

pub(crate) fn cmd_encode(repo: &Path, include_source: bool) -> anyhow::Result<()> {
    let paths = RpgPaths::new(repo);
    let config = RpgConfig::load(&paths.config()).unwrap_or_else(|_| {
        let mut fallback = RpgConfig::default();
        fallback.name = repo
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "repository".to_string());
        fallback
    });

    let describer = if config.evolution.use_llm {
        repograph_semantic::from_config(&config.semantic)?.0
    } else {
        None
    };
    let mut extractor =
        SemanticExtractor::new(describer, SemanticCache::new(paths.semantic_cache()));

    let graph = Encoder::new().encode(repo, &config.name, &mut extractor, include_source)?;
    if let Err(e) = extractor.flush_cache() {
        tracing::warn!("semantic cache flush failed: {e}");
    }

    let canonical = paths.canonical_graph();
    save_graph(&graph, &canonical)?;

    let stats = graph.stats();
    println!(
        "encoded {} nodes ({} high-level, {} low-level) and {} edges -> {}",
        stats.node_count,
        stats.high_level_count,
        stats.low_level_count,
        stats.edge_count,
        canonical.display()
    );
    Ok(())
}

pub(crate) fn cmd_stats(repo: &Path) -> anyhow::Result<()> {
    let graph = open_graph(repo)?;
    let stats = graph.stats();

    println!("nodes:        {}", stats.node_count);
    println!("  high-level: {}", stats.high_level_count);
    println!("  low-level:  {}", stats.low_level_count);
    for (kind, count) in sorted(&stats.entity_kind_counts) {
        println!("    {kind}: {count}");
    }
    println!("edges:        {}", stats.edge_count);
    for (ty, count) in sorted(&stats.dependency_type_counts) {
        println!("    {ty}: {count}");
    }
    Ok(())
}

pub(crate) fn cmd_export(repo: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let graph = open_graph(repo)?;
    let json = serde_json::to_string_pretty(&graph.to_envelope())?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            println!("exported graph to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Prefer the branch-local graph, falling back to the canonical one.
fn open_graph(repo: &Path) -> Result<RepoGraph, RpgError> {
    let paths = RpgPaths::new(repo);
    let local = paths.local_graph();
    if local.exists() {
        return load_graph(&local);
    }
    let canonical = paths.canonical_graph();
    if !canonical.exists() {
        return Err(RpgError::Store(format!(
            "no graph found under {} (run `repograph encode` first)",
            paths.root().display()
        )));
    }
    load_graph(&canonical)
}

fn sorted(counts: &std::collections::HashMap<String, usize>) -> Vec<(String, usize)> {
    let mut entries: Vec<(String, usize)> =
        counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    entries.sort();
    entries
}
