//! Sync command: canonical → local copy plus branch-local evolution.

use anyhow::Context;
use repograph_core::{RpgConfig, RpgError, RpgPaths, SyncState};
use repograph_evolve::{EvolutionOptions, Evolver, GitProbe};
use std::path::Path;

pub(crate) fn cmd_sync(repo: &Path, force: bool) -> anyhow::Result<()> {
    let paths = RpgPaths::new(repo);
    let canonical = paths.canonical_graph();
    if !canonical.exists() {
        return Err(RpgError::Store(format!(
            "missing canonical graph at {} (run `repograph encode` first)",
            canonical.display()
        ))
        .into());
    }

    let vcs = GitProbe::new()?;
    let head = vcs.head_sha(repo)?;
    let branch = vcs.current_branch(repo)?;
    let default_branch = vcs.default_branch(repo)?;

    let local = paths.local_graph();
    if force || !local.exists() {
        if let Some(parent) = local.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&canonical, &local)
            .with_context(|| format!("copying canonical graph to {}", local.display()))?;
        tracing::info!("copied canonical graph to {}", local.display());
    }

    // On a feature branch, evolve the local graph over the commits unique
    // to it. On the default branch (or detached HEAD) the copy is enough.
    if !branch.is_empty() && branch != default_branch {
        let base = vcs.merge_base(repo, &default_branch, "HEAD")?;
        let range = format!("{base}..HEAD");

        let config = RpgConfig::load(&paths.config()).unwrap_or_default();
        let (describer, embedder) = if config.evolution.use_llm {
            repograph_semantic::from_config(&config.semantic)?
        } else {
            (None, None)
        };

        let mut graph = repograph_graph::load_graph(&local)?;
        let mut options = EvolutionOptions::new(repo, range.clone());
        options.drift_threshold = config.evolution.drift_threshold;
        options.use_llm = config.evolution.use_llm;
        options.include_source = config.evolution.include_source;
        options.cache_path = Some(paths.semantic_cache());

        let evolver = Evolver::new(vcs.clone(), describer, embedder);
        match evolver.evolve(&mut graph, &options) {
            Ok(report) => {
                repograph_graph::save_graph(&graph, &local)?;
                println!(
                    "sync {range}: +{} -{} ~{} rerouted {} pruned {} ({} ms)",
                    report.inserted,
                    report.deleted,
                    report.modified,
                    report.rerouted,
                    report.pruned_nodes,
                    report.duration_ms
                );
            }
            Err(e) => {
                // Evolution trouble must not leave a half-evolved local
                // graph behind; fall back to a clean canonical copy.
                tracing::warn!("evolution failed, restoring canonical copy: {e}");
                std::fs::copy(&canonical, &local)?;
                println!("sync: evolution failed ({e}), local graph reset to canonical");
            }
        }
    } else {
        println!("sync: on {branch:?}, local graph mirrors canonical");
    }

    SyncState {
        base_commit: head,
        branch,
        last_sync: chrono::Utc::now().to_rfc3339(),
    }
    .save(&paths.state())?;
    Ok(())
}
