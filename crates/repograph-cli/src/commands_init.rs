//! Init command: `.rpg/` scaffolding, git hooks, and `.gitignore` upkeep.

use repograph_core::{RpgConfig, RpgPaths};
use std::path::Path;

/// Shell line the hooks run. Hooks fire from the repository root.
const HOOK_COMMAND: &str = "repograph sync || true";

const HOOKS: &[&str] = &["post-merge", "post-checkout"];

pub(crate) fn cmd_init(repo: &Path) -> anyhow::Result<()> {
    println!("repograph init: {}\n", repo.display());
    let paths = RpgPaths::new(repo);

    // ── Step 1: config ──────────────────────────────────────────────────
    let config_path = paths.config();
    if config_path.exists() {
        println!("[config] {} already exists, keeping it", config_path.display());
    } else {
        let mut config = RpgConfig::default();
        config.name = repo
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "repository".to_string());
        config.save(&config_path)?;
        println!("[config] wrote {}", config_path.display());
    }

    // ── Step 2: git hooks ───────────────────────────────────────────────
    let hooks_dir = repo.join(".git").join("hooks");
    if hooks_dir.is_dir() {
        for hook in HOOKS {
            install_hook(&hooks_dir.join(hook))?;
            println!("[hooks] {hook} installed");
        }
    } else {
        println!("[hooks] no .git/hooks directory, skipping hook installation");
    }

    // ── Step 3: .gitignore ──────────────────────────────────────────────
    if append_gitignore(repo)? {
        println!("[ignore] added .rpg/local/ to .gitignore");
    } else {
        println!("[ignore] .gitignore already covers .rpg/local/");
    }

    println!("\nDone. Run `repograph encode` to build the canonical graph.");
    Ok(())
}

/// Create the hook, or append the sync line to an existing one. Existing
/// content is never overwritten.
fn install_hook(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        let existing = std::fs::read_to_string(path)?;
        if existing.contains("repograph sync") {
            return Ok(());
        }
        let mut updated = existing;
        if !updated.ends_with('\n') {
            updated.push('\n');
        }
        updated.push_str(HOOK_COMMAND);
        updated.push('\n');
        std::fs::write(path, updated)?;
    } else {
        std::fs::write(path, format!("#!/bin/sh\n{HOOK_COMMAND}\n"))?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

/// Append `.rpg/local/` to `.gitignore` once. Returns whether a line was
/// added.
fn append_gitignore(repo: &Path) -> anyhow::Result<bool> {
    let path = repo.join(".gitignore");
    let existing = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => String::new(),
    };
    if existing.lines().any(|l| l.trim() == ".rpg/local/") {
        return Ok(false);
    }
    let mut updated = existing;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(".rpg/local/\n");
    std::fs::write(&path, updated)?;
    Ok(true)
}
