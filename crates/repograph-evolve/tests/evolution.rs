//! End-to-end evolution against a real scratch git repository.
//!
//! Skips silently when no git binary is available.

use repograph_core::DependencyType;
use repograph_evolve::{Encoder, EvolutionOptions, Evolver, GitProbe};
use repograph_semantic::SemanticExtractor;
use std::path::Path;
use std::process::Command;

fn git(repo: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(["-c", "user.name=test", "-c", "user.email=test@example.com"])
        .args(args)
        .status()
        .expect("git should run");
    assert!(status.success(), "git {args:?} failed");
}

fn write(repo: &Path, relative: &str, content: &str) {
    let path = repo.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

#[test]
fn evolve_tracks_a_real_commit_range() {
    if which::which("git").is_err() {
        eprintln!("git not installed, skipping");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path();
    git(repo, &["init", "-q"]);

    // ── First commit: two files ─────────────────────────────────────────
    write(
        repo,
        "src/a.ts",
        "export function alpha(): number { return 1; }\n",
    );
    write(
        repo,
        "src/b.ts",
        "export function beta(): number { return 2; }\n",
    );
    git(repo, &["add", "."]);
    git(repo, &["commit", "-q", "-m", "initial"]);

    let vcs = GitProbe::new().unwrap();
    let first = vcs.head_sha(repo).unwrap();
    assert_eq!(first.len(), 40);
    assert!(!vcs.current_branch(repo).unwrap().is_empty());

    // Encode the graph at the first commit's tree.
    let mut extractor = SemanticExtractor::offline();
    let mut graph = Encoder::new()
        .encode(repo, "scratch", &mut extractor, false)
        .unwrap();
    assert!(graph.has_node("src/a.ts:file:src/a.ts"));
    assert!(graph.has_node("src/b.ts:file:src/b.ts"));

    // ── Second commit: modify a, add c (importing a), delete b ──────────
    write(
        repo,
        "src/a.ts",
        "export function alpha(): number { return 42; }\n",
    );
    write(
        repo,
        "src/c.ts",
        "import { alpha } from './a';\n\nexport function gamma(): number { return alpha(); }\n",
    );
    std::fs::remove_file(repo.join("src/b.ts")).unwrap();
    git(repo, &["add", "-A"]);
    git(repo, &["commit", "-q", "-m", "evolve"]);
    let second = vcs.head_sha(repo).unwrap();

    let raw = vcs.name_status(repo, &format!("{first}..{second}")).unwrap();
    assert!(raw.contains("src/c.ts"));
    assert!(raw.contains("src/b.ts"));

    // ── Evolve ──────────────────────────────────────────────────────────
    let evolver = Evolver::offline(vcs);
    let options = EvolutionOptions::new(repo, format!("{first}..{second}"));
    let report = evolver.evolve(&mut graph, &options).unwrap();

    // b and everything inside it is gone (line-suffixed IDs matched).
    assert!(!graph.has_node("src/b.ts:file:src/b.ts"));
    assert!(graph
        .low_level_nodes()
        .iter()
        .all(|n| n.metadata.file_path != "src/b.ts"));
    assert_eq!(report.deleted, 2);

    // c was inserted: its file node plus the gamma function.
    let c_file = "src/c.ts:file:src/c.ts";
    assert!(graph.has_node(c_file));
    assert!(graph.has_node("src/c.ts:function:gamma"));
    assert_eq!(report.inserted, 2);

    // The relative import resolved to a dependency edge, exactly once.
    assert!(graph.has_dependency_edge(
        c_file,
        "src/a.ts:file:src/a.ts",
        DependencyType::Import
    ));

    // a changed in place: same identity, no reroute.
    assert!(report.modified >= 1);
    assert_eq!(report.rerouted, 0);
    assert!(graph
        .low_level_nodes()
        .iter()
        .any(|n| n.metadata.qualified_name == "alpha"));
}

#[test]
fn empty_commit_range_mutates_nothing() {
    if which::which("git").is_err() {
        eprintln!("git not installed, skipping");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path();
    git(repo, &["init", "-q"]);
    write(repo, "src/a.ts", "export function alpha(): void {}\n");
    git(repo, &["add", "."]);
    git(repo, &["commit", "-q", "-m", "initial"]);

    let mut extractor = SemanticExtractor::offline();
    let mut graph = Encoder::new()
        .encode(repo, "scratch", &mut extractor, false)
        .unwrap();
    let nodes_before = graph.stats().node_count;

    let evolver = Evolver::offline(GitProbe::new().unwrap());
    let report = evolver
        .evolve(&mut graph, &EvolutionOptions::new(repo, ""))
        .unwrap();

    assert_eq!(report.inserted + report.deleted + report.modified, 0);
    assert_eq!(graph.stats().node_count, nodes_before);
}

#[test]
fn same_range_twice_is_stable() {
    if which::which("git").is_err() {
        eprintln!("git not installed, skipping");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path();
    git(repo, &["init", "-q"]);
    write(repo, "lib.py", "def one():\n    pass\n");
    git(repo, &["add", "."]);
    git(repo, &["commit", "-q", "-m", "one"]);
    let first = GitProbe::new().unwrap().head_sha(repo).unwrap();

    write(repo, "two.py", "def two():\n    pass\n");
    git(repo, &["add", "."]);
    git(repo, &["commit", "-q", "-m", "two"]);
    let second = GitProbe::new().unwrap().head_sha(repo).unwrap();

    let mut graph = repograph_graph::RepoGraph::new("scratch");
    let evolver = Evolver::offline(GitProbe::new().unwrap());
    let range = format!("{first}..{second}");

    let report = evolver
        .evolve(&mut graph, &EvolutionOptions::new(repo, range.clone()))
        .unwrap();
    assert_eq!(report.inserted, 2); // file node + function

    // Re-applying the same range finds everything already present.
    let again = evolver
        .evolve(&mut graph, &EvolutionOptions::new(repo, range))
        .unwrap();
    assert_eq!(again.inserted, 0);
    assert_eq!(graph.stats().node_count, 2);
}
