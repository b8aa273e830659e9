//! Git subprocess probe.
//!
//! The binary path is resolved once per probe and passed explicitly to every
//! invocation; no reliance on process-wide search paths after construction.
//! Every call runs under a timeout and surfaces failures as typed
//! `RpgError::Vcs` values.

use repograph_core::RpgError;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::mpsc;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct GitProbe {
    binary: PathBuf,
    timeout: Duration,
}

impl GitProbe {
    /// Resolve `git` from the environment once.
    pub fn new() -> Result<Self, RpgError> {
        let binary =
            which::which("git").map_err(|e| RpgError::Vcs(format!("git not found: {e}")))?;
        Ok(Self {
            binary,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Use an explicit binary path (tests, unusual installs).
    pub fn with_binary(binary: PathBuf) -> Self {
        Self {
            binary,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Run git with `-C <repo>`, enforcing the timeout. Spawn failures and
    /// timeouts are errors; a non-zero exit is returned for inspection.
    fn run_raw(&self, repo: &Path, args: &[&str]) -> Result<Output, RpgError> {
        let binary = self.binary.clone();
        let repo = repo.to_path_buf();
        let owned: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let display = owned.join(" ");

        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let result = Command::new(&binary)
                .arg("-C")
                .arg(&repo)
                .args(&owned)
                .stdin(Stdio::null())
                .output();
            let _ = tx.send(result);
        });

        let output = rx
            .recv_timeout(self.timeout)
            .map_err(|_| {
                RpgError::Vcs(format!(
                    "git {display} timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| RpgError::Vcs(format!("git {display} failed to start: {e}")))?;
        Ok(output)
    }

    /// Run git and require a zero exit, returning stdout.
    fn run(&self, repo: &Path, args: &[&str]) -> Result<String, RpgError> {
        let output = self.run_raw(repo, args)?;
        if !output.status.success() {
            return Err(RpgError::Vcs(format!(
                "git {} exited with {}: {}",
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Current HEAD commit, validated as 40 hex chars.
    pub fn head_sha(&self, repo: &Path) -> Result<String, RpgError> {
        let sha = self.run(repo, &["rev-parse", "HEAD"])?.trim().to_string();
        if sha.len() != 40 || !sha.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(RpgError::Vcs(format!("malformed HEAD sha: {sha:?}")));
        }
        Ok(sha)
    }

    /// Current branch name, or "" on a detached HEAD.
    pub fn current_branch(&self, repo: &Path) -> Result<String, RpgError> {
        let branch = self
            .run(repo, &["rev-parse", "--abbrev-ref", "HEAD"])?
            .trim()
            .to_string();
        Ok(if branch == "HEAD" { String::new() } else { branch })
    }

    /// The repository's default branch. Prefers the origin HEAD ref, then
    /// local `main`/`master`, then falls back to "main".
    pub fn default_branch(&self, repo: &Path) -> Result<String, RpgError> {
        if let Ok(output) =
            self.run(repo, &["symbolic-ref", "--short", "refs/remotes/origin/HEAD"])
        {
            if let Some(name) = output.trim().rsplit('/').next() {
                if !name.is_empty() {
                    return Ok(name.to_string());
                }
            }
        }
        for candidate in ["main", "master"] {
            let probe = self.run_raw(repo, &["rev-parse", "--verify", "--quiet", candidate])?;
            if probe.status.success() {
                return Ok(candidate.to_string());
            }
        }
        tracing::debug!("no default branch detected, assuming main");
        Ok("main".to_string())
    }

    pub fn merge_base(&self, repo: &Path, a: &str, b: &str) -> Result<String, RpgError> {
        Ok(self.run(repo, &["merge-base", a, b])?.trim().to_string())
    }

    /// Raw name-status output for a commit range or single revision.
    pub fn name_status(&self, repo: &Path, range: &str) -> Result<String, RpgError> {
        if range.contains("..") {
            self.run(repo, &["diff", "--name-status", range])
        } else {
            self.run(
                repo,
                &[
                    "diff-tree",
                    "--no-commit-id",
                    "--name-status",
                    "-r",
                    "--root",
                    range,
                ],
            )
        }
    }

    /// File content at a revision, or `None` if the path does not exist there.
    pub fn file_at_revision(
        &self,
        repo: &Path,
        rev: &str,
        path: &str,
    ) -> Result<Option<String>, RpgError> {
        let spec = format!("{rev}:{path}");
        let output = self.run_raw(repo, &["show", &spec])?;
        if !output.status.success() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_fails_fast() {
        let probe = GitProbe::with_binary(PathBuf::from("/nonexistent/git-binary"));
        let err = probe
            .run(Path::new("/tmp"), &["rev-parse", "HEAD"])
            .unwrap_err();
        assert!(matches!(err, RpgError::Vcs(_)));
    }

    #[cfg(unix)]
    #[test]
    fn timeout_is_a_vcs_error() {
        use std::os::unix::fs::PermissionsExt;

        // A stand-in binary that ignores its args and outlives the timeout.
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("slow-git");
        std::fs::write(&script, "#!/bin/sh\nsleep 5\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut probe = GitProbe::with_binary(script);
        probe.set_timeout(Duration::from_millis(50));
        let err = probe.run(dir.path(), &["rev-parse", "HEAD"]).unwrap_err();
        assert!(err.to_string().contains("timed out"), "got: {err}");
    }
}
