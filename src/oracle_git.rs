//! [`VersionControl`] backed by the `git` binary.
//!
//! Every call runs `git` with the checkout as its working directory and
//! blocks until it exits. A non-zero exit becomes an error carrying git's
//! trimmed stderr.
//!
//! Bisection runs `git bisect start <bad> <good>`, then `git bisect run`
//! with a small shell step:
//!
//! ```text
//! <build> || exit 125    # build failure: skip this revision
//! <run>   || exit 1      # any run failure: bad
//! ```
//!
//! `exit 125` is git's "cannot test" code, and forcing other failures to 1
//! keeps a crashing runner (exit >= 128) from aborting the whole bisection.
//! `git bisect reset` always runs afterwards.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{info, warn};

use crate::error::BedrockError;
use crate::models::BisectionPlan;
use crate::traits::VersionControl;

/// Exit code `git bisect run` treats as "skip this revision".
pub const SKIP_EXIT_CODE: i32 = 125;

pub struct GitOracle {
    repo_dir: PathBuf,
}

impl GitOracle {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    /// Run git and return trimmed stdout.
    fn git(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .with_context(|| "Failed to execute 'git'. Is git installed?")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("git {} failed: {}", args.join(" "), stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run git with inherited stdio so bisection progress is visible.
    fn git_interactive(&self, args: &[&str]) -> Result<()> {
        let status = Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .with_context(|| format!("Failed to execute 'git {}'", args.join(" ")))?;

        if !status.success() {
            bail!("git {} exited with {}", args.join(" "), status);
        }
        Ok(())
    }
}

/// The shell step `git bisect run` executes for each candidate.
pub fn bisect_step_script(plan: &BisectionPlan) -> String {
    format!(
        "{} || exit {}; {} || exit 1",
        plan.build_command, SKIP_EXIT_CODE, plan.run_command
    )
}

impl VersionControl for GitOracle {
    fn head_fingerprint(&self) -> Result<String> {
        self.git(&["rev-parse", "HEAD"])
    }

    fn head_timestamp(&self) -> Result<String> {
        self.git(&["log", "-1", "--format=%cI", "HEAD"])
    }

    fn resolve(&self, descriptor: &str) -> Result<String> {
        let spec = format!("{}^{{commit}}", descriptor);
        self.git(&["rev-parse", "--verify", "--quiet", spec.as_str()])
            .map_err(|_| {
                BedrockError::oracle(
                    "resolve revision",
                    format!(
                        "{} is not present in {}; fetch it first",
                        descriptor,
                        self.repo_dir.display()
                    ),
                )
                .into()
            })
    }

    fn has_uncommitted_changes(&self) -> Result<bool> {
        let status = self.git(&["status", "--porcelain", "--untracked-files=no"])?;
        Ok(!status.is_empty())
    }

    fn bisect(&self, plan: &BisectionPlan) -> Result<()> {
        info!(good = %plan.good, bad = %plan.bad, "starting git bisect");
        self.git_interactive(&["bisect", "start", plan.bad.as_str(), plan.good.as_str()])?;

        let script = bisect_step_script(plan);
        let run = self.git_interactive(&["bisect", "run", "sh", "-c", script.as_str()]);

        if let Ok(log) = self.git(&["bisect", "log"]) {
            println!("{}", log);
        }
        if let Err(err) = self.git(&["bisect", "reset"]) {
            warn!(%err, "git bisect reset failed; run it manually");
        }

        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn init_repo() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let oracle = GitOracle::new(tmp.path());
        oracle.git(&["init", "-q"]).unwrap();
        oracle.git(&["config", "user.email", "dev@example.com"]).unwrap();
        oracle.git(&["config", "user.name", "Dev"]).unwrap();
        fs::write(tmp.path().join("a.cc"), "int main() {}\n").unwrap();
        oracle.git(&["add", "a.cc"]).unwrap();
        oracle
            .git(&["-c", "commit.gpgsign=false", "commit", "-q", "-m", "initial"])
            .unwrap();
        tmp
    }

    #[test]
    fn step_script_skips_build_failures() {
        let plan = BisectionPlan {
            good: "g".into(),
            bad: "b".into(),
            build_command: "make".into(),
            run_command: "./run site".into(),
        };
        assert_eq!(
            bisect_step_script(&plan),
            "make || exit 125; ./run site || exit 1"
        );
    }

    #[test]
    fn head_and_resolve_agree() {
        if !git_available() {
            return;
        }
        let repo = init_repo();
        let oracle = GitOracle::new(repo.path());
        let head = oracle.head_fingerprint().unwrap();
        assert_eq!(head.len(), 40);
        assert_eq!(oracle.resolve(&head[..10]).unwrap(), head);
        assert!(!oracle.head_timestamp().unwrap().is_empty());
    }

    #[test]
    fn resolve_missing_revision_is_oracle_error() {
        if !git_available() {
            return;
        }
        let repo = init_repo();
        let oracle = GitOracle::new(repo.path());
        let err = oracle
            .resolve("0123456789abcdef0123456789abcdef01234567")
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BedrockError>(),
            Some(BedrockError::Oracle { .. })
        ));
    }

    #[test]
    fn dirty_tree_is_detected() {
        if !git_available() {
            return;
        }
        let repo = init_repo();
        let oracle = GitOracle::new(repo.path());
        assert!(!oracle.has_uncommitted_changes().unwrap());
        fs::write(repo.path().join("a.cc"), "int main() { return 1; }\n").unwrap();
        assert!(oracle.has_uncommitted_changes().unwrap());
    }
}
