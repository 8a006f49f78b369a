//! Collaborator seams for the surveyor and the locator.
//!
//! Every process boundary the tools cross (version control, the CI
//! service, the build graph, the build and test runners) sits behind one of
//! these traits. Production implementations live in [`crate::oracle_git`],
//! [`crate::oracle_luci`], [`crate::oracle_gn`] and [`crate::runner`];
//! tests substitute canned implementations.
//!
//! ```text
//!   survey() ──▶ VersionControl (head)      locate() ──▶ CiOracle
//!            └─▶ BuildGraphOracle                    ├─▶ VersionControl (resolve, bisect)
//!                                                    ├─▶ BuildRunner
//!                                                    └─▶ TestRunner
//! ```
//!
//! All methods block until the collaborator answers.

use anyhow::Result;
use std::path::Path;

use crate::models::{BisectionPlan, Bot, BuildRef, QueryKind, TestResult};

/// The local version-control checkout.
pub trait VersionControl {
    /// Full fingerprint of HEAD.
    fn head_fingerprint(&self) -> Result<String>;

    /// Commit timestamp of HEAD as an ISO-8601 string.
    fn head_timestamp(&self) -> Result<String>;

    /// Resolve a (possibly abbreviated) commit descriptor to a full
    /// fingerprint. Fails when the commit is absent from the checkout.
    fn resolve(&self, descriptor: &str) -> Result<String>;

    /// Whether the working tree has uncommitted changes.
    fn has_uncommitted_changes(&self) -> Result<bool>;

    /// Run a bisection to completion: mark good and bad, then for every
    /// candidate run the build command (failure skips the candidate) and
    /// the run command (exit 0 is good, anything else bad).
    fn bisect(&self, plan: &BisectionPlan) -> Result<()>;
}

/// The CI service holding builds and their test results.
pub trait CiOracle {
    fn get_build(&self, project: &str, bucket: &str, builder: &str, number: u64)
        -> Result<BuildRef>;

    /// Terminal results of every test in the build, in service order.
    fn get_results(&self, build_id: &str) -> Result<Vec<TestResult>>;
}

/// Answers structural questions about build targets.
pub trait BuildGraphOracle {
    fn query(&self, build_dir: &Path, target: &str, kind: QueryKind) -> Result<u64>;
}

/// Composes the command that builds the test binary for a bot.
pub trait BuildRunner {
    fn build_command(&self, bot: Bot) -> String;
}

/// Composes the command that runs one site for a bot.
pub trait TestRunner {
    fn run_command(&self, bot: Bot, site_args: &[String]) -> String;
}
