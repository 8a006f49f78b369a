//! The regression locator.
//!
//! Given a failing build on one of the captured-sites builders, find the
//! build before it, work out which sites newly fail, and bisect the local
//! checkout between the two revisions by building and running one site at
//! each step.
//!
//! # Workflow
//!
//! 1. Look up build `N` (bad) and `N - 1` (good) on the CI service.
//! 2. Fetch both builds' test results and compute the regression set: sites
//!    non-PASS in the bad build that were not already non-PASS in the good one.
//! 3. Pick the site: the `--site_name` override if given (with a warning
//!    when it is not a regression), else the first regression.
//! 4. Translate the site into runner arguments and assemble the plan.
//! 5. Print the plan; unless print-only, hand it to the VCS bisection.
//!
//! A dirty working tree is refused before anything is looked up, unless the
//! run is print-only or dirty trees are allowed.

use anyhow::Result;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::error::{oracle_failure, BedrockError};
use crate::models::{BisectionPlan, Bot, BuildRef, TestResult};
use crate::traits::{BuildRunner, CiOracle, TestRunner, VersionControl};

/// Site-name prefixes that select a password-manager scenario.
pub const PASSWORD_SCENARIO_PREFIXES: [&str; 4] = [
    "sign_up_fill",
    "sign_up_pass",
    "sign_in_pass",
    "capture_update_pass",
];

/// Immutable inputs of one locator run.
#[derive(Debug, Clone)]
pub struct LocateRequest {
    pub bot: Bot,
    pub bad_build_number: u64,
    pub site_override: Option<String>,
    pub print_only: bool,
    pub allow_dirty: bool,
    pub project: String,
    pub bucket: String,
}

/// The site chosen for bisection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSelection {
    pub site: String,
    /// False when an override names a site outside the regression set.
    pub is_regression: bool,
}

#[derive(Debug, Clone)]
pub struct LocateOutcome {
    pub bad_build: BuildRef,
    pub good_build: BuildRef,
    pub regressions: Vec<String>,
    pub selection: SiteSelection,
    pub site_args: Vec<String>,
    pub plan: BisectionPlan,
    /// Whether the plan was handed to the VCS bisection.
    pub bisected: bool,
}

/// Resolve a bot alias. The alias set is closed.
pub fn parse_bot(alias: &str) -> Result<Bot> {
    Bot::from_alias(alias).ok_or_else(|| {
        BedrockError::user_input(format!(
            "unknown bot '{}': expected one of {}",
            alias,
            Bot::ALIASES.join(", ")
        ))
        .into()
    })
}

/// Parse a bad build number. It must be a positive integer with a
/// predecessor.
pub fn parse_build_number(raw: &str) -> Result<u64> {
    let number: u64 = raw.trim().parse().map_err(|_| {
        BedrockError::user_input(format!("build number must be a positive integer, got '{}'", raw))
    })?;
    previous_build(number)?;
    Ok(number)
}

/// The build compared against `bad`. Builds 0 and 1 have none.
fn previous_build(bad: u64) -> Result<u64> {
    match bad.checked_sub(1) {
        Some(good) if good >= 1 => Ok(good),
        _ => Err(BedrockError::user_input(format!(
            "build {} has no previous build to compare against",
            bad
        ))
        .into()),
    }
}

/// Sites non-PASS in `bad` and not non-PASS in `good`, de-duplicated, in
/// the order `bad` lists them.
pub fn regression_set(bad: &[TestResult], good: &[TestResult]) -> Vec<String> {
    let already_failing: HashSet<&str> = good
        .iter()
        .filter(|r| !r.status.is_pass())
        .map(|r| r.site_name())
        .collect();

    let mut seen = HashSet::new();
    let mut regressions = Vec::new();
    for result in bad.iter().filter(|r| !r.status.is_pass()) {
        let site = result.site_name();
        if already_failing.contains(site) || !seen.insert(site) {
            continue;
        }
        regressions.push(site.to_string());
    }
    regressions
}

/// Choose the site to bisect.
pub fn select_site(
    regressions: &[String],
    site_override: Option<&str>,
    bad_results: &[TestResult],
    bad_build: u64,
) -> Result<SiteSelection> {
    if let Some(site) = site_override {
        return Ok(SiteSelection {
            site: site.to_string(),
            is_regression: regressions.iter().any(|r| r == site),
        });
    }

    match regressions.first() {
        Some(site) => Ok(SiteSelection {
            site: site.clone(),
            is_regression: true,
        }),
        None if bad_results.iter().all(|r| r.status.is_pass()) => {
            Err(BedrockError::EmptyRegression(format!(
                "no clear site regressions: build {} has no failing tests \
                 (infra failure, not supported)",
                bad_build
            ))
            .into())
        }
        None => Err(BedrockError::EmptyRegression(format!(
            "no clear site regressions between builds {} and {}: every failure \
             was already failing; pass --site_name to bisect one anyway",
            bad_build.saturating_sub(1),
            bad_build
        ))
        .into()),
    }
}

/// Split a site into runner arguments: `[scenario, rest]` for password
/// scenarios, `[site]` otherwise.
pub fn translate_site(site: &str) -> Vec<String> {
    for prefix in PASSWORD_SCENARIO_PREFIXES {
        if let Some(rest) = site
            .strip_prefix(prefix)
            .and_then(|r| r.strip_prefix('_'))
        {
            return vec![prefix.to_string(), rest.to_string()];
        }
    }
    vec![site.to_string()]
}

/// Human-readable plan, one field per line.
pub fn render_plan(plan: &BisectionPlan) -> String {
    format!(
        "good revision: {}\nbad revision:  {}\nbuild command: {}\nrun command:   {}",
        plan.good, plan.bad, plan.build_command, plan.run_command
    )
}

/// Derive the plan for `request` and, unless print-only, bisect.
pub fn locate(
    request: &LocateRequest,
    vco: &dyn VersionControl,
    ci: &dyn CiOracle,
    build_runner: &dyn BuildRunner,
    test_runner: &dyn TestRunner,
) -> Result<LocateOutcome> {
    let builder = request.bot.builder();
    let bad_number = request.bad_build_number;
    let good_number = previous_build(bad_number)?;

    if !request.print_only && !request.allow_dirty {
        let dirty = vco
            .has_uncommitted_changes()
            .map_err(|e| oracle_failure("working-tree status", e))?;
        if dirty {
            return Err(BedrockError::oracle(
                "working-tree status",
                "uncommitted changes present; commit or stash them, or pass --allow-dirty",
            )
            .into());
        }
    }

    let fetch_build = |number: u64| {
        ci.get_build(&request.project, &request.bucket, builder, number)
            .map_err(|e| oracle_failure(&format!("get-build {} #{}", builder, number), e))
    };
    let bad_build = fetch_build(bad_number)?;
    let good_build = fetch_build(good_number)?;

    let fetch_results = |build: &BuildRef| {
        ci.get_results(&build.build_id).map_err(|e| {
            oracle_failure(&format!("get-results {} #{}", builder, build.number), e)
        })
    };
    let bad_results = fetch_results(&bad_build)?;
    let good_results = fetch_results(&good_build)?;

    let regressions = regression_set(&bad_results, &good_results);
    info!(
        bad = bad_number,
        good = good_number,
        regressions = regressions.len(),
        "compared builds"
    );

    let selection = select_site(
        &regressions,
        request.site_override.as_deref(),
        &bad_results,
        bad_number,
    )?;
    if !selection.is_regression {
        warn!(
            site = %selection.site,
            "site is not a new failure in build {}; bisecting anyway",
            bad_number
        );
    }

    let site_args = translate_site(&selection.site);

    let bad_rev = vco
        .resolve(&bad_build.fingerprint)
        .map_err(|e| oracle_failure(&format!("resolve bad revision {}", bad_build.fingerprint), e))?;
    let good_rev = vco
        .resolve(&good_build.fingerprint)
        .map_err(|e| oracle_failure(&format!("resolve good revision {}", good_build.fingerprint), e))?;

    let plan = BisectionPlan {
        good: good_rev,
        bad: bad_rev,
        build_command: build_runner.build_command(request.bot),
        run_command: test_runner.run_command(request.bot, &site_args),
    };

    println!("site: {}", selection.site);
    println!("{}", render_plan(&plan));

    let mut outcome = LocateOutcome {
        bad_build,
        good_build,
        regressions,
        selection,
        site_args,
        plan,
        bisected: false,
    };

    if request.print_only {
        return Ok(outcome);
    }

    vco.bisect(&outcome.plan)
        .map_err(|e| oracle_failure("bisect", e))?;
    outcome.bisected = true;
    Ok(outcome)
}
