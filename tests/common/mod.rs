//! Canned collaborators shared by the integration tests.

#![allow(dead_code)]

use anyhow::{bail, Result};
use bedrock_tools::models::{BisectionPlan, Bot, BuildRef, QueryKind, TestResult};
use bedrock_tools::traits::{BuildGraphOracle, BuildRunner, CiOracle, TestRunner, VersionControl};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::Path;

// ─── Version control ────────────────────────────────────────────────

pub struct FakeVcs {
    pub head: String,
    pub timestamp: String,
    pub known_revisions: Vec<String>,
    pub dirty: bool,
    pub fail_head: bool,
    pub bisect_calls: RefCell<Vec<BisectionPlan>>,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self {
            head: "0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f".to_string(),
            timestamp: "2024-05-06T07:08:09+00:00".to_string(),
            known_revisions: Vec::new(),
            dirty: false,
            fail_head: false,
            bisect_calls: RefCell::new(Vec::new()),
        }
    }

    pub fn knowing(revisions: &[&str]) -> Self {
        let mut vcs = Self::new();
        vcs.known_revisions = revisions.iter().map(|s| s.to_string()).collect();
        vcs
    }
}

impl VersionControl for FakeVcs {
    fn head_fingerprint(&self) -> Result<String> {
        if self.fail_head {
            bail!("not a git repository");
        }
        Ok(self.head.clone())
    }

    fn head_timestamp(&self) -> Result<String> {
        Ok(self.timestamp.clone())
    }

    fn resolve(&self, descriptor: &str) -> Result<String> {
        match self
            .known_revisions
            .iter()
            .find(|r| r.starts_with(descriptor))
        {
            Some(full) => Ok(full.clone()),
            None => bail!("unknown revision {}", descriptor),
        }
    }

    fn has_uncommitted_changes(&self) -> Result<bool> {
        Ok(self.dirty)
    }

    fn bisect(&self, plan: &BisectionPlan) -> Result<()> {
        self.bisect_calls.borrow_mut().push(plan.clone());
        Ok(())
    }
}

// ─── CI service ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeCi {
    pub builds: HashMap<u64, BuildRef>,
    pub results: HashMap<String, Vec<TestResult>>,
    pub lookups: RefCell<Vec<(String, String, String, u64)>>,
}

impl FakeCi {
    /// Register build `number` at `revision` with `results`.
    pub fn with_build(mut self, number: u64, revision: &str, results: Vec<TestResult>) -> Self {
        let build_id = format!("88000000000000{:05}", number);
        self.builds.insert(
            number,
            BuildRef {
                builder: "fake".to_string(),
                number,
                fingerprint: revision.to_string(),
                build_id: build_id.clone(),
            },
        );
        self.results.insert(build_id, results);
        self
    }
}

impl CiOracle for FakeCi {
    fn get_build(&self, project: &str, bucket: &str, builder: &str, number: u64) -> Result<BuildRef> {
        self.lookups.borrow_mut().push((
            project.to_string(),
            bucket.to_string(),
            builder.to_string(),
            number,
        ));
        match self.builds.get(&number) {
            Some(b) => Ok(BuildRef {
                builder: builder.to_string(),
                ..b.clone()
            }),
            None => bail!("build {} not found", number),
        }
    }

    fn get_results(&self, build_id: &str) -> Result<Vec<TestResult>> {
        match self.results.get(build_id) {
            Some(r) => Ok(r.clone()),
            None => bail!("no results for {}", build_id),
        }
    }
}

// ─── Build graph ────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeGraph {
    pub answers: HashMap<(String, QueryKind), u64>,
    pub fail_with: Option<String>,
}

impl FakeGraph {
    pub fn answering(mut self, target: &str, kind: QueryKind, value: u64) -> Self {
        self.answers.insert((target.to_string(), kind), value);
        self
    }
}

impl BuildGraphOracle for FakeGraph {
    fn query(&self, _build_dir: &Path, target: &str, kind: QueryKind) -> Result<u64> {
        if let Some(msg) = &self.fail_with {
            bail!("{}", msg);
        }
        match self.answers.get(&(target.to_string(), kind)) {
            Some(v) => Ok(*v),
            None => bail!("non-integer reply for {}", target),
        }
    }
}

// ─── Runners ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingRunner {
    pub build_calls: Cell<usize>,
    pub run_calls: RefCell<Vec<Vec<String>>>,
}

impl BuildRunner for RecordingRunner {
    fn build_command(&self, bot: Bot) -> String {
        self.build_calls.set(self.build_calls.get() + 1);
        format!("build {}", bot.alias())
    }
}

impl TestRunner for RecordingRunner {
    fn run_command(&self, bot: Bot, site_args: &[String]) -> String {
        self.run_calls.borrow_mut().push(site_args.to_vec());
        format!("run {} {}", bot.alias(), site_args.join(" "))
    }
}
