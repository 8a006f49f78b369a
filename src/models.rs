//! Core data models shared by the surveyor and the locator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Extensions considered by every metric. Compared case-insensitively.
pub const EXTENSION_ALLOWLIST: [&str; 3] = [".h", ".cc", ".mm"];

/// Delimiter separating the test fixture from the site name in a test id.
pub const SITE_DELIMITER: &str = "All.";

/// How to count one metric. Empty lists impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MetricDefinition {
    /// At least one must occur in the file content.
    #[serde(default)]
    pub include_content_any: Vec<String>,
    /// Every one must occur in the basename.
    #[serde(default)]
    pub include_filename_all: Vec<String>,
    /// Any one occurring in the basename rejects the file.
    #[serde(default)]
    pub exclude_filename_any: Vec<String>,
    /// Occurrences of each term are summed over qualifying files.
    #[serde(default)]
    pub content_tally_terms: Vec<String>,
}

impl MetricDefinition {
    /// Whether evaluating this metric requires reading file content.
    pub fn needs_content(&self) -> bool {
        !self.include_content_any.is_empty()
            || self.content_tally_terms.iter().any(|t| !t.is_empty())
    }
}

/// Outcome of counting one metric over a subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricResult {
    pub matched_files: u64,
    pub tally_total: u64,
}

/// Which build-graph property a query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    SourceCount,
    CircularIncludeCount,
}

/// One named build-graph query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BuildGraphQuery {
    pub target: String,
    pub kind: QueryKind,
}

/// Configuration for the owned-object inventory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OwnedObjectSpec {
    /// Header holding owned-field declarations, relative to the survey root.
    pub browser_header: PathBuf,
    /// A line declares an owned field if it contains any of these.
    pub declarator_tokens: Vec<String>,
    /// ...and none of these.
    pub disqualifier_tokens: Vec<String>,
    /// Subtree scanned for user-data inheritance, relative to the survey root.
    #[serde(default = "default_user_data_root")]
    pub user_data_root: PathBuf,
    /// Literal substring counted across every file under `user_data_root`.
    pub user_data_substring: String,
}

fn default_user_data_root() -> PathBuf {
    PathBuf::from(".")
}

/// The surveyor's output: commit identity plus one integer per catalog key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsRecord {
    pub commit_hash: String,
    pub timestamp: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, u64>,
}

impl MetricsRecord {
    /// All keys of the emitted JSON object, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = vec!["commit_hash".into(), "timestamp".into()];
        keys.extend(self.values.keys().cloned());
        keys.sort();
        keys
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.values.get(key).copied()
    }
}

/// A CI builder reachable through a short alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bot {
    Autofill,
    Password,
}

impl Bot {
    pub const ALIASES: [&'static str; 2] = ["autofill", "password"];

    /// Resolve a short name. The set is closed; anything else is `None`.
    pub fn from_alias(alias: &str) -> Option<Bot> {
        match alias {
            "autofill" => Some(Bot::Autofill),
            "password" => Some(Bot::Password),
            _ => None,
        }
    }

    pub fn alias(&self) -> &'static str {
        match self {
            Bot::Autofill => "autofill",
            Bot::Password => "password",
        }
    }

    /// Full builder name on the CI service.
    pub fn builder(&self) -> &'static str {
        match self {
            Bot::Autofill => "linux-autofill-captured-sites-rel",
            Bot::Password => "linux-password-manager-captured-sites-rel",
        }
    }
}

/// A build looked up on the CI service. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRef {
    pub builder: String,
    pub number: u64,
    pub fingerprint: String,
    pub build_id: String,
}

/// Terminal status of one test result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestStatus {
    Pass,
    Fail,
    Crash,
    Timeout,
    Other(String),
}

impl TestStatus {
    pub fn parse(raw: &str) -> TestStatus {
        match raw {
            "PASS" => TestStatus::Pass,
            "FAIL" => TestStatus::Fail,
            "CRASH" => TestStatus::Crash,
            "TIMEOUT" => TestStatus::Timeout,
            other => TestStatus::Other(other.to_string()),
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, TestStatus::Pass)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub test_id: String,
    pub status: TestStatus,
}

impl TestResult {
    pub fn new(test_id: impl Into<String>, status: TestStatus) -> Self {
        Self {
            test_id: test_id.into(),
            status,
        }
    }

    /// Portion of the id after the last `All.`; the whole id when absent.
    pub fn site_name(&self) -> &str {
        match self.test_id.rfind(SITE_DELIMITER) {
            Some(pos) => &self.test_id[pos + SITE_DELIMITER.len()..],
            None => &self.test_id,
        }
    }
}

/// Everything the version-control bisection needs. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BisectionPlan {
    pub good: String,
    pub bad: String,
    pub build_command: String,
    pub run_command: String,
}
