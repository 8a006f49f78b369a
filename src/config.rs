//! TOML configuration for both tools.
//!
//! Every field has a default, so an absent file, an empty file and a file
//! overriding a single table are all valid. [`Config::default`] carries the
//! built-in `chrome/browser` catalog.
//!
//! ```toml
//! [survey]
//! subtree = "chrome/browser"
//! skip_globs = [".git/**"]
//! follow_symlinks = false
//!
//! [survey.metrics.browser_list]
//! content_tally_terms = ["BrowserList::"]
//!
//! [survey.line_counts]
//! browser_h_lines = "ui/browser.h"
//!
//! [survey.build_graph.browser_sources]
//! target = "//chrome/browser:browser"
//! kind = "source_count"
//!
//! [locator]
//! control_script = "tools/captured_sites/control.py"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::models::{BuildGraphQuery, MetricDefinition, OwnedObjectSpec, QueryKind};

/// Keys the surveyor always emits; catalog entries may not reuse them.
pub const RESERVED_KEYS: [&str; 3] = ["commit_hash", "timestamp", "browser_owned_data"];

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub survey: SurveyConfig,
    #[serde(default)]
    pub locator: LocatorConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SurveyConfig {
    /// Surveyed subtree, relative to `SOURCE_DIR`.
    #[serde(default = "default_subtree")]
    pub subtree: PathBuf,
    /// Globs (relative to the subtree) excluded from the walk.
    #[serde(default)]
    pub skip_globs: Vec<String>,
    /// Follow symlinks during the walk. When off, symlinked files are skipped.
    #[serde(default)]
    pub follow_symlinks: bool,
    #[serde(default = "default_metrics")]
    pub metrics: BTreeMap<String, MetricDefinition>,
    /// Name to file path, relative to the subtree.
    #[serde(default = "default_line_counts")]
    pub line_counts: BTreeMap<String, PathBuf>,
    #[serde(default = "default_build_graph")]
    pub build_graph: BTreeMap<String, BuildGraphQuery>,
    #[serde(default = "default_owned_objects")]
    pub owned_objects: OwnedObjectSpec,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            subtree: default_subtree(),
            skip_globs: Vec::new(),
            follow_symlinks: false,
            metrics: default_metrics(),
            line_counts: default_line_counts(),
            build_graph: default_build_graph(),
            owned_objects: default_owned_objects(),
        }
    }
}

fn default_subtree() -> PathBuf {
    PathBuf::from("chrome/browser")
}

fn terms(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_metrics() -> BTreeMap<String, MetricDefinition> {
    let mut m = BTreeMap::new();
    m.insert(
        "browser_process".to_string(),
        MetricDefinition {
            content_tally_terms: terms(&["g_browser_process"]),
            include_content_any: terms(&["g_browser_process"]),
            ..Default::default()
        },
    );
    m.insert(
        "browser_list".to_string(),
        MetricDefinition {
            include_content_any: terms(&["BrowserList"]),
            content_tally_terms: terms(&["BrowserList::"]),
            exclude_filename_any: terms(&["browser_list."]),
            ..Default::default()
        },
    );
    m.insert(
        "find_browser".to_string(),
        MetricDefinition {
            include_content_any: terms(&["chrome::FindBrowser", "FindBrowserWith"]),
            content_tally_terms: terms(&[
                "FindBrowserWithTab(",
                "FindBrowserWithProfile(",
                "FindBrowserWithWindow(",
                "FindLastActiveWithProfile(",
            ]),
            exclude_filename_any: terms(&["browser_finder."]),
            ..Default::default()
        },
    );
    m.insert(
        "keyed_service_factories".to_string(),
        MetricDefinition {
            include_filename_all: terms(&["_factory"]),
            include_content_any: terms(&["ProfileKeyedServiceFactory"]),
            content_tally_terms: terms(&["GetForProfile("]),
            ..Default::default()
        },
    );
    m.insert(
        "tab_helpers".to_string(),
        MetricDefinition {
            include_filename_all: terms(&["tab_helper", ".h"]),
            exclude_filename_any: terms(&["test", "mock"]),
            content_tally_terms: terms(&["WebContentsUserData<"]),
            ..Default::default()
        },
    );
    m.insert(
        "browser_window_interface".to_string(),
        MetricDefinition {
            content_tally_terms: terms(&["BrowserWindowInterface"]),
            include_content_any: terms(&["BrowserWindowInterface"]),
            ..Default::default()
        },
    );
    m.insert(
        "browser_in_unittests".to_string(),
        MetricDefinition {
            include_filename_all: terms(&["unittest"]),
            include_content_any: terms(&["Browser*", "Browser::Create"]),
            content_tally_terms: terms(&["Browser*", "Browser::Create"]),
            ..Default::default()
        },
    );
    m
}

fn default_line_counts() -> BTreeMap<String, PathBuf> {
    let mut m = BTreeMap::new();
    m.insert("browser_h_lines".to_string(), PathBuf::from("ui/browser.h"));
    m.insert("browser_cc_lines".to_string(), PathBuf::from("ui/browser.cc"));
    m.insert(
        "browser_commands_lines".to_string(),
        PathBuf::from("ui/browser_commands.cc"),
    );
    m
}

fn default_build_graph() -> BTreeMap<String, BuildGraphQuery> {
    let mut m = BTreeMap::new();
    m.insert(
        "browser_target_sources".to_string(),
        BuildGraphQuery {
            target: "//chrome/browser:browser".to_string(),
            kind: QueryKind::SourceCount,
        },
    );
    m.insert(
        "ui_target_sources".to_string(),
        BuildGraphQuery {
            target: "//chrome/browser/ui:ui".to_string(),
            kind: QueryKind::SourceCount,
        },
    );
    m.insert(
        "browser_circular_includes".to_string(),
        BuildGraphQuery {
            target: "//chrome/browser:browser".to_string(),
            kind: QueryKind::CircularIncludeCount,
        },
    );
    m
}

fn default_owned_objects() -> OwnedObjectSpec {
    OwnedObjectSpec {
        browser_header: PathBuf::from("ui/browser.h"),
        declarator_tokens: terms(&[
            "std::unique_ptr<",
            "UnownedUserDataHost unowned_user_data_host_;",
            "ui::UnownedUserDataHost unowned_user_data_host_;",
        ]),
        disqualifier_tokens: terms(&["KeepAlive", ",", "("]),
        user_data_root: PathBuf::from("."),
        user_data_substring: "public BrowserUserData<".to_string(),
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocatorConfig {
    #[serde(default = "default_project")]
    pub project: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_buildbucket_host")]
    pub buildbucket_host: String,
    #[serde(default = "default_resultdb_host")]
    pub resultdb_host: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Captured-sites control script, relative to the checkout.
    #[serde(default = "default_control_script")]
    pub control_script: String,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            project: default_project(),
            bucket: default_bucket(),
            buildbucket_host: default_buildbucket_host(),
            resultdb_host: default_resultdb_host(),
            timeout_secs: default_timeout_secs(),
            control_script: default_control_script(),
        }
    }
}

fn default_project() -> String {
    "chromium".to_string()
}
fn default_bucket() -> String {
    "ci".to_string()
}
fn default_buildbucket_host() -> String {
    "cr-buildbucket.appspot.com".to_string()
}
fn default_resultdb_host() -> String {
    "results.api.cr.dev".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_control_script() -> String {
    "tools/captured_sites/control.py".to_string()
}

impl SurveyConfig {
    /// Every key the surveyor emits for this catalog, sorted.
    pub fn record_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = RESERVED_KEYS.iter().map(|k| k.to_string()).collect();
        for name in self.metrics.keys() {
            keys.push(format!("{}_files", name));
            keys.push(format!("{}_matches", name));
        }
        keys.extend(self.line_counts.keys().cloned());
        keys.extend(self.build_graph.keys().cloned());
        keys.sort();
        keys
    }

    /// Reject catalogs whose derived keys would collide.
    pub fn validate(&self) -> Result<()> {
        for name in self
            .metrics
            .keys()
            .chain(self.line_counts.keys())
            .chain(self.build_graph.keys())
        {
            if name.trim().is_empty() {
                bail!("survey catalog entries must have a non-empty name");
            }
        }

        let keys = self.record_keys();
        let mut seen = BTreeSet::new();
        for key in &keys {
            if !seen.insert(key.as_str()) {
                bail!("survey catalog key '{}' is defined more than once", key);
            }
        }

        for query in self.build_graph.values() {
            if query.target.is_empty() {
                bail!("survey.build_graph entries need a target label");
            }
        }

        Ok(())
    }
}

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    config.survey.validate()?;

    if config.locator.timeout_secs == 0 {
        bail!("locator.timeout_secs must be > 0");
    }
    if config.locator.control_script.trim().is_empty() {
        bail!("locator.control_script must not be empty");
    }

    Ok(config)
}

/// Load `path` when given, otherwise the built-in defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => load_config(p),
        None => Ok(Config::default()),
    }
}
