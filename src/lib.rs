//! # Bedrock Tools
//!
//! Tooling for tracking and protecting the browser-layer refactor of a
//! Chromium checkout.
//!
//! Two tools share this crate: a **surveyor** that measures how far the
//! refactor has come (counts of legacy patterns, header sizes, build-graph
//! figures) at the current commit, and a **locator** that takes a failing
//! captured-sites CI build, finds the newly failing site, and bisects the
//! local checkout to the culprit.
//!
//! ## Architecture
//!
//! ```text
//!        (surveyor)                         (locator)
//! ┌──────────────────┐               ┌──────────────────┐
//! │ walker           │               │ CiOracle (LUCI)  │
//! │ predicate        │               │ VersionControl   │
//! │ line_count       │               │ Build/TestRunner │
//! │ inventory        │               └────────┬─────────┘
//! │ BuildGraphOracle │                        ▼
//! └────────┬─────────┘               regression set → plan
//!          ▼                                  ▼
//!   MetricsRecord (JSON)                  git bisect
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! bedrock metrics ~/chromium/src out/Default metrics.json
//! bedrock bisect autofill 4521 --print_only
//! bedrock bisect password 1177 --site_name sign_in_pass_example_site
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and the built-in catalog |
//! | [`error`] | Typed failure kinds |
//! | [`models`] | Core data types |
//! | [`walker`] | Deterministic source-tree traversal |
//! | [`predicate`] | Per-metric filename and content predicates |
//! | [`line_count`] | Line counts of named files |
//! | [`inventory`] | Owned-object inventory of the browser header |
//! | [`survey`] | Surveyor orchestration and record output |
//! | [`locate`] | Regression set, site translation, bisection plan |
//! | [`traits`] | Collaborator seams |
//! | [`oracle_git`] | Version control via `git` |
//! | [`oracle_luci`] | CI builds and results via LUCI pRPC |
//! | [`oracle_gn`] | Build graph via `gn desc` |
//! | [`runner`] | Captured-sites build and run commands |

pub mod config;
pub mod error;
pub mod inventory;
pub mod line_count;
pub mod locate;
pub mod models;
pub mod oracle_git;
pub mod oracle_gn;
pub mod oracle_luci;
pub mod predicate;
pub mod runner;
pub mod survey;
pub mod traits;
pub mod walker;
