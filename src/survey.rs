//! The source surveyor.
//!
//! Walks a subtree once and produces a [`MetricsRecord`]: per-metric file and
//! match counts, line counts of named files, build-graph figures, and the
//! owned-object inventory, stamped with the HEAD fingerprint and timestamp.
//!
//! Each file's content is read at most once, only when a metric or the
//! user-data count needs it, and is released before the next file.
//!
//! The key set of the record depends only on the catalog. Files that are
//! missing or unreadable contribute 0; they never remove a key.

use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::config::SurveyConfig;
use crate::error::{oracle_failure, BedrockError};
use crate::inventory::{self, OwnedObjectInventory, UserDataTally};
use crate::line_count;
use crate::models::MetricsRecord;
use crate::predicate::MetricCounter;
use crate::traits::{BuildGraphOracle, VersionControl};
use crate::walker;

/// Inputs of one survey run.
#[derive(Debug, Clone, Copy)]
pub struct SurveyRequest<'a> {
    /// The subtree to walk.
    pub root: &'a Path,
    /// Build output directory handed to the build-graph oracle.
    pub build_dir: &'a Path,
    pub catalog: &'a SurveyConfig,
}

/// Compute the metrics record for `request.root`.
pub fn survey(
    request: SurveyRequest<'_>,
    vco: &dyn VersionControl,
    build_graph: &dyn BuildGraphOracle,
) -> Result<MetricsRecord> {
    let catalog = request.catalog;
    let files =
        walker::walk_source_files(request.root, &catalog.skip_globs, catalog.follow_symlinks)?;

    let commit_hash = vco
        .head_fingerprint()
        .map_err(|e| oracle_failure("head-fingerprint", e))?;
    let raw_timestamp = vco
        .head_timestamp()
        .map_err(|e| oracle_failure("head-timestamp", e))?;
    let timestamp = normalize_timestamp(&raw_timestamp)?;

    let mut values = BTreeMap::new();

    let mut counters: Vec<(&String, MetricCounter)> = catalog
        .metrics
        .iter()
        .map(|(name, def)| (name, MetricCounter::new(def)))
        .collect();
    let mut user_data = UserDataTally::new(request.root, &catalog.owned_objects);

    // One read per file at most; the content is dropped before the next file.
    for file in &files {
        let wanted = user_data.wants_content(file)
            || counters.iter().any(|(_, c)| c.wants_content(file));
        let content = if wanted {
            file.read_content()
        } else {
            String::new()
        };
        for (_, counter) in counters.iter_mut() {
            counter.observe(file, &content);
        }
        user_data.observe(file, &content);
    }
    for (name, counter) in counters {
        let result = counter.finish();
        debug!(metric = %name, files = result.matched_files, matches = result.tally_total);
        values.insert(format!("{}_files", name), result.matched_files);
        values.insert(format!("{}_matches", name), result.tally_total);
    }

    for (name, rel_path) in &catalog.line_counts {
        values.insert(name.clone(), line_count::line_count_of(&request.root.join(rel_path)));
    }

    for (name, query) in &catalog.build_graph {
        let operation = format!("build-graph query {} ({})", name, query.target);
        let value = build_graph
            .query(request.build_dir, &query.target, query.kind)
            .map_err(|e| oracle_failure(&operation, e))?;
        values.insert(name.clone(), value);
    }

    let owned = OwnedObjectInventory {
        directly_owned_count: inventory::directly_owned(request.root, &catalog.owned_objects),
        user_data_count: user_data.finish(),
    };
    debug!(
        directly_owned_count = owned.directly_owned_count,
        user_data_count = owned.user_data_count,
        "owned-object inventory"
    );
    values.insert("browser_owned_data".to_string(), owned.total());

    info!(
        commit = %commit_hash,
        files = files.len(),
        keys = values.len() + 2,
        "survey complete"
    );

    Ok(MetricsRecord {
        commit_hash,
        timestamp,
        values,
    })
}

/// Normalize an ISO-8601 (or `git %ci`) timestamp to `YYYY-MM-DD HH:MM:SS`
/// in the commit's own offset.
pub fn normalize_timestamp(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let parsed: Option<DateTime<FixedOffset>> = DateTime::parse_from_rfc3339(raw)
        .ok()
        .or_else(|| DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S %z").ok());
    match parsed {
        Some(dt) => Ok(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        None => Err(BedrockError::oracle(
            "head-timestamp",
            format!("unrecognized timestamp '{}'", raw),
        )
        .into()),
    }
}

/// Write `record` to `path` as a single compact JSON object, replacing any
/// previous content.
pub fn write_record(record: &MetricsRecord, path: &Path) -> Result<()> {
    let io_err = |source: std::io::Error| BedrockError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = std::fs::File::create(path).map_err(io_err)?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer(&mut writer, record).map_err(|e| io_err(e.into()))?;
    writer.flush().map_err(io_err)?;
    Ok(())
}
