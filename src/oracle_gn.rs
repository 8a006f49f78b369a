//! [`BuildGraphOracle`] backed by `gn desc`.
//!
//! `gn desc <build_dir> <target> <field> --format=json` prints an object
//! keyed by target label. The answer is the length of the requested list.
//! A target entry without the field has an empty list.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::models::QueryKind;
use crate::traits::BuildGraphOracle;

pub struct GnOracle {
    checkout: PathBuf,
    gn: String,
}

impl GnOracle {
    /// `checkout` is the source root `gn` runs in.
    pub fn new(checkout: impl Into<PathBuf>) -> Self {
        Self {
            checkout: checkout.into(),
            gn: "gn".to_string(),
        }
    }

    /// Use a specific `gn` executable instead of the one on `PATH`.
    pub fn with_binary(mut self, gn: impl Into<String>) -> Self {
        self.gn = gn.into();
        self
    }
}

/// The `gn desc` field answering `kind`.
pub fn desc_field(kind: QueryKind) -> &'static str {
    match kind {
        QueryKind::SourceCount => "sources",
        QueryKind::CircularIncludeCount => "allow_circular_includes_from",
    }
}

impl BuildGraphOracle for GnOracle {
    fn query(&self, build_dir: &Path, target: &str, kind: QueryKind) -> Result<u64> {
        let field = desc_field(kind);
        let output = Command::new(&self.gn)
            .arg("desc")
            .arg(build_dir)
            .arg(target)
            .arg(field)
            .arg("--format=json")
            .current_dir(&self.checkout)
            .output()
            .with_context(|| format!("Failed to execute '{}'. Is depot_tools on PATH?", self.gn))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            bail!("gn desc failed: {}{}", stderr.trim(), stdout.trim());
        }

        parse_reply(&String::from_utf8_lossy(&output.stdout), target, field)
    }
}

/// Interpret a `gn desc` reply as a single integer.
///
/// Accepts bare digits, a JSON number, or the JSON object form. Anything
/// else is an error.
pub fn parse_reply(reply: &str, target: &str, field: &str) -> Result<u64> {
    let trimmed = reply.trim();
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(trimmed.parse()?);
    }

    let json: Value = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        Err(_) => bail!("non-integer reply for {}: {:?}", target, truncate(trimmed)),
    };

    if let Some(n) = json.as_u64() {
        return Ok(n);
    }

    let entry = json
        .as_object()
        .and_then(|obj| obj.get(target).or_else(|| single_value(obj)))
        .and_then(|e| e.as_object());

    match entry {
        Some(entry) => match entry.get(field) {
            Some(Value::Array(items)) => Ok(items.len() as u64),
            None => Ok(0),
            Some(other) => bail!(
                "non-integer reply for {}: field '{}' is {}",
                target,
                field,
                other
            ),
        },
        None => bail!("non-integer reply for {}: {:?}", target, truncate(trimmed)),
    }
}

/// The value of a one-entry object (gn may print a canonicalized label).
fn single_value(obj: &serde_json::Map<String, Value>) -> Option<&Value> {
    if obj.len() == 1 {
        obj.values().next()
    } else {
        None
    }
}

fn truncate(s: &str) -> String {
    s.chars().take(120).collect()
}
