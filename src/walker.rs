//! Deterministic filesystem traversal for the surveyor.
//!
//! Walks a subtree once, sorted by file name at every level, and yields
//! [`SourceFile`]s. A `SourceFile` carries no content; callers read it with
//! [`read_lossy`] while processing the file and drop it afterwards.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::BedrockError;
use crate::models::EXTENSION_ALLOWLIST;

/// A regular file found under the traversal root.
#[derive(Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub relative_path: String,
    pub basename: String,
    /// Lowercase, including the leading dot. Empty when there is none.
    pub extension: String,
}

impl SourceFile {
    pub fn new(path: PathBuf, relative_path: String) -> Self {
        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        Self {
            path,
            relative_path,
            basename,
            extension,
        }
    }

    pub fn has_allowed_extension(&self) -> bool {
        EXTENSION_ALLOWLIST.contains(&self.extension.as_str())
    }

    /// File content decoded leniently. Read fresh on every call.
    pub fn read_content(&self) -> String {
        read_lossy(&self.path)
    }
}

/// Read a file as UTF-8, replacing invalid bytes. Unreadable files are empty.
pub fn read_lossy(path: &Path) -> String {
    match std::fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(err) => {
            debug!(path = %path.display(), %err, "unreadable file treated as empty");
            String::new()
        }
    }
}

/// Enumerate every regular file under `root`, skipping paths that match
/// any of `skip_globs` (relative to `root`). Symlinks are only followed when
/// `follow_symlinks` is set; otherwise symlinked files are not counted.
pub fn walk_source_files(
    root: &Path,
    skip_globs: &[String],
    follow_symlinks: bool,
) -> Result<Vec<SourceFile>> {
    if !root.is_dir() {
        return Err(BedrockError::user_input(format!(
            "source directory does not exist: {}",
            root.display()
        ))
        .into());
    }

    let skip_set = build_globset(skip_globs)?;
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(follow_symlinks)
        .sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(%err, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if skip_set.is_match(&rel_str) {
            continue;
        }

        files.push(SourceFile::new(path.to_path_buf(), rel_str));
    }

    debug!(root = %root.display(), files = files.len(), "walked source tree");
    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
