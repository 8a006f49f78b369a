//! Line counts of named files.

use std::path::Path;
use tracing::debug;

/// Number of lines produced by splitting `bytes` on `\n`, `\r\n` or `\r`.
///
/// Empty input has zero lines. A trailing line without a terminator still
/// counts.
pub fn count_lines(bytes: &[u8]) -> u64 {
    let mut lines = 0u64;
    let mut pending = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines += 1;
                pending = false;
            }
            b'\r' => {
                lines += 1;
                pending = false;
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
            }
            _ => pending = true,
        }
        i += 1;
    }
    if pending {
        lines += 1;
    }
    lines
}

/// Line count of the file at `path`. Missing or unreadable files count 0.
pub fn line_count_of(path: &Path) -> u64 {
    match std::fs::read(path) {
        Ok(bytes) => count_lines(&bytes),
        Err(err) => {
            debug!(path = %path.display(), %err, "line count source unreadable");
            0
        }
    }
}
