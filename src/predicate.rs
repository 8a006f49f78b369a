//! Filename and content predicates applied per metric.
//!
//! A file qualifies for a [`MetricDefinition`] when, in order:
//!
//! 1. its extension is in the allowlist (`.h`, `.cc`, `.mm`);
//! 2. every `include_filename_all` substring is in its basename;
//! 3. no `exclude_filename_any` substring is in its basename;
//! 4. at least one `include_content_any` substring is in its content.
//!
//! Filename checks run before content is touched so files rejected by
//! name are never read.

use crate::models::{MetricDefinition, MetricResult};
use crate::walker::SourceFile;

/// Basename-only checks (steps 1-3).
pub fn passes_filename_filters(def: &MetricDefinition, file: &SourceFile) -> bool {
    if !file.has_allowed_extension() {
        return false;
    }
    if !def
        .include_filename_all
        .iter()
        .all(|s| file.basename.contains(s.as_str()))
    {
        return false;
    }
    if def
        .exclude_filename_any
        .iter()
        .any(|s| file.basename.contains(s.as_str()))
    {
        return false;
    }
    true
}

/// Content check (step 4). An empty list imposes no constraint.
pub fn passes_content_filter(def: &MetricDefinition, content: &str) -> bool {
    def.include_content_any.is_empty()
        || def
            .include_content_any
            .iter()
            .any(|s| content.contains(s.as_str()))
}

/// Sum of non-overlapping occurrences of every non-empty tally term.
pub fn tally(def: &MetricDefinition, content: &str) -> u64 {
    def.content_tally_terms
        .iter()
        .filter(|t| !t.is_empty())
        .map(|t| content.matches(t.as_str()).count() as u64)
        .sum()
}

/// Running totals for one metric while the tree is walked.
#[derive(Debug)]
pub struct MetricCounter<'a> {
    def: &'a MetricDefinition,
    result: MetricResult,
}

impl<'a> MetricCounter<'a> {
    pub fn new(def: &'a MetricDefinition) -> Self {
        Self {
            def,
            result: MetricResult::default(),
        }
    }

    /// Whether `file` gets far enough to need its content for this metric.
    pub fn wants_content(&self, file: &SourceFile) -> bool {
        self.def.needs_content() && passes_filename_filters(self.def, file)
    }

    /// Evaluate one file. `content` is only consulted when
    /// [`wants_content`](Self::wants_content) is true for `file`.
    pub fn observe(&mut self, file: &SourceFile, content: &str) {
        if !passes_filename_filters(self.def, file) {
            return;
        }
        if self.def.needs_content() {
            if !passes_content_filter(self.def, content) {
                return;
            }
            self.result.tally_total += tally(self.def, content);
        }
        self.result.matched_files += 1;
    }

    pub fn finish(self) -> MetricResult {
        self.result
    }
}

/// Count one metric over a set of files, reading each file only when the
/// metric needs it.
pub fn count_metric(def: &MetricDefinition, files: &[SourceFile]) -> MetricResult {
    let mut counter = MetricCounter::new(def);
    for file in files {
        let content = if counter.wants_content(file) {
            file.read_content()
        } else {
            String::new()
        };
        counter.observe(file, &content);
    }
    counter.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn file(dir: &Path, name: &str, body: &str) -> SourceFile {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        SourceFile::new(path, name.to_string())
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_definition_counts_allowlisted_files() {
        let tmp = TempDir::new().unwrap();
        let files = vec![
            file(tmp.path(), "a.cc", "x"),
            file(tmp.path(), "b.h", "y"),
            file(tmp.path(), "c.mm", ""),
            file(tmp.path(), "d.txt", "z"),
            file(tmp.path(), "e.py", "w"),
        ];
        let r = count_metric(&MetricDefinition::default(), &files);
        assert_eq!(r.matched_files, 3);
        assert_eq!(r.tally_total, 0);
    }

    #[test]
    fn exclusion_dominates_inclusion() {
        let tmp = TempDir::new().unwrap();
        let files = vec![
            file(tmp.path(), "browser_unittest.cc", ""),
            file(tmp.path(), "browser.cc", ""),
        ];
        let def = MetricDefinition {
            include_filename_all: strings(&["browser"]),
            exclude_filename_any: strings(&["browser"]),
            ..Default::default()
        };
        assert_eq!(count_metric(&def, &files).matched_files, 0);
    }

    #[test]
    fn empty_tally_term_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let files = vec![file(tmp.path(), "a.cc", "foo bar foo")];
        let plain = MetricDefinition {
            content_tally_terms: strings(&["foo"]),
            ..Default::default()
        };
        let with_empty = MetricDefinition {
            content_tally_terms: strings(&["foo", ""]),
            ..Default::default()
        };
        assert_eq!(count_metric(&plain, &files), count_metric(&with_empty, &files));
        assert_eq!(count_metric(&with_empty, &files).tally_total, 2);
    }

    #[test]
    fn content_filter_requires_any_term() {
        let tmp = TempDir::new().unwrap();
        let files = vec![
            file(tmp.path(), "a.cc", "uses BrowserList here"),
            file(tmp.path(), "b.cc", "nothing relevant"),
        ];
        let def = MetricDefinition {
            include_content_any: strings(&["BrowserList", "FindBrowserWithTab"]),
            content_tally_terms: strings(&["BrowserList"]),
            ..Default::default()
        };
        let r = count_metric(&def, &files);
        assert_eq!(r.matched_files, 1);
        assert_eq!(r.tally_total, 1);
    }

    #[test]
    fn tally_is_non_overlapping() {
        let def = MetricDefinition {
            content_tally_terms: strings(&["aa"]),
            ..Default::default()
        };
        assert_eq!(tally(&def, "aaaa"), 2);
        assert_eq!(tally(&def, "aaa"), 1);
    }

    #[test]
    fn name_include_requires_all_substrings() {
        let tmp = TempDir::new().unwrap();
        let files = vec![
            file(tmp.path(), "unittest_alpha.cc", ""),
            file(tmp.path(), "alpha.cc", ""),
        ];
        let def = MetricDefinition {
            include_filename_all: strings(&["unittest", "alpha"]),
            ..Default::default()
        };
        assert_eq!(count_metric(&def, &files).matched_files, 1);
    }

    #[test]
    fn filename_rejection_needs_no_content() {
        let tmp = TempDir::new().unwrap();
        let txt = file(tmp.path(), "notes.txt", "foo");
        let cc = file(tmp.path(), "a.cc", "foo");
        let def = MetricDefinition {
            content_tally_terms: strings(&["foo"]),
            ..Default::default()
        };
        let counter = MetricCounter::new(&def);
        assert!(!counter.wants_content(&txt));
        assert!(counter.wants_content(&cc));

        let name_only = MetricDefinition::default();
        assert!(!MetricCounter::new(&name_only).wants_content(&cc));
    }
}
