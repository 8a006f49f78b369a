//! Owned-object inventory for the browser layer.
//!
//! Two independent counts are combined: fields the browser header owns
//! directly, and classes anywhere in the tree that attach themselves as
//! browser user data.
//!
//! Declarations split over several lines are not parsed. A line containing a
//! comma or an opening parenthesis is assumed to be part of a method
//! signature and is skipped, which can under-count.

use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::models::OwnedObjectSpec;
use crate::walker::{self, SourceFile};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OwnedObjectInventory {
    pub directly_owned_count: u64,
    pub user_data_count: u64,
}

impl OwnedObjectInventory {
    pub fn total(&self) -> u64 {
        self.directly_owned_count + self.user_data_count
    }
}

/// Lines declaring an owned field: any declarator, no disqualifier.
pub fn count_owned_fields(spec: &OwnedObjectSpec, header: &str) -> u64 {
    header
        .lines()
        .filter(|line| {
            spec.declarator_tokens
                .iter()
                .any(|t| !t.is_empty() && line.contains(t.as_str()))
                && !spec
                    .disqualifier_tokens
                    .iter()
                    .any(|t| !t.is_empty() && line.contains(t.as_str()))
        })
        .count() as u64
}

/// Literal occurrences of the user-data substring in one file's content.
pub fn count_user_data(spec: &OwnedObjectSpec, content: &str) -> u64 {
    if spec.user_data_substring.is_empty() {
        return 0;
    }
    content.matches(spec.user_data_substring.as_str()).count() as u64
}

/// Running user-data count, fed one file at a time.
#[derive(Debug)]
pub struct UserDataTally<'a> {
    spec: &'a OwnedObjectSpec,
    scope: PathBuf,
    count: u64,
}

impl<'a> UserDataTally<'a> {
    pub fn new(root: &Path, spec: &'a OwnedObjectSpec) -> Self {
        Self {
            spec,
            scope: normalize(&root.join(&spec.user_data_root)),
            count: 0,
        }
    }

    /// Whether `file` contributes, and so must have its content read.
    pub fn wants_content(&self, file: &SourceFile) -> bool {
        !self.spec.user_data_substring.is_empty() && normalize(&file.path).starts_with(&self.scope)
    }

    pub fn observe(&mut self, file: &SourceFile, content: &str) {
        if self.wants_content(file) {
            self.count += count_user_data(self.spec, content);
        }
    }

    pub fn finish(self) -> u64 {
        self.count
    }
}

/// Owned fields of the browser header under `root`. A missing header is 0.
pub fn directly_owned(root: &Path, spec: &OwnedObjectSpec) -> u64 {
    let header = walker::read_lossy(&root.join(&spec.browser_header));
    count_owned_fields(spec, &header)
}

/// Build the inventory for the tree at `root` from the already-walked
/// `files`. Each file is read at most once and dropped before the next.
pub fn take_inventory(
    root: &Path,
    spec: &OwnedObjectSpec,
    files: &[SourceFile],
) -> OwnedObjectInventory {
    let mut tally = UserDataTally::new(root, spec);
    for file in files {
        if tally.wants_content(file) {
            let content = file.read_content();
            tally.observe(file, &content);
        }
    }

    let inventory = OwnedObjectInventory {
        directly_owned_count: directly_owned(root, spec),
        user_data_count: tally.finish(),
    };
    debug!(
        directly_owned_count = inventory.directly_owned_count,
        user_data_count = inventory.user_data_count,
        "owned-object inventory"
    );
    inventory
}

/// Drop `.` components so `root/./x` compares equal to `root/x`.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn spec() -> OwnedObjectSpec {
        OwnedObjectSpec {
            browser_header: PathBuf::from("ui/browser.h"),
            declarator_tokens: vec![
                "std::unique_ptr<".to_string(),
                "UnownedUserDataHost unowned_user_data_host_;".to_string(),
            ],
            disqualifier_tokens: vec!["KeepAlive".to_string(), ",".to_string(), "(".to_string()],
            user_data_root: PathBuf::from("."),
            user_data_substring: "public BrowserUserData<".to_string(),
        }
    }

    #[test]
    fn owned_fields_respect_disqualifiers() {
        let header = "\
  std::unique_ptr<TabStripModel> tab_strip_model_;
  std::unique_ptr<ScopedKeepAlive> keep_alive_;
  std::unique_ptr<Foo> CreateFoo(int a,
  std::map<int, std::unique_ptr<Bar>> bars_;
  UnownedUserDataHost unowned_user_data_host_;
  raw_ptr<Profile> profile_;
";
        assert_eq!(count_owned_fields(&spec(), header), 2);
    }

    #[test]
    fn inventory_sums_both_counts() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("ui")).unwrap();
        fs::create_dir_all(tmp.path().join("features")).unwrap();
        fs::write(
            tmp.path().join("ui/browser.h"),
            "std::unique_ptr<A> a_;\nstd::unique_ptr<B> b_;\n",
        )
        .unwrap();
        fs::write(
            tmp.path().join("features/x.h"),
            "class X : public BrowserUserData<X> {};\nclass Y : public BrowserUserData<Y> {};",
        )
        .unwrap();
        fs::write(
            tmp.path().join("features/notes.txt"),
            "public BrowserUserData< in a text file counts too",
        )
        .unwrap();

        let files = walker::walk_source_files(tmp.path(), &[], false).unwrap();
        let inv = take_inventory(tmp.path(), &spec(), &files);
        assert_eq!(inv.directly_owned_count, 2);
        assert_eq!(inv.user_data_count, 3);
        assert_eq!(inv.total(), 5);
    }

    #[test]
    fn user_data_root_scopes_the_count() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a")).unwrap();
        fs::create_dir_all(tmp.path().join("b")).unwrap();
        fs::write(tmp.path().join("a/x.h"), "public BrowserUserData<").unwrap();
        fs::write(tmp.path().join("b/y.h"), "public BrowserUserData<").unwrap();

        let mut s = spec();
        s.user_data_root = PathBuf::from("a");
        let files = walker::walk_source_files(tmp.path(), &[], false).unwrap();
        assert_eq!(take_inventory(tmp.path(), &s, &files).user_data_count, 1);
        s.user_data_root = PathBuf::from(".");
        assert_eq!(take_inventory(tmp.path(), &s, &files).user_data_count, 2);
    }

    #[test]
    fn file_content_is_reread_on_each_inventory() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("res")).unwrap();
        fs::write(tmp.path().join("res/big.png"), vec![0xffu8; 64 * 1024]).unwrap();
        fs::write(tmp.path().join("a.cc"), "public BrowserUserData<").unwrap();

        let files = walker::walk_source_files(tmp.path(), &[], false).unwrap();
        assert_eq!(take_inventory(tmp.path(), &spec(), &files).user_data_count, 1);

        fs::write(
            tmp.path().join("res/big.png"),
            "public BrowserUserData< public BrowserUserData<",
        )
        .unwrap();
        assert_eq!(take_inventory(tmp.path(), &spec(), &files).user_data_count, 3);
    }

    #[test]
    fn empty_substring_reads_nothing() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.cc"), "anything").unwrap();
        let mut s = spec();
        s.user_data_substring = String::new();
        let files = walker::walk_source_files(tmp.path(), &[], false).unwrap();
        let tally = UserDataTally::new(tmp.path(), &s);
        assert!(!tally.wants_content(&files[0]));
        assert_eq!(take_inventory(tmp.path(), &s, &files).user_data_count, 0);
    }

    #[test]
    fn missing_header_contributes_zero() {
        let tmp = TempDir::new().unwrap();
        let files = walker::walk_source_files(tmp.path(), &[], false).unwrap();
        assert_eq!(take_inventory(tmp.path(), &spec(), &files).total(), 0);
    }
}
