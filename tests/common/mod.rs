#![allow(dead_code)]

use findler::FileIterator;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

/// Create a directory structure from a list of relative paths.
/// Paths ending with '/' create directories; others create empty files.
pub fn create_fixture(paths: &[&str]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    add_paths(tmp.path(), paths);
    tmp
}

pub fn add_paths(root: &Path, paths: &[&str]) {
    for p in paths {
        let full = root.join(p);
        if p.ends_with('/') {
            fs::create_dir_all(&full).unwrap();
        } else {
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&full, "").unwrap();
        }
    }
}

/// Shape of a generated tree: `files` files `tmp-N<suffix>` per directory and
/// `subdirs` subdirectories `dir-N`, `depth` levels deep.
#[derive(Clone, Copy)]
pub struct TreeShape {
    pub depth: usize,
    pub files: usize,
    pub subdirs: usize,
}

impl Default for TreeShape {
    fn default() -> Self {
        Self {
            depth: 3,
            files: 3,
            subdirs: 3,
        }
    }
}

pub fn make_tree(dir: &Path, shape: TreeShape, suffix: &str) {
    fs::create_dir_all(dir).unwrap();
    for i in 0..shape.files {
        fs::write(dir.join(format!("tmp-{i}{suffix}")), "").unwrap();
    }
    if shape.depth <= 1 {
        return;
    }
    let child = TreeShape {
        depth: shape.depth - 1,
        ..shape
    };
    for i in 0..shape.subdirs {
        make_tree(&dir.join(format!("dir-{i}")), child, suffix);
    }
}

/// A temp tree with one `make_tree` pass per suffix.
pub fn tree_with(suffixes: &[&str], shape: TreeShape) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for suffix in suffixes {
        make_tree(tmp.path(), shape, suffix);
    }
    tmp
}

/// Path of `file` relative to `root`, with '/' separators.
pub fn relative(root: &Path, file: &Path) -> String {
    file.strip_prefix(root)
        .unwrap()
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Drain the iterator, returning root-relative paths in emission order.
pub fn collect_files(iter: &mut FileIterator) -> Vec<String> {
    let root = iter.path().to_path_buf();
    let mut files = Vec::new();
    while let Some(file) = iter.next_file().unwrap() {
        files.push(relative(&root, &file));
    }
    files
}

/// Take exactly `n` files.
pub fn take_files(iter: &mut FileIterator, n: usize) -> Vec<String> {
    let root = iter.path().to_path_buf();
    (0..n)
        .map(|_| relative(&root, &iter.next_file().unwrap().unwrap()))
        .collect()
}

/// Every file under `root` whose relative path passes `keep`, found
/// independently of findler.
pub fn expected_files(root: &Path, keep: impl Fn(&str) -> bool) -> BTreeSet<String> {
    walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| relative(root, e.path()))
        .filter(|rel| keep(rel))
        .collect()
}

pub fn as_set(files: &[String]) -> BTreeSet<String> {
    files.iter().cloned().collect()
}

/// Assert no file appears twice.
pub fn assert_unique(files: &[String]) {
    let set = as_set(files);
    assert_eq!(set.len(), files.len(), "duplicate files returned: {files:?}");
}

/// Sleep long enough that the next directory change gets a distinct mtime,
/// even on filesystems with one-second timestamps.
pub fn wait_for_new_timestamp() {
    std::thread::sleep(Duration::from_millis(1100));
}

/// Whether the filesystem under `dir` distinguishes names by case.
pub fn fs_case_sensitive(dir: &Path) -> bool {
    let probe = dir.join("CaseProbe");
    fs::write(&probe, "").unwrap();
    let sensitive = !dir.join("caseprobe").exists();
    fs::remove_file(&probe).unwrap();
    sensitive
}
