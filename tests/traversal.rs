mod common;

use common::{
    as_set, assert_unique, collect_files, create_fixture, expected_files, fs_case_sensitive,
    tree_with, TreeShape,
};
use findler::{Configuration, ContractViolation, Entry, Error, FilterRegistry};
use std::collections::BTreeSet;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn not_hidden(rel: &str) -> bool {
    !rel.split('/').any(|part| part.starts_with('.'))
}

// --- Selection ---

#[test]
fn test_finds_all_non_hidden_files_by_default() {
    let tmp = tree_with(&[".jpg", ".txt"], TreeShape::default());
    common::add_paths(
        tmp.path(),
        &[".outer-hide", "dir-0/.hide", ".hide/normal.txt", ".hide/.secret"],
    );

    let mut config = Configuration::new(tmp.path()).unwrap();
    let files = collect_files(&mut config.iterator());
    assert_unique(&files);
    assert_eq!(as_set(&files), expected_files(tmp.path(), not_hidden));

    config.exclude_hidden();
    assert_eq!(
        as_set(&collect_files(&mut config.iterator())),
        expected_files(tmp.path(), not_hidden)
    );

    config.include_hidden();
    let all = collect_files(&mut config.iterator());
    assert_unique(&all);
    assert_eq!(as_set(&all), expected_files(tmp.path(), |_| true));
    assert!(all.contains(&".hide/.secret".to_string()));
}

#[test]
fn test_extension_case_insensitive() {
    let tmp = tree_with(&[".jpg", ".txt", ".JPG"], TreeShape::default());
    let mut config = Configuration::new(tmp.path()).unwrap();
    config.add_extension(".jpg").unwrap().case_insensitive();

    let files = collect_files(&mut config.iterator());
    assert_unique(&files);
    assert_eq!(
        as_set(&files),
        expected_files(tmp.path(), |rel| rel.to_lowercase().ends_with(".jpg"))
    );
}

#[test]
fn test_extension_case_sensitive() {
    let tmp = tree_with(&[".jpg", ".txt", ".JPG"], TreeShape::default());
    if !fs_case_sensitive(tmp.path()) {
        return;
    }
    let mut config = Configuration::new(tmp.path()).unwrap();
    config.add_extension("jpg").unwrap().case_sensitive();

    assert_eq!(
        as_set(&collect_files(&mut config.iterator())),
        expected_files(tmp.path(), |rel| rel.ends_with(".jpg"))
    );
}

#[test]
fn test_jpg_scenario() {
    let tmp = TempDir::new().unwrap();
    if !fs_case_sensitive(tmp.path()) {
        return;
    }
    common::add_paths(tmp.path(), &["a.jpg", "a.JPG", "b.txt"]);

    let mut config = Configuration::new(tmp.path()).unwrap();
    config.add_pattern("*.jpg").unwrap().case_insensitive();
    let files = as_set(&collect_files(&mut config.iterator()));
    let expected: BTreeSet<String> = ["a.jpg", "a.JPG"].iter().map(|s| s.to_string()).collect();
    assert_eq!(files, expected);

    config.case_sensitive();
    assert_eq!(collect_files(&mut config.iterator()), ["a.jpg"]);
}

#[test]
fn test_directories_are_not_matched_against_patterns() {
    let tmp = create_fixture(&["photos.d/2024/a.jpg", "photos.d/notes.txt", "b.jpg"]);
    let mut config = Configuration::new(tmp.path()).unwrap();
    config.add_pattern("*.jpg").unwrap();

    let files = as_set(&collect_files(&mut config.iterator()));
    let expected: BTreeSet<String> = ["b.jpg", "photos.d/2024/a.jpg"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(files, expected);
}

#[test]
fn test_multiple_patterns_are_alternatives() {
    let tmp = create_fixture(&["a.rs", "b.toml", "c.md"]);
    let mut config = Configuration::new(tmp.path()).unwrap();
    config.add_patterns(["*.rs", "*.toml"]).unwrap();
    assert_eq!(collect_files(&mut config.iterator()), ["a.rs", "b.toml"]);
}

#[test]
fn test_nonexistent_root_is_empty_not_an_error() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("later");
    let config = Configuration::new(&root).unwrap();
    let mut iter = config.iterator();
    assert!(iter.next_file().unwrap().is_none());

    fs::create_dir(&root).unwrap();
    fs::write(root.join("arrived.txt"), "").unwrap();
    assert_eq!(collect_files(&mut iter), ["arrived.txt"]);
}

#[test]
fn test_std_iterator_adapter() {
    let tmp = create_fixture(&["a", "sub/b"]);
    let iter = Configuration::new(tmp.path()).unwrap().iterator();
    let files: Vec<_> = iter.collect::<findler::Result<Vec<_>>>().unwrap();
    assert_eq!(files, vec![tmp.path().join("a"), tmp.path().join("sub/b")]);
}

#[test]
fn test_later_configuration_changes_do_not_leak_into_iterators() {
    let tmp = create_fixture(&["a.txt", "b.log"]);
    let mut config = Configuration::new(tmp.path()).unwrap();
    let mut before = config.iterator();
    config.add_extension("log").unwrap();

    assert_eq!(collect_files(&mut before), ["a.txt", "b.log"]);
    assert_eq!(collect_files(&mut config.iterator()), ["b.log"]);
}

// --- Ordering ---

fn small_tree() -> TempDir {
    tree_with(
        &[".a"],
        TreeShape {
            depth: 2,
            files: 2,
            subdirs: 1,
        },
    )
}

#[test]
fn test_files_first_ordering() {
    let tmp = small_tree();
    let mut config = Configuration::new(tmp.path()).unwrap();
    config.add_filters(["order_by_name", "files_first"]).unwrap();

    let expected = ["tmp-0.a", "tmp-1.a", "dir-0/tmp-0.a", "dir-0/tmp-1.a"];
    assert_eq!(collect_files(&mut config.iterator()), expected);

    config.add_filter("reverse").unwrap();
    let mut reversed = expected.to_vec();
    reversed.reverse();
    assert_eq!(collect_files(&mut config.iterator()), reversed);
}

#[test]
fn test_directories_first_ordering() {
    let tmp = small_tree();
    let mut config = Configuration::new(tmp.path()).unwrap();
    config.add_filters(["order_by_name", "directories_first"]).unwrap();

    let expected = ["dir-0/tmp-0.a", "dir-0/tmp-1.a", "tmp-0.a", "tmp-1.a"];
    assert_eq!(collect_files(&mut config.iterator()), expected);

    config.add_filter("reverse").unwrap();
    let mut reversed = expected.to_vec();
    reversed.reverse();
    assert_eq!(collect_files(&mut config.iterator()), reversed);
}

// --- Custom filters ---

fn registry_with(name: &str, filter: impl findler::EntryFilter + 'static) -> Arc<FilterRegistry> {
    let mut registry = FilterRegistry::builtin();
    registry.register(name, filter);
    Arc::new(registry)
}

#[test]
fn test_custom_filter_selects_entries() {
    let tmp = tree_with(
        &[".a", ".b"],
        TreeShape {
            depth: 2,
            files: 2,
            subdirs: 2,
        },
    );
    let expected = expected_files(tmp.path(), |rel| rel.ends_with(".a"));
    for rel in &expected {
        fs::write(tmp.path().join(rel), "hello").unwrap();
    }

    let mut config = Configuration::new(tmp.path()).unwrap();
    config
        .set_filter_provider(registry_with("non_empty_files", |e: Vec<Entry>| {
            Some(e.into_iter().filter(|e| e.is_dir() || !e.is_empty()).collect::<Vec<_>>())
        }))
        .unwrap();
    config.add_filter("non_empty_files").unwrap();

    assert_eq!(as_set(&collect_files(&mut config.iterator())), expected);
}

#[test]
fn test_filter_with_no_result_fails_next_file() {
    let tmp = TempDir::new().unwrap();
    let mut config = Configuration::new(tmp.path()).unwrap();
    config
        .set_filter_provider(registry_with("no_return", |_: Vec<Entry>| -> Option<Vec<Entry>> { None }))
        .unwrap();
    config.add_filter("no_return").unwrap();

    let err = config.iterator().next_file().unwrap_err();
    assert!(matches!(
        err,
        Error::FilterContract {
            violation: ContractViolation::NoResult,
            ..
        }
    ));
}

#[test]
fn test_filter_returning_foreign_entries_fails_next_file() {
    let tmp = create_fixture(&["a.txt"]);
    let outsider = TempDir::new().unwrap();
    fs::write(outsider.path().join("x"), "").unwrap();
    let foreign = Entry::probe(outsider.path().join("x")).unwrap();

    let mut config = Configuration::new(tmp.path()).unwrap();
    config
        .set_filter_provider(registry_with("invalid_return", move |_: Vec<Entry>| {
            Some(vec![foreign.clone()])
        }))
        .unwrap();
    config.add_filter("invalid_return").unwrap();

    let mut iter = config.iterator();
    let err = iter.next_file().unwrap_err();
    match err {
        Error::FilterContract { filter, violation } => {
            assert_eq!(filter, "invalid_return");
            assert_eq!(
                violation,
                ContractViolation::ForeignEntry(outsider.path().join("x"))
            );
        }
        other => panic!("expected contract violation, got {other:?}"),
    }
    // Errors are not swallowed on retry either.
    assert!(iter.next_file().is_err());
}

#[test]
fn test_unknown_filter_rejected_at_registration() {
    let mut config = Configuration::new(".").unwrap();
    assert!(matches!(
        config.add_filter("files_last"),
        Err(Error::UnknownFilter { .. })
    ));
    assert!(config.add_filters(["order_by_name", "nope"]).is_err());
    assert_eq!(config.filters(), ["order_by_name"]);
}
