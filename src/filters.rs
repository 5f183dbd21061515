//! Ordering and selection filters applied to each directory listing.
//!
//! Every builtin is a stable reorder: entries with equal keys keep the order
//! produced by the previous filter, so the last filter in a pipeline decides
//! the primary order and earlier ones break its ties.

use crate::entry::Entry;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A transform over one directory's entries.
///
/// Implementations must return a reordered subset of their input. Returning
/// `None` means "no result" and is reported as a contract violation.
pub trait EntryFilter: Send + Sync {
    fn apply(&self, entries: Vec<Entry>) -> Option<Vec<Entry>>;
}

impl<F> EntryFilter for F
where
    F: Fn(Vec<Entry>) -> Option<Vec<Entry>> + Send + Sync,
{
    fn apply(&self, entries: Vec<Entry>) -> Option<Vec<Entry>> {
        self(entries)
    }
}

/// A named set of filters that a configuration resolves filter names against.
pub trait FilterProvider: Send + Sync {
    fn filter(&self, name: &str) -> Option<Arc<dyn EntryFilter>>;

    fn contains(&self, name: &str) -> bool {
        self.filter(name).is_some()
    }
}

/// Default `FilterProvider`: a plain name to filter map.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: BTreeMap<String, Arc<dyn EntryFilter>>,
}

/// Names of the builtin filters, in the order they are registered.
pub const BUILTIN_FILTERS: &[&str] = &[
    "files_first",
    "directories_first",
    "order_by_mtime_asc",
    "order_by_mtime_desc",
    "order_by_name",
    "reverse",
];

impl FilterRegistry {
    /// A registry with no filters at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry holding the builtin filters.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry
            .register("files_first", |e: Vec<Entry>| Some(files_first(e)))
            .register("directories_first", |e: Vec<Entry>| Some(directories_first(e)))
            .register("order_by_mtime_asc", |e: Vec<Entry>| Some(order_by_mtime_asc(e)))
            .register("order_by_mtime_desc", |e: Vec<Entry>| Some(order_by_mtime_desc(e)))
            .register("order_by_name", |e: Vec<Entry>| Some(order_by_name(e)))
            .register("reverse", |e: Vec<Entry>| Some(reverse(e)));
        registry
    }

    /// Add or replace a filter.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        filter: impl EntryFilter + 'static,
    ) -> &mut Self {
        self.filters.insert(name.into(), Arc::new(filter));
        self
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }
}

impl FilterProvider for FilterRegistry {
    fn filter(&self, name: &str) -> Option<Arc<dyn EntryFilter>> {
        self.filters.get(name).cloned()
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.filters.keys()).finish()
    }
}

/// Files before directories.
pub fn files_first(mut entries: Vec<Entry>) -> Vec<Entry> {
    entries.sort_by_key(|e| !e.is_file());
    entries
}

/// Directories before files.
pub fn directories_first(mut entries: Vec<Entry>) -> Vec<Entry> {
    entries.sort_by_key(|e| !e.is_dir());
    entries
}

/// Oldest first. Entries without an mtime sort before everything else.
pub fn order_by_mtime_asc(mut entries: Vec<Entry>) -> Vec<Entry> {
    entries.sort_by_key(|e| e.modified());
    entries
}

/// Newest first.
pub fn order_by_mtime_desc(mut entries: Vec<Entry>) -> Vec<Entry> {
    entries.sort_by_key(|e| Reverse(e.modified()));
    entries
}

/// By base name, comparing raw bytes.
pub fn order_by_name(mut entries: Vec<Entry>) -> Vec<Entry> {
    entries.sort_by(|a, b| a.name().cmp(b.name()));
    entries
}

pub fn reverse(mut entries: Vec<Entry>) -> Vec<Entry> {
    entries.reverse();
    entries
}
