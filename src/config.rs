//! Traversal policy: root, patterns, match flags, and the filter pipeline.

use crate::entry::Entry;
use crate::error::{ContractViolation, Error, Result};
use crate::filters::{FilterProvider, FilterRegistry};
use crate::path;
use crate::snapshot::Snapshot;
use crate::walk::FileIterator;
use globset::{GlobBuilder, GlobMatcher};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

/// Case and hidden-file policy for pattern matching.
///
/// Case sensitivity is only as strong as the filesystem: on a
/// case-insensitive filesystem `ignore_case = false` still cannot tell
/// `a.jpg` from `A.JPG` apart when both names refer to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchFlags {
    pub ignore_case: bool,
    pub include_hidden: bool,
}

/// A compiled glob in both case modes, so flipping the case flag never
/// needs a recompile.
#[derive(Debug, Clone)]
struct Pattern {
    source: String,
    exact: GlobMatcher,
    folded: GlobMatcher,
    /// Patterns with a separator match the full path, others the base name.
    whole_path: bool,
}

impl Pattern {
    fn new(source: &str) -> Result<Self> {
        let compile = |fold: bool| {
            GlobBuilder::new(source)
                .case_insensitive(fold)
                .build()
                .map(|g| g.compile_matcher())
                .map_err(|e| Error::InvalidPattern {
                    pattern: source.to_string(),
                    source: e,
                })
        };
        Ok(Self {
            source: source.to_string(),
            exact: compile(false)?,
            folded: compile(true)?,
            whole_path: source.contains('/'),
        })
    }

    fn is_match(&self, entry: &Entry, ignore_case: bool) -> bool {
        let matcher = if ignore_case { &self.folded } else { &self.exact };
        if self.whole_path {
            matcher.is_match(entry.path())
        } else {
            matcher.is_match(entry.name())
        }
    }
}

/// Everything a traversal needs to decide which entries to return and in
/// what order.
///
/// Built with the `&mut self` methods below, then frozen into each iterator
/// by [`Configuration::iterator`]. Iterators never see later edits.
#[derive(Clone)]
pub struct Configuration {
    root: PathBuf,
    patterns: Vec<Pattern>,
    flags: MatchFlags,
    follow_symlinks: bool,
    filters: Vec<String>,
    provider: Arc<dyn FilterProvider>,
}

impl Configuration {
    /// Configuration over `root`: case-sensitive, hidden entries excluded,
    /// no patterns (every file matches), builtin filter provider.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            root: path::clean(root)?,
            patterns: Vec::new(),
            flags: MatchFlags::default(),
            follow_symlinks: false,
            filters: Vec::new(),
            provider: Arc::new(FilterRegistry::builtin()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn flags(&self) -> MatchFlags {
        self.flags
    }

    /// Pattern sources in registration order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.source.as_str())
    }

    /// Registered filter names in pipeline order.
    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    pub fn follows_symlinks(&self) -> bool {
        self.follow_symlinks
    }

    /// Add a glob. Files matching any glob are returned.
    pub fn add_pattern(&mut self, pattern: &str) -> Result<&mut Self> {
        self.patterns.push(Pattern::new(pattern)?);
        Ok(self)
    }

    pub fn add_patterns<I, S>(&mut self, patterns: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in patterns {
            self.add_pattern(pattern.as_ref())?;
        }
        Ok(self)
    }

    /// Match files by extension: `"jpg"` and `".jpg"` both add `*.jpg`.
    pub fn add_extension(&mut self, extension: &str) -> Result<&mut Self> {
        let pattern = format!("*{}", normalize_extension(extension));
        self.add_pattern(&pattern)
    }

    pub fn case_sensitive(&mut self) -> &mut Self {
        self.flags.ignore_case = false;
        self
    }

    pub fn case_insensitive(&mut self) -> &mut Self {
        self.flags.ignore_case = true;
        self
    }

    /// Return dotfiles and descend into dot-directories.
    pub fn include_hidden(&mut self) -> &mut Self {
        self.flags.include_hidden = true;
        self
    }

    pub fn exclude_hidden(&mut self) -> &mut Self {
        self.flags.include_hidden = false;
        self
    }

    /// Descend into symlinked directories (links back to an ancestor are
    /// always skipped).
    pub fn follow_symlinks(&mut self, follow: bool) -> &mut Self {
        self.follow_symlinks = follow;
        self
    }

    /// Append a filter to the pipeline. The name must exist in the current
    /// provider.
    pub fn add_filter(&mut self, name: &str) -> Result<&mut Self> {
        if !self.provider.contains(name) {
            return Err(Error::UnknownFilter {
                name: name.to_string(),
            });
        }
        self.filters.push(name.to_string());
        Ok(self)
    }

    pub fn add_filters<I, S>(&mut self, names: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.add_filter(name.as_ref())?;
        }
        Ok(self)
    }

    /// Swap the filter provider. Fails, leaving the configuration untouched,
    /// if the new provider lacks any filter already in the pipeline.
    pub fn set_filter_provider(&mut self, provider: Arc<dyn FilterProvider>) -> Result<&mut Self> {
        if let Some(missing) = self.filters.iter().find(|f| !provider.contains(f)) {
            return Err(Error::UnknownFilter {
                name: missing.clone(),
            });
        }
        self.provider = provider;
        Ok(self)
    }

    /// A fresh iterator over the root, bound to a frozen copy of this
    /// configuration.
    pub fn iterator(&self) -> FileIterator {
        FileIterator::new(Arc::new(self.clone()))
    }

    /// Rebuild an iterator from a snapshot taken over the same root with the
    /// same patterns, flags, symlink policy and filters.
    pub fn restore(&self, snapshot: Snapshot) -> Result<FileIterator> {
        FileIterator::restore(Arc::new(self.clone()), snapshot)
    }

    /// Run a raw listing through existence, hidden, pattern, and filter
    /// stages, in that order.
    pub fn filter_paths(&self, entries: Vec<Entry>) -> Result<Vec<Entry>> {
        let mut kept: Vec<Entry> = entries
            .into_iter()
            .filter(|e| e.exists())
            .filter(|e| self.flags.include_hidden || !path::is_hidden(e.path()))
            .filter(|e| e.is_dir() || self.matches(e))
            .collect();

        for name in &self.filters {
            let filter = self.provider.filter(name).ok_or_else(|| Error::UnknownFilter {
                name: name.clone(),
            })?;
            let allowed: HashSet<PathBuf> = kept.iter().map(|e| e.path().to_path_buf()).collect();
            let output = filter
                .apply(kept)
                .ok_or_else(|| Error::contract(name, ContractViolation::NoResult))?;
            check_subset(name, &allowed, &output)?;
            trace!(filter = %name, entries = output.len(), "applied filter");
            kept = output;
        }

        Ok(kept)
    }

    fn matches(&self, entry: &Entry) -> bool {
        self.patterns.is_empty()
            || self
                .patterns
                .iter()
                .any(|p| p.is_match(entry, self.flags.ignore_case))
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("root", &self.root)
            .field("patterns", &self.patterns().collect::<Vec<_>>())
            .field("flags", &self.flags)
            .field("follow_symlinks", &self.follow_symlinks)
            .field("filters", &self.filters)
            .finish_non_exhaustive()
    }
}

fn check_subset(filter: &str, allowed: &HashSet<PathBuf>, output: &[Entry]) -> Result<()> {
    let mut seen = HashSet::with_capacity(output.len());
    for entry in output {
        if !allowed.contains(entry.path()) {
            return Err(Error::contract(
                filter,
                ContractViolation::ForeignEntry(entry.path().to_path_buf()),
            ));
        }
        if !seen.insert(entry.path()) {
            return Err(Error::contract(
                filter,
                ContractViolation::DuplicateEntry(entry.path().to_path_buf()),
            ));
        }
    }
    Ok(())
}

fn normalize_extension(extension: &str) -> String {
    if extension.is_empty() || extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{extension}")
    }
}
