use crate::config::Configuration;
use crate::entry::{list_dir, DirStamp, Entry};
use crate::error::Result;
use crate::path;
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Names already returned from one directory, plus the same history for
/// every subdirectory that has been drained.
///
/// Records outlive listings and rescans; they are what keeps a file from
/// being returned twice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Record {
    pub(crate) files: BTreeSet<OsString>,
    pub(crate) dirs: BTreeMap<OsString, Record>,
}

impl Record {
    fn file_count(&self) -> usize {
        self.files.len() + self.dirs.values().map(Record::file_count).sum::<usize>()
    }
}

/// Filtered listing of a directory, tagged with the stamp it was read under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Listing {
    pub(crate) stamp: DirStamp,
    pub(crate) entries: Vec<Entry>,
    /// Everything before the cursor has been returned, drained, or found gone.
    pub(crate) cursor: usize,
}

/// Traversal state for one open directory. The `active` chain is the
/// current depth-first path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Frame {
    pub(crate) path: PathBuf,
    pub(crate) record: Record,
    /// Subdirectories drained since the last rescan.
    pub(crate) visited_dirs: BTreeSet<OsString>,
    pub(crate) listing: Option<Listing>,
    pub(crate) active: Option<Box<Frame>>,
}

/// Outcome of scanning a cached listing.
enum Scan {
    Found(Entry),
    /// An entry changed between file and directory since the listing was
    /// taken, so the listing cannot be trusted.
    Stale,
    Exhausted,
}

impl Frame {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self::with_record(path, Record::default())
    }

    pub(crate) fn with_record(path: PathBuf, record: Record) -> Self {
        Self {
            path,
            record,
            visited_dirs: BTreeSet::new(),
            listing: None,
            active: None,
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Number of open frames from here down to the deepest active one.
    pub(crate) fn depth(&self) -> usize {
        1 + self.active.as_ref().map_or(0, |child| child.depth())
    }

    /// Total files returned so far under this frame.
    pub(crate) fn emitted(&self) -> usize {
        self.record.file_count() + self.active.as_ref().map_or(0, |child| child.emitted())
    }

    /// Next matching file under this directory, or `None` if nothing is
    /// available right now.
    pub(crate) fn next_file(&mut self, config: &Configuration) -> Result<Option<PathBuf>> {
        if !self.path.is_dir() {
            return Ok(None);
        }

        if let Some(child) = self.active.take() {
            if let Some(file) = self.drive(child, config)? {
                return Ok(Some(file));
            }
        }

        loop {
            let Some(stamp) = DirStamp::read(&self.path) else {
                return Ok(None);
            };
            self.refresh(stamp, config)?;

            let entry = match self.next_unvisited() {
                Scan::Found(entry) => entry,
                Scan::Stale => {
                    debug!(dir = %self.path.display(), "entry changed kind, relisting");
                    self.listing = None;
                    continue;
                }
                Scan::Exhausted => return Ok(None),
            };

            if entry.is_dir() {
                let record = self.record.dirs.remove(entry.name()).unwrap_or_default();
                trace!(dir = %entry.path().display(), "descending");
                let child = Box::new(Frame::with_record(entry.path().to_path_buf(), record));
                if let Some(file) = self.drive(child, config)? {
                    return Ok(Some(file));
                }
            } else {
                self.record.files.insert(entry.name().to_os_string());
                trace!(file = %entry.path().display(), "emitting");
                return Ok(Some(entry.path().to_path_buf()));
            }
        }
    }

    /// Drop every listing and drained-directory mark along the active chain.
    pub(crate) fn rescan(&mut self) {
        self.listing = None;
        self.visited_dirs.clear();
        if let Some(child) = self.active.as_mut() {
            child.rescan();
        }
    }

    /// Pull from `child`. It stays active while it yields files or errors
    /// and is retired into the record once it runs dry.
    fn drive(&mut self, mut child: Box<Frame>, config: &Configuration) -> Result<Option<PathBuf>> {
        match child.next_file(config) {
            Ok(Some(file)) => {
                self.active = Some(child);
                Ok(Some(file))
            }
            Ok(None) => {
                let name = path::base(&child.path);
                trace!(dir = %child.path.display(), "drained");
                self.visited_dirs.insert(name.clone());
                self.record.dirs.insert(name, child.record);
                Ok(None)
            }
            Err(e) => {
                self.active = Some(child);
                Err(e)
            }
        }
    }

    fn refresh(&mut self, stamp: DirStamp, config: &Configuration) -> Result<()> {
        let fresh = self
            .listing
            .as_ref()
            .is_some_and(|listing| listing.stamp == stamp);
        if fresh {
            return Ok(());
        }

        let raw = list_dir(&self.path, config.follows_symlinks());
        let entries = config.filter_paths(raw)?;
        debug!(
            dir = %self.path.display(),
            entries = entries.len(),
            "listing recomputed"
        );
        self.listing = Some(Listing {
            stamp,
            entries,
            cursor: 0,
        });
        Ok(())
    }

    /// First entry past the cursor that has not been returned or drained
    /// and still exists. Entries that vanished since listing are skipped.
    ///
    /// The listed kind decided whether the entry went through pattern
    /// matching, so an entry whose kind no longer agrees is never returned
    /// from this listing.
    fn next_unvisited(&mut self) -> Scan {
        let Some(listing) = self.listing.as_mut() else {
            return Scan::Exhausted;
        };
        while let Some(entry) = listing.entries.get(listing.cursor) {
            listing.cursor += 1;
            let name = entry.name();
            if self.record.files.contains(name) || self.visited_dirs.contains(name) {
                continue;
            }
            match Entry::probe(entry.path()) {
                Some(current) if current.kind() == entry.kind() => return Scan::Found(current),
                Some(_) => return Scan::Stale,
                None => {}
            }
        }
        Scan::Exhausted
    }

    /// Take back the most recent file returned from the deepest open
    /// directory, as if it had never been handed out. `false` when `file`
    /// is not that file.
    pub(crate) fn unreturn(&mut self, file: &Path) -> bool {
        if let Some(child) = self.active.as_mut() {
            return child.unreturn(file);
        }
        if file.parent() != Some(self.path.as_path()) {
            return false;
        }
        let name = path::base(file);
        if !self.record.files.remove(&name) {
            return false;
        }
        let rewound = match self.listing.as_mut() {
            Some(listing)
                if listing.cursor > 0
                    && listing.entries.get(listing.cursor - 1).map(Entry::name)
                        == Some(name.as_os_str()) =>
            {
                listing.cursor -= 1;
                true
            }
            _ => false,
        };
        if !rewound {
            self.listing = None;
        }
        true
    }
}
