//! The resumable traversal: a pull-based iterator over matching files.

mod frame;

pub(crate) use frame::{Frame, Listing, Record};

use crate::config::Configuration;
use crate::error::Result;
use crate::snapshot::Snapshot;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Depth-first iterator over the files a [`Configuration`] selects.
///
/// Running out of files is momentary: once a directory's mtime or ctime
/// changes, a later call can pick up entries that appeared after the
/// previous `None`. A file is never returned twice by the same iterator,
/// including across [`rescan`](FileIterator::rescan) and snapshot/restore.
///
/// Every call may block on filesystem IO. There is no internal locking, so
/// one iterator must only be driven from one place at a time.
pub struct FileIterator {
    config: Arc<Configuration>,
    root: Frame,
}

impl FileIterator {
    pub(crate) fn new(config: Arc<Configuration>) -> Self {
        let root = Frame::new(config.root().to_path_buf());
        Self { config, root }
    }

    pub(crate) fn restore(config: Arc<Configuration>, snapshot: Snapshot) -> Result<Self> {
        let root = snapshot.into_state(&config)?;
        debug!(root = %root.path().display(), depth = root.depth(), "restored iterator");
        Ok(Self { config, root })
    }

    /// Root directory of the traversal.
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    /// Next matching file, or `None` if nothing is available right now.
    ///
    /// A missing root simply yields `None`. Errors come from the filter
    /// pipeline and leave the iterator where it was.
    pub fn next_file(&mut self) -> Result<Option<PathBuf>> {
        self.root.next_file(&self.config)
    }

    /// Forget every cached listing and every drained-directory mark so the
    /// whole tree is listed again on the next call. Files already returned
    /// stay returned.
    pub fn rescan(&mut self) {
        debug!(root = %self.root.path().display(), "rescan");
        self.root.rescan();
    }

    /// Capture the complete traversal state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.root, &self.config)
    }

    /// Undo the return of `file`, the last file handed out, so a later call
    /// returns it again. Used when a file could not be delivered.
    pub(crate) fn unreturn(&mut self, file: &Path) -> bool {
        let taken_back = self.root.unreturn(file);
        if taken_back {
            debug!(file = %file.display(), "file taken back");
        }
        taken_back
    }

    /// Number of directories currently open, the root included.
    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    /// Files returned so far.
    pub fn emitted(&self) -> usize {
        self.root.emitted()
    }
}

impl Iterator for FileIterator {
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_file().transpose()
    }
}

impl std::fmt::Debug for FileIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileIterator")
            .field("root", &self.root.path())
            .field("depth", &self.depth())
            .field("emitted", &self.emitted())
            .finish()
    }
}
