//! Directory entries, directory stamps, and single-level listings.

use crate::path;
use std::ffi::{OsStr, OsString};
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Whether an entry is something to emit or something to descend into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One immediate child of a directory, as seen when the directory was listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    path: PathBuf,
    name: OsString,
    kind: EntryKind,
    len: u64,
    modified: Option<SystemTime>,
}

impl Entry {
    /// Build an entry from metadata that was already read for `path`.
    pub fn from_metadata(path: PathBuf, meta: &Metadata) -> Self {
        let kind = if meta.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        Self {
            name: path::base(&path),
            path,
            kind,
            len: meta.len(),
            modified: meta.modified().ok(),
        }
    }

    /// Stat `path` (following symlinks). `None` if it does not exist.
    pub fn probe(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let meta = fs::metadata(&path).ok()?;
        Some(Self::from_metadata(path, &meta))
    }

    /// Reassemble an entry from its recorded parts.
    pub(crate) fn from_parts(
        parent: &Path,
        name: OsString,
        kind: EntryKind,
        len: u64,
        modified: Option<SystemTime>,
    ) -> Self {
        Self {
            path: parent.join(&name),
            name,
            kind,
            len,
            modified,
        }
    }

    /// Absolute path of the entry.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identity key within the parent directory.
    pub fn name(&self) -> &OsStr {
        &self.name
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Size in bytes at listing time.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Modification time at listing time, if the platform reports one.
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    /// Whether the entry is still present on disk right now.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

/// Metadata tag used to decide whether a cached listing is stale.
///
/// Any add, remove or rename inside a directory bumps its mtime; the ctime
/// also catches changes that restore the old mtime. Filesystems with
/// one-second timestamp resolution can hide changes made within the same
/// second as the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirStamp {
    pub(crate) modified: Option<SystemTime>,
    pub(crate) changed: Option<(i64, i64)>,
}

impl DirStamp {
    /// Read the stamp of `dir`. `None` if it is gone or is not a directory.
    pub fn read(dir: &Path) -> Option<Self> {
        let meta = fs::metadata(dir).ok()?;
        if !meta.is_dir() {
            return None;
        }
        Some(Self {
            modified: meta.modified().ok(),
            changed: change_time(&meta),
        })
    }
}

#[cfg(unix)]
fn change_time(meta: &Metadata) -> Option<(i64, i64)> {
    use std::os::unix::fs::MetadataExt;
    Some((meta.ctime(), meta.ctime_nsec()))
}

#[cfg(not(unix))]
fn change_time(_meta: &Metadata) -> Option<(i64, i64)> {
    None
}

/// List the immediate children of `dir`, sorted by file name.
///
/// Entries that cannot be stat'ed (vanished, dangling links) are dropped.
/// Symlinks to directories are dropped unless `follow_symlinks` is set, and
/// even then a link back to the listed directory or one of its ancestors is
/// dropped so traversal cannot loop.
pub fn list_dir(dir: &Path, follow_symlinks: bool) -> Vec<Entry> {
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    let mut entries = Vec::new();
    let mut canonical_dir: Option<PathBuf> = None;

    for result in walker {
        let dent = match result {
            Ok(dent) => dent,
            Err(e) => {
                let not_found = e
                    .io_error()
                    .map(|io| io.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false);
                if not_found {
                    debug!(dir = %dir.display(), "entry vanished while listing");
                } else {
                    warn!(dir = %dir.display(), error = %e, "failed to list directory entry");
                }
                continue;
            }
        };

        let entry_path = dent.path().to_path_buf();
        let meta = match fs::metadata(&entry_path) {
            Ok(meta) => meta,
            Err(_) => continue,
        };

        if meta.is_dir() && dent.path_is_symlink() {
            if !follow_symlinks {
                continue;
            }
            if canonical_dir.is_none() {
                canonical_dir = fs::canonicalize(dir).ok();
            }
            let target = fs::canonicalize(&entry_path).ok();
            if let (Some(here), Some(target)) = (canonical_dir.as_ref(), target) {
                if here.starts_with(&target) {
                    debug!(link = %entry_path.display(), "skipping symlink loop");
                    continue;
                }
            }
        }

        entries.push(Entry::from_metadata(entry_path, &meta));
    }

    entries
}
