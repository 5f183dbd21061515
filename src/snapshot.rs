//! Versioned, serializable traversal state.
//!
//! The nested frame chain is stored flat so the encoded nesting depth does
//! not grow with the tree:
//!
//! - `frames` lists the open directories from the root down to the deepest
//!   active one, each naming its directory relative to the one before.
//! - Every frame carries its file history as a list of records, one per
//!   directory below it that has returned files, keyed by relative path.
//!
//! Names are kept byte for byte: valid UTF-8 is written as a string,
//! anything else as an array of raw bytes. Timestamps are signed seconds
//! plus nanoseconds from the Unix epoch, so times before 1970 survive.

use crate::config::{Configuration, MatchFlags};
use crate::entry::{DirStamp, Entry, EntryKind};
use crate::error::{Error, Result};
use crate::walk::{Frame, Listing, Record};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::ffi::{OsStr, OsString};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current snapshot format.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Opaque traversal state, produced by `FileIterator::snapshot` and turned
/// back into an iterator by `Configuration::restore`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    version: u32,
    root: Name,
    selection: Selection,
    frames: Vec<SavedFrame>,
}

/// The parts of a configuration that decided what the cached listings hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Selection {
    patterns: Vec<String>,
    ignore_case: bool,
    include_hidden: bool,
    follow_symlinks: bool,
    filters: Vec<String>,
}

impl Selection {
    fn of(config: &Configuration) -> Self {
        let MatchFlags {
            ignore_case,
            include_hidden,
        } = config.flags();
        Self {
            patterns: config.patterns().map(str::to_string).collect(),
            ignore_case,
            include_hidden,
            follow_symlinks: config.follows_symlinks(),
            filters: config.filters().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SavedFrame {
    /// Directory name relative to the previous frame; empty for the root.
    #[serde(default)]
    name: Name,
    #[serde(default)]
    records: Vec<SavedRecord>,
    #[serde(default)]
    visited_dirs: Vec<Name>,
    #[serde(default)]
    listing: Option<SavedListing>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SavedRecord {
    /// Path components from the frame's directory; empty for the directory itself.
    #[serde(default)]
    dir: Vec<Name>,
    #[serde(default)]
    files: Vec<Name>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SavedListing {
    stamp: SavedStamp,
    entries: Vec<SavedEntry>,
    cursor: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SavedStamp {
    modified: Option<Timestamp>,
    changed: Option<(i64, i64)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SavedEntry {
    name: Name,
    kind: SavedKind,
    len: u64,
    modified: Option<Timestamp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SavedKind {
    File,
    Directory,
}

impl Snapshot {
    pub(crate) fn capture(root: &Frame, config: &Configuration) -> Self {
        let mut frames = Vec::new();
        let mut current = Some(root);
        let mut name = Name::default();
        while let Some(frame) = current {
            frames.push(SavedFrame::save(frame, name));
            current = frame.active.as_deref();
            name = current.map(|child| Name::of_base(&child.path)).unwrap_or_default();
        }
        Self {
            version: SNAPSHOT_VERSION,
            root: Name(root.path.clone().into_os_string()),
            selection: Selection::of(config),
            frames,
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Root directory the snapshot was taken over.
    pub fn root(&self) -> &Path {
        Path::new(&self.root.0)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(json)?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        let snapshot: Self = serde_json::from_reader(reader)?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    fn check_version(&self) -> Result<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(Error::UnsupportedSnapshot {
                found: self.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        Ok(())
    }

    /// Rebuild the frame chain after checking the snapshot was taken over
    /// the same root with the same selection settings as `config`.
    pub(crate) fn into_state(self, config: &Configuration) -> Result<Frame> {
        self.check_version()?;
        if self.root() != config.root() {
            return Err(Error::SnapshotRoot {
                snapshot: self.root().to_path_buf(),
                configured: config.root().to_path_buf(),
            });
        }
        if self.selection != Selection::of(config) {
            return Err(Error::SnapshotConfiguration {
                root: config.root().to_path_buf(),
            });
        }

        let mut frames = Vec::with_capacity(self.frames.len());
        let mut dir = PathBuf::from(self.root.0);
        for (depth, saved) in self.frames.into_iter().enumerate() {
            if depth > 0 {
                dir.push(&saved.name.0);
            }
            frames.push(saved.restore(dir.clone()));
        }

        let mut chain: Option<Box<Frame>> = None;
        while let Some(mut frame) = frames.pop() {
            frame.active = chain;
            chain = Some(Box::new(frame));
        }
        Ok(chain.map_or_else(|| Frame::new(dir), |root| *root))
    }
}

impl SavedFrame {
    fn save(frame: &Frame, name: Name) -> Self {
        let mut records = Vec::new();
        flatten(&frame.record, &mut Vec::new(), &mut records);
        Self {
            name,
            records,
            visited_dirs: frame.visited_dirs.iter().cloned().map(Name).collect(),
            listing: frame.listing.as_ref().map(SavedListing::save),
        }
    }

    fn restore(self, path: PathBuf) -> Frame {
        let mut record = Record::default();
        for saved in self.records {
            let mut node = &mut record;
            for component in saved.dir {
                node = node.dirs.entry(component.0).or_default();
            }
            node.files.extend(saved.files.into_iter().map(|n| n.0));
        }
        let listing = self.listing.map(|l| l.restore(&path));
        let mut frame = Frame::with_record(path, record);
        frame.visited_dirs = self.visited_dirs.into_iter().map(|n| n.0).collect();
        frame.listing = listing;
        frame
    }
}

fn flatten(record: &Record, dir: &mut Vec<Name>, out: &mut Vec<SavedRecord>) {
    out.push(SavedRecord {
        dir: dir.clone(),
        files: record.files.iter().cloned().map(Name).collect(),
    });
    for (name, sub) in &record.dirs {
        dir.push(Name(name.clone()));
        flatten(sub, dir, out);
        dir.pop();
    }
}

impl SavedListing {
    fn save(listing: &Listing) -> Self {
        Self {
            stamp: SavedStamp {
                modified: listing.stamp.modified.map(Timestamp::from),
                changed: listing.stamp.changed,
            },
            entries: listing
                .entries
                .iter()
                .map(|e| SavedEntry {
                    name: Name(e.name().to_os_string()),
                    kind: match e.kind() {
                        EntryKind::File => SavedKind::File,
                        EntryKind::Directory => SavedKind::Directory,
                    },
                    len: e.len(),
                    modified: e.modified().map(Timestamp::from),
                })
                .collect(),
            cursor: listing.cursor,
        }
    }

    fn restore(self, dir: &Path) -> Listing {
        Listing {
            stamp: DirStamp {
                modified: self.stamp.modified.and_then(Timestamp::to_system_time),
                changed: self.stamp.changed,
            },
            entries: self
                .entries
                .into_iter()
                .map(|e| {
                    let kind = match e.kind {
                        SavedKind::File => EntryKind::File,
                        SavedKind::Directory => EntryKind::Directory,
                    };
                    let modified = e.modified.and_then(Timestamp::to_system_time);
                    Entry::from_parts(dir, e.name.0, kind, e.len, modified)
                })
                .collect(),
            cursor: self.cursor,
        }
    }
}

/// A point in time as whole seconds from the Unix epoch (negative before
/// it) plus a non-negative nanosecond part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Timestamp {
    secs: i64,
    nanos: u32,
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(after) => Self {
                secs: i64::try_from(after.as_secs()).unwrap_or(i64::MAX),
                nanos: after.subsec_nanos(),
            },
            Err(e) => {
                let before = e.duration();
                let secs = i64::try_from(before.as_secs()).unwrap_or(i64::MAX);
                match before.subsec_nanos() {
                    0 => Self { secs: -secs, nanos: 0 },
                    n => Self {
                        secs: -secs - 1,
                        nanos: 1_000_000_000 - n,
                    },
                }
            }
        }
    }
}

impl Timestamp {
    fn to_system_time(self) -> Option<SystemTime> {
        let whole = Duration::from_secs(self.secs.unsigned_abs());
        let base = if self.secs >= 0 {
            UNIX_EPOCH.checked_add(whole)?
        } else {
            UNIX_EPOCH.checked_sub(whole)?
        };
        base.checked_add(Duration::from_nanos(u64::from(self.nanos)))
    }
}

/// A file name or path, kept exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Name(OsString);

impl Name {
    fn of_base(path: &Path) -> Self {
        Self(crate::path::base(path))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NameRepr {
    Text(String),
    Raw(Vec<u8>),
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0.to_str() {
            Some(text) => serializer.serialize_str(text),
            None => serialize_raw(&self.0, serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match NameRepr::deserialize(deserializer)? {
            NameRepr::Text(text) => Ok(Self(OsString::from(text))),
            NameRepr::Raw(bytes) => deserialize_raw(bytes).map(Self),
        }
    }
}

#[cfg(unix)]
fn serialize_raw<S: Serializer>(name: &OsStr, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    use std::os::unix::ffi::OsStrExt;
    serializer.collect_seq(name.as_bytes())
}

#[cfg(unix)]
fn deserialize_raw<E: serde::de::Error>(bytes: Vec<u8>) -> std::result::Result<OsString, E> {
    use std::os::unix::ffi::OsStringExt;
    Ok(OsString::from_vec(bytes))
}

#[cfg(not(unix))]
fn serialize_raw<S: Serializer>(name: &OsStr, _serializer: S) -> std::result::Result<S::Ok, S::Error> {
    Err(serde::ser::Error::custom(format!(
        "name {} is not valid Unicode",
        name.to_string_lossy()
    )))
}

#[cfg(not(unix))]
fn deserialize_raw<E: serde::de::Error>(_bytes: Vec<u8>) -> std::result::Result<OsString, E> {
    Err(E::custom("raw byte names are only supported on Unix"))
}
