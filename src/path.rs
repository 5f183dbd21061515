//! Path helpers: absolute normalization, identity keys, hidden-entry checks.

use crate::error::{Error, Result};
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Make `path` absolute and lexically normalized.
///
/// Relative paths are resolved against the current directory. `.` is dropped
/// and `..` pops the previous component. The path does not have to exist, so
/// symlinks are never resolved here.
pub fn clean(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = std::env::current_dir().map_err(|e| Error::from_io(path, e))?;
        cwd.join(path)
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `/..` stays at `/`
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}

/// Identity key of an entry: its final component, byte for byte.
///
/// Names that are not valid UTF-8 keep their raw form, so two such names
/// never collapse into one key.
pub fn base(path: &Path) -> OsString {
    path.file_name().map(|n| n.to_os_string()).unwrap_or_default()
}

/// Whether the entry itself is a dotfile. Hidden parents do not count.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.as_encoded_bytes().starts_with(b"."))
}
