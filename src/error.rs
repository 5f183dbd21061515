//! Error type shared by the configuration, filter pipeline and snapshots.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by findler.
///
/// All errors are synchronous: they surface from the call that caused them.
/// A missing root, or an entry vanishing mid-traversal, is not an error.
#[derive(Debug, Error)]
pub enum Error {
    /// A filter name the active provider does not expose.
    #[error("unknown filter `{name}`")]
    UnknownFilter {
        /// The requested filter name.
        name: String,
    },

    /// A filter broke the subset contract while a directory was being listed.
    #[error("filter `{filter}` violated its contract: {violation}")]
    FilterContract {
        /// Name the filter was registered under.
        filter: String,
        /// What the filter did wrong.
        violation: ContractViolation,
    },

    /// A glob pattern that could not be compiled.
    #[error("invalid pattern `{pattern}`")]
    InvalidPattern {
        /// The pattern as given.
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// Snapshot written by an incompatible version of the format.
    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedSnapshot {
        /// Version found in the snapshot.
        found: u32,
        /// Version this build understands.
        expected: u32,
    },

    /// Snapshot taken over a different root than the configuration it is restored into.
    #[error("snapshot root {} does not match configured root {}", .snapshot.display(), .configured.display())]
    SnapshotRoot {
        /// Root recorded in the snapshot.
        snapshot: PathBuf,
        /// Root of the configuration.
        configured: PathBuf,
    },

    /// Snapshot taken with different patterns, match flags, symlink policy
    /// or filters than the configuration it is restored into.
    #[error("snapshot of {} was taken with a different configuration", .root.display())]
    SnapshotConfiguration {
        /// Root of the traversal.
        root: PathBuf,
    },

    /// IO error while resolving a path.
    #[error("IO error at {}", .path.display())]
    Io {
        /// Path where the error occurred.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot could not be encoded or decoded.
    #[error("snapshot encoding failed")]
    Encoding(#[from] serde_json::Error),
}

impl Error {
    /// Create an `Io` error from `std::io::Error`.
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn contract(filter: &str, violation: ContractViolation) -> Self {
        Self::FilterContract {
            filter: filter.to_string(),
            violation,
        }
    }
}

/// The ways a filter can break the "reordered subset of its input" contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    /// The filter produced no result at all.
    #[error("returned no result")]
    NoResult,
    /// The filter returned an entry that was not in its input.
    #[error("returned {} which was not in its input", .0.display())]
    ForeignEntry(PathBuf),
    /// The filter returned the same entry more than once.
    #[error("returned {} more than once", .0.display())]
    DuplicateEntry(PathBuf),
}
