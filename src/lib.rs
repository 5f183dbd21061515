#![forbid(unsafe_code)]
//! findler: resumable, filterable directory traversal.
//!
//! A [`Configuration`] holds the policy (root, glob patterns, case and
//! hidden-file flags, ordering filters). [`Configuration::iterator`] turns it
//! into a [`FileIterator`] that returns matching files one at a time, notices
//! directories changing underneath it, and can be paused into a [`Snapshot`]
//! and resumed later without repeating or skipping files.
//!
//! ```no_run
//! use findler::Configuration;
//!
//! let mut config = Configuration::new("/srv/photos")?;
//! config.add_extension("jpg")?.case_insensitive();
//! config.add_filters(["order_by_name", "files_first"])?;
//!
//! let mut iter = config.iterator();
//! while let Some(file) = iter.next_file()? {
//!     println!("{}", file.display());
//! }
//! # Ok::<(), findler::Error>(())
//! ```

pub mod cli;
pub mod config;
pub mod entry;
pub mod error;
pub mod filters;
pub mod output;
pub mod path;
pub mod runner;
pub mod snapshot;
pub mod walk;

pub use config::{Configuration, MatchFlags};
pub use entry::{Entry, EntryKind};
pub use error::{ContractViolation, Error, Result};
pub use filters::{EntryFilter, FilterProvider, FilterRegistry};
pub use snapshot::{Snapshot, SNAPSHOT_VERSION};
pub use walk::FileIterator;
