//! Drive an iterator to stdout: one pass, or a polling watch loop that ends
//! on an interrupt.

use crate::output::print_file;
use crate::walk::FileIterator;
use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::io::{ErrorKind, Write};
use std::time::Duration;
use tracing::{debug, info};

/// How the traversal should be paced and printed.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Print paths relative to the root.
    pub relative: bool,
    /// Stop after this many files.
    pub limit: Option<usize>,
    /// Keep polling after the tree runs dry.
    pub watch: bool,
    /// Time between polls in watch mode.
    pub interval: Duration,
}

/// Why the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    /// Nothing more to return right now.
    Exhausted,
    /// `limit` files were printed.
    Limit,
    /// An interrupt arrived, or the interrupt channel closed.
    Interrupted,
    /// The output was closed by the reader. The file whose write failed
    /// is handed back to the iterator, so a saved state still includes it.
    OutputClosed,
}

/// Summary of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub printed: usize,
    pub stop: Stop,
}

/// Pull files from `iter` and print them until one of the stop conditions
/// in [`Stop`] holds. `interrupt` is checked between files and while
/// waiting between polls.
pub fn run<W: Write>(
    iter: &mut FileIterator,
    out: &mut W,
    options: &RunOptions,
    interrupt: &Receiver<()>,
) -> Result<RunReport> {
    let root = iter.path().to_path_buf();
    let mut printed = 0;

    loop {
        loop {
            if options.limit.is_some_and(|limit| printed >= limit) {
                return finish(out, printed, Stop::Limit);
            }
            if interrupt.try_recv().is_ok() {
                return finish(out, printed, Stop::Interrupted);
            }
            let Some(file) = iter.next_file().context("traversal failed")? else {
                break;
            };
            if let Err(e) = print_file(out, &file, &root, options.relative) {
                // Never printed, so it must not count as returned.
                iter.unreturn(&file);
                if e.kind() == ErrorKind::BrokenPipe {
                    return Ok(RunReport {
                        printed,
                        stop: Stop::OutputClosed,
                    });
                }
                return Err(e).context("failed to write output");
            }
            printed += 1;
        }

        if !options.watch {
            return finish(out, printed, Stop::Exhausted);
        }
        out.flush().context("failed to write output")?;
        debug!(printed, "waiting for changes");

        match interrupt.recv_timeout(options.interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                return finish(out, printed, Stop::Interrupted);
            }
        }
        iter.rescan();
    }
}

fn finish<W: Write>(out: &mut W, printed: usize, stop: Stop) -> Result<RunReport> {
    match out.flush() {
        Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
        other => other.context("failed to write output")?,
    }
    info!(printed, ?stop, "traversal stopped");
    Ok(RunReport { printed, stop })
}
