#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;
use findler::cli::Args;
use findler::runner::{self, RunOptions, Stop};
use findler::{Configuration, FileIterator, Snapshot};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::Path;
use std::time::Duration;

fn main() {
    let args = Args::parse().validated();
    setup_logging(args.verbose, args.quiet);

    if let Err(e) = run_app(args) {
        eprintln!("findler: {e:#}");
        std::process::exit(1);
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info,globset=warn"),
            2 => tracing_subscriber::EnvFilter::new("debug,globset=warn"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run_app(args: Args) -> Result<()> {
    let config = build_configuration(&args)?;
    let root = config.root();

    if root.exists() {
        anyhow::ensure!(root.is_dir(), "{}: Not a directory", root.display());
    } else if !args.watch {
        anyhow::bail!("{}: No such file or directory", root.display());
    }

    let mut iter = match &args.state {
        Some(state) if state.exists() => load_state(&config, state)?,
        _ => config.iterator(),
    };

    let (interrupt_tx, interrupt_rx) = crossbeam_channel::bounded(1);
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.try_send(());
    })
    .context("failed to install Ctrl-C handler")?;

    let options = RunOptions {
        relative: args.relative,
        limit: args.limit,
        watch: args.watch,
        interval: Duration::from_millis(args.interval_ms),
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let report = runner::run(&mut iter, &mut out, &options, &interrupt_rx);

    // Progress is saved even when the run failed part way.
    if let Some(state) = &args.state {
        save_state(&iter, state)?;
    }

    let report = report?;
    if report.stop == Stop::Interrupted {
        tracing::info!(printed = report.printed, "interrupted");
    }
    Ok(())
}

fn build_configuration(args: &Args) -> Result<Configuration> {
    let mut config = Configuration::new(&args.path)
        .with_context(|| format!("{}: failed to resolve path", args.path.display()))?;

    config
        .add_patterns(&args.patterns)
        .context("invalid --pattern")?;
    for ext in &args.extensions {
        config.add_extension(ext).context("invalid --ext")?;
    }
    if args.ignore_case {
        config.case_insensitive();
    }
    if args.include_hidden {
        config.include_hidden();
    }
    config.follow_symlinks(args.follow_symlinks);
    config.add_filters(&args.filters).context("invalid --filter")?;

    Ok(config)
}

fn load_state(config: &Configuration, state: &Path) -> Result<FileIterator> {
    let file =
        File::open(state).with_context(|| format!("{}: failed to open state", state.display()))?;
    let snapshot = Snapshot::read_from(BufReader::new(file))
        .with_context(|| format!("{}: failed to read state", state.display()))?;
    config
        .restore(snapshot)
        .with_context(|| format!("{}: failed to restore state", state.display()))
}

/// Write through a sibling temp file so an interrupted save never leaves a
/// truncated snapshot behind.
fn save_state(iter: &FileIterator, state: &Path) -> Result<()> {
    let mut tmp_name = state.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = Path::new(&tmp_name);

    let file =
        File::create(tmp).with_context(|| format!("{}: failed to create state", tmp.display()))?;
    let mut writer = BufWriter::new(file);
    iter.snapshot()
        .write_to(&mut writer)
        .with_context(|| format!("{}: failed to write state", tmp.display()))?;
    writer
        .into_inner()
        .map_err(|e| e.into_error())
        .and_then(|f| f.sync_all())
        .with_context(|| format!("{}: failed to flush state", tmp.display()))?;
    fs::rename(tmp, state)
        .with_context(|| format!("{}: failed to save state", state.display()))?;
    Ok(())
}
