use clap::Parser;
use std::path::PathBuf;

const EXAMPLES: &str = "\
Examples:
  findler ~/Pictures -e jpg -e png -i
  findler . -p '*.rs' -f order_by_name -f files_first
  findler /data -s progress.json -n 100
  findler /incoming -w --interval 500";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "findler",
    version,
    about = "Resumable, filterable directory traversal",
    after_help = EXAMPLES
)]
pub struct Args {
    /// Directory to traverse (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Glob a file must match (repeatable; default: every file)
    #[arg(short = 'p', long = "pattern", action = clap::ArgAction::Append)]
    pub patterns: Vec<String>,

    /// File extension to match, with or without the dot (repeatable)
    #[arg(short = 'e', long = "ext", action = clap::ArgAction::Append)]
    pub extensions: Vec<String>,

    /// Match patterns case-insensitively
    #[arg(short = 'i', long = "ignore-case")]
    pub ignore_case: bool,

    /// Include hidden files and directories (dotfiles)
    #[arg(short = 'a', long = "all")]
    pub include_hidden: bool,

    /// Descend into symlinked directories
    #[arg(short = 'L', long = "follow-symlinks")]
    pub follow_symlinks: bool,

    /// Ordering filter to apply to every directory, in order (repeatable)
    #[arg(short = 'f', long = "filter", action = clap::ArgAction::Append)]
    pub filters: Vec<String>,

    /// Print paths relative to the traversal root
    #[arg(short = 'r', long = "relative")]
    pub relative: bool,

    /// Stop after this many files
    #[arg(short = 'n', long = "limit")]
    pub limit: Option<usize>,

    /// Resume from this snapshot file if it exists and save progress to it on exit
    #[arg(short = 's', long = "state")]
    pub state: Option<PathBuf>,

    /// Keep polling for new files until interrupted
    #[arg(short = 'w', long = "watch")]
    pub watch: bool,

    /// Poll interval in milliseconds for --watch (minimum 50)
    #[arg(long = "interval", default_value = "1000")]
    pub interval_ms: u64,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all logging
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

impl Args {
    /// Enforce invariants after parsing.
    pub fn validated(mut self) -> Self {
        if self.interval_ms < 50 {
            self.interval_ms = 50;
        }
        if self.quiet {
            self.verbose = 0;
        }
        self
    }
}
