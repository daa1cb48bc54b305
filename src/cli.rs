mod values;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
pub use values::{OutputFormat, SourceSpec};

/// Watch network connections and filter them with a boolean query language
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// TOML config file
    #[arg(long, global = true, env = "CONNVIEW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Filter text (enables the filter)
    #[arg(short, long, global = true)]
    pub filter: Option<String>,

    /// Match the filter with Unicode case folding
    #[arg(short = 'i', long, global = true)]
    pub ignore_case: bool,

    /// Interpret OR, !, quotes and parentheses in the filter
    #[arg(short = 'o', long, global = true)]
    pub operators: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// More log output (repeatable)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll connections and print what changed on every cycle
    Watch {
        /// Where snapshots come from: "proc" or "json:<path>"
        #[arg(short, long, default_value = "proc")]
        source: SourceSpec,

        /// Stop after this many cycles
        #[arg(short = 'n', long)]
        iterations: Option<usize>,

        /// Poll interval in milliseconds (overrides config)
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Hide listening and other unestablished sockets
        #[arg(long)]
        established_only: bool,
    },
    /// Print one snapshot as a table
    List {
        #[arg(short, long, default_value = "proc")]
        source: SourceSpec,

        #[arg(long)]
        established_only: bool,
    },
    /// Reconcile two JSON snapshots and print the resulting operations
    Reconcile {
        /// Earlier snapshot
        #[arg(short = 'a', long)]
        before: PathBuf,

        /// Later snapshot
        #[arg(short = 'b', long)]
        after: PathBuf,
    },
    /// Print input lines that pass the filter
    Filter {
        /// Input file; standard input when omitted
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print the filter in canonical form
    PrintFilter {
        /// Also print the character classification under the text
        #[arg(long)]
        mask: bool,
    },
}

pub fn cli_parse() -> Cli {
    Cli::parse()
}
