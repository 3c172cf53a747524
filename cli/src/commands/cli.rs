use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Jsonl,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Jsonl => "jsonl",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "fanout", version, about = "Fetch many URLs concurrently under one deadline")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Explicit config file (defaults to ~/.fanout/config.toml, then ./config.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct FetchArgs {
    /// URLs to fetch; ids are assigned 1..N in the order given.
    pub urls: Vec<String>,

    /// Read additional URLs from a file, one per line ('#' starts a comment).
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Deadline for the whole batch in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Maximum concurrent requests (default: one per URL).
    #[arg(long)]
    pub max_parallel: Option<usize>,

    /// Abort in-flight requests at the deadline instead of only skipping unstarted ones.
    #[arg(long)]
    pub hardened: bool,

    /// Treat non-2xx responses as failures.
    #[arg(long)]
    pub fail_on_status: bool,

    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pretty-print JSONL events.
    #[arg(long)]
    pub pretty: bool,

    /// Disable the progress bar.
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch URLs concurrently and report per-URL status.
    Fetch(FetchArgs),
    /// Print the effective configuration as TOML.
    Config,
}
