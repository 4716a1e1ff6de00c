//! CLI argument definitions, grounded on teacher's `cli::args` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sds-rulemgr")]
#[command(about = "Rule-driven file-processing engine for an SDS waveform archive")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect descriptors from an archive root and print or write them.
    Collect(CollectArgs),
    /// Run a rule sequence over a collected set of descriptors.
    Run(RunArgs),
    /// Append filenames to the deletion ledger, then run a rule sequence
    /// over the ledger's full contents.
    Delete(DeleteArgs),
}

#[derive(clap::Args, Clone)]
pub struct CollectArgs {
    /// Archive root to scan. Defaults to the configured `data_dir`.
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Glob wildcard patterns (7 dot-separated SDS fields each).
    #[arg(long = "collect-wildcards", num_args = 1..)]
    pub wildcards: Vec<String>,

    /// Only keep files whose modification time is at least this many
    /// minutes in the past.
    #[arg(long = "collect-finished")]
    pub finished_minutes: Option<i64>,

    /// Sort order applied to the collected set.
    #[arg(long, value_enum, default_value = "none")]
    pub sort: SortArg,

    /// Output path, or `-` for stdout (one filename per line).
    #[arg(short = 'o', long, default_value = "-")]
    pub output: String,
}

#[derive(clap::Args, Clone)]
pub struct RunArgs {
    /// Archive root to scan. Defaults to the configured `data_dir`.
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Path to the rule sequence + rule map document.
    #[arg(long = "ruleseq")]
    pub rule_sequence: PathBuf,

    /// Glob wildcard patterns (7 dot-separated SDS fields each).
    #[arg(long = "collect-wildcards", num_args = 1..)]
    pub wildcards: Vec<String>,

    /// Read an explicit filename list instead of scanning `--dir`
    /// (`-` for stdin, one filename per line).
    #[arg(long = "from-file")]
    pub from_file: Option<String>,

    /// Only keep files whose modification time is at least this many
    /// minutes in the past.
    #[arg(long = "collect-finished")]
    pub finished_minutes: Option<i64>,

    /// Sort order applied to the collected set.
    #[arg(long, value_enum, default_value = "none")]
    pub sort: SortArg,
}

#[derive(clap::Args, Clone)]
pub struct DeleteArgs {
    /// Archive root the ledger's filenames resolve against. Defaults to
    /// the configured `data_dir`.
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Path to the rule sequence + rule map document driving the deletion
    /// pipeline.
    #[arg(long = "ruleseq")]
    pub rule_sequence: PathBuf,

    /// Filenames to append to the ledger before running
    /// (`-` for stdin, one filename per line).
    #[arg(long = "from-file")]
    pub from_file: String,
}

#[derive(clap::ValueEnum, Clone, Copy)]
pub enum SortArg {
    None,
    Asc,
    Desc,
}

impl From<SortArg> for sds_collector::SortOrder {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::None => sds_collector::SortOrder::None,
            SortArg::Asc => sds_collector::SortOrder::Ascending,
            SortArg::Desc => sds_collector::SortOrder::Descending,
        }
    }
}
