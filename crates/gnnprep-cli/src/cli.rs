use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "gnnprep - Convert protein structures into feature-labelled contact graphs for graph neural network training.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of parallel workers.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build graphs for every query of a manifest and write them to graph archives.
    Process(ProcessArgs),
    /// Summarize the records stored in a graph archive.
    Inspect(InspectArgs),
}

/// Arguments for the `process` subcommand.
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Path to the query manifest in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub manifest: PathBuf,

    /// Override the output prefix; archives are written as `<prefix>.gnn` or `<prefix>-<n>.gnn`.
    #[arg(short, long, value_name = "PREFIX")]
    pub output_prefix: Option<PathBuf>,

    /// Override the feature modules to run, as a comma-separated list or `all`.
    #[arg(short, long, value_name = "NAMES", value_delimiter = ',')]
    pub features: Option<Vec<String>>,

    /// Override `settings.combine-output` from the manifest.
    #[command(flatten)]
    pub combine: CombineOutput,

    /// Override the per-query feature timeout, in seconds.
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Set a specific manifest setting, overriding the file.
    /// Can be used multiple times. Example: -S settings.query-timeout-secs=60
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

#[derive(Args, Debug, Default)]
#[group(multiple = false)]
pub struct CombineOutput {
    /// Merge the per-worker archives into a single file.
    #[arg(long)]
    pub combine: bool,

    /// Keep one archive per worker.
    #[arg(long)]
    pub no_combine: bool,
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to a graph archive.
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Print only the record keys, one per line.
    #[arg(short, long)]
    pub keys: bool,
}
