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
    author = "Shubhadeep Sadhukhan, Shashwat Bhattacharya, Mahendra K. Verma",
    version,
    about = "fastSF - A parallel, load-balanced calculator of velocity and scalar structure functions for turbulent flows.",
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

    /// Write logs to a specified file in addition to the console output.
    /// Ranks other than 0 append `.rank<N>` to the file stem.
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation within each rank.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute structure functions of a velocity or scalar field.
    Compute(ComputeArgs),
    /// Show how the displacement domain is split across a process group.
    Partition(PartitionArgs),
}

/// Arguments for the `compute` subcommand.
#[derive(Args, Debug)]
pub struct ComputeArgs {
    /// Path to the run configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Override the directory holding the input field files.
    #[arg(short, long, value_name = "DIR")]
    pub input: Option<PathBuf>,

    /// Override the directory the result grids are written to.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Number of processes along the first decomposed axis (x).
    #[arg(long, value_name = "INT")]
    pub px: Option<usize>,

    /// Use linear synthetic fields and validate the results against their closed forms.
    #[arg(long)]
    pub synthetic: bool,

    #[command(flatten)]
    pub backend: BackendArgs,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S structure-function.q2=6
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Selects the process group the computation runs on.
#[derive(Args, Debug, Clone, Copy, Default)]
#[group(required = false, multiple = false)]
pub struct BackendArgs {
    /// Run as a group of this many ranks inside the current process.
    #[arg(short = 'n', long, value_name = "INT")]
    pub ranks: Option<usize>,

    /// Join the MPI job this process was launched in (requires the `mpi` feature).
    #[arg(long)]
    pub mpi: bool,
}

/// Arguments for the `partition` subcommand.
#[derive(Args, Debug)]
pub struct PartitionArgs {
    /// Path to the run configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Number of processes along the first decomposed axis (x).
    #[arg(long, value_name = "INT")]
    pub px: Option<usize>,

    /// Total number of processes to partition for.
    #[arg(short = 'n', long, value_name = "INT", default_value_t = 1)]
    pub ranks: usize,

    /// Set a specific configuration value, overriding the config file.
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}
