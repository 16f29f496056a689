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
    about = "foldsketch - design nucleic-acid sequences that fold into several target structures at once.",
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

    /// Set the number of threads for parallel runs.
    /// Defaults to the number of available logical cores.
    #[arg(short = 't', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Design sequences for a set of target secondary structures.
    Design(DesignArgs),
}

/// Arguments for the `design` subcommand. Flags override values from the
/// configuration file; built-in defaults apply when neither is given.
#[derive(Args, Debug, Default)]
pub struct DesignArgs {
    /// Read target structures and sequence constraint from a *.inp file.
    #[arg(short, long, value_name = "PATH", conflicts_with = "stdin")]
    pub file: Option<PathBuf>,

    /// Read target structures and sequence constraint from standard input.
    #[arg(short = 'i', long)]
    pub stdin: bool,

    /// Path to a configuration file in TOML format.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Number of designs to generate.
    #[arg(short, long, value_name = "INT")]
    pub number: Option<usize>,

    /// Random full resamples before constrained generation starts.
    #[arg(short, long, value_name = "INT")]
    pub jump: Option<u64>,

    /// Stop a run after this many candidates without improvement.
    #[arg(short, long, value_name = "INT")]
    pub exit: Option<u64>,

    /// Sampling mode: full, global or local.
    #[arg(short, long, value_name = "MODE")]
    pub mode: Option<String>,

    /// Energy margin negative folds must keep above every target eos.
    #[arg(short = 'x', long, value_name = "FLOAT")]
    pub max_eos_diff: Option<f64>,

    /// Maximum number of negative constraints kept per run.
    #[arg(short = 's', long, value_name = "INT")]
    pub ledger_capacity: Option<usize>,

    /// Timeout for dependency graph construction, in seconds (0 = none).
    #[arg(short = 'k', long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Seed for the samplers; runs are reproducible when set.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Pairwise eos difference penalty: squared or absolute.
    #[arg(long, value_name = "KIND")]
    pub penalty: Option<String>,

    /// Write the dependency graph as GraphML to the given file.
    #[arg(short, long, value_name = "PATH")]
    pub graphml: Option<PathBuf>,

    /// Write results as semicolon-separated CSV to stdout.
    #[arg(short, long)]
    pub csv: bool,

    /// Show optimization progress.
    #[arg(short, long)]
    pub progress: bool,
}
