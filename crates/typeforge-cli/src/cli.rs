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
    author = "The typeforge developers",
    version,
    about = "typeforge CLI - Assigns forcefield atom types and bonded/nonbonded parameters to molecular structures.",
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
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Type a structure and attach forcefield parameters to every atom and term.
    Apply(ApplyArgs),
    /// Load forcefield definitions, validate them and print a summary.
    Check(CheckArgs),
    /// List the forcefields shipped with typeforge.
    ListBuiltins,
}

/// Arguments for the `apply` subcommand.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Path to the input molecular structure file (e.g., ethane.bgf).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the typed output structure file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    #[command(flatten)]
    pub forcefields: ForcefieldArgs,

    /// Residue names to keep; all other atoms are merged into one residue named RES.
    #[arg(short, long, value_name = "NAME", num_args(1..))]
    pub residues: Vec<String>,

    /// Type every atom individually instead of once per distinct residue.
    #[arg(long)]
    pub no_residue_map: bool,

    /// Fail instead of falling back to per-atom typing when residues are bonded to each other.
    #[arg(long, conflicts_with = "no_residue_map")]
    pub strict_residues: bool,

    /// Write a BibTeX file citing the sources of the matched atom types.
    #[arg(long, value_name = "PATH")]
    pub references: Option<PathBuf>,

    /// Resolve competing typing rules only through explicit overrides.
    #[arg(long)]
    pub overrides_only: bool,
}

/// Arguments for the `check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub forcefields: ForcefieldArgs,
}

#[derive(Args, Debug)]
pub struct ForcefieldArgs {
    /// Forcefield to load, by built-in name (e.g., 'oplsaa') or TOML path.
    /// Can be used multiple times; sources are merged in order.
    #[arg(short = 'f', long = "forcefield", required = true, value_name = "NAME_OR_PATH")]
    pub sources: Vec<String>,
}
