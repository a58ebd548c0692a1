//! CLI argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use labcheck::logging::LogFormat;

#[derive(Parser)]
#[command(
    name = "labcheck",
    version,
    about = "Check blood and urine lab reports against reference ranges",
    long_about = "Extract lab values from report text and check them against reference ranges.\n\n\
                  Reads plain-text reports (.txt, .text, .csv, .md) or stdin when FILE is '-'."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormat,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Print the response envelope (or error body) as JSON.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Score a blood report and print recommendations.
    Blood(BloodArgs),

    /// Run the urine panels and print the analysis with recommendations.
    Urine(UrineArgs),

    /// List the test values found in a report.
    Extract(ExtractArgs),
}

#[derive(Args)]
pub struct BloodArgs {
    /// Report file, or '-' for stdin.
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Reference ranges to use (male or female; unknown values fall back to male).
    #[arg(long)]
    pub gender: Option<String>,

    /// JSON reference table replacing the builtin one.
    #[arg(long = "reference-file", value_name = "PATH")]
    pub reference_file: Option<PathBuf>,

    /// Correct misspelled test names before extraction.
    #[arg(long = "fuzzy-terms")]
    pub fuzzy_terms: bool,
}

#[derive(Args)]
pub struct UrineArgs {
    /// Report file, or '-' for stdin.
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// rapid, complete, culture, 24-hour, pregnancy or full (default).
    #[arg(long = "test-type")]
    pub test_type: Option<String>,
}

#[derive(Args)]
pub struct ExtractArgs {
    /// Report file, or '-' for stdin.
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Correct misspelled test names before extraction.
    #[arg(long = "fuzzy-terms")]
    pub fuzzy_terms: bool,
}
