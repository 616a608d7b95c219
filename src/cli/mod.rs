//! CLI argument parsing for cife
//!
//! Global flags: --config, --format, --quiet, --verbose, --log-level, --log-json

pub mod args;
pub mod format;
pub mod output;
pub mod parse;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use args::{ExtractArgs, FilterArgs, JudgeArgs, MetricsArgs, RankArgs};
pub use output::OutputFormat;

/// cife - judge, score and rank constraint-following benchmark runs
#[derive(Parser, Debug)]
#[command(name = "cife")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (default: ./cife.toml, then the user config dir)
    #[arg(long, global = true, env = "CIFE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Debug-level logging and phase timings
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Explicit log filter (e.g. info, or cife_core=trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send responses to the judge model and derive verdict columns
    Judge(JudgeArgs),

    /// Re-derive verdict columns from stored judge text (offline)
    Extract(ExtractArgs),

    /// Compute CSR/SSR metrics for a judged table
    Metrics(MetricsArgs),

    /// Rank instances by mean SSR across model result tables
    Rank(RankArgs),

    /// Drop the top-ranked instances from every result table
    Filter(FilterArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "cife",
            "metrics",
            "--input",
            "run.jsonl",
            "--format",
            "json",
            "--verbose",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Some(Commands::Metrics(_))));
    }

    #[test]
    fn test_filter_requires_drop_top() {
        let err = Cli::try_parse_from([
            "cife",
            "filter",
            "--ranked",
            "ranked.jsonl",
            "--input-dir",
            "runs",
            "--output-dir",
            "out",
        ])
        .unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }
}
