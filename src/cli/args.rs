//! Subcommand argument structures

use std::path::PathBuf;

use clap::Args;

use super::parse::parse_provider;
use cife_core::config::Provider;

/// Arguments for the judge command.
#[derive(Args, Debug, Clone)]
pub struct JudgeArgs {
    /// Table of model responses (.jsonl or .csv)
    #[arg(long, short)]
    pub input: PathBuf,

    /// Where to write the judged table (.jsonl)
    #[arg(long, short)]
    pub output: PathBuf,

    /// Judge model (overrides judge.model)
    #[arg(long)]
    pub model: Option<String>,

    /// Chat-completions base URL (overrides judge.base_url)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Judge provider: openai, azure, openai-compatible
    #[arg(long, value_parser = parse_provider)]
    pub provider: Option<Provider>,

    /// Concurrent judge calls (overrides judge.concurrency)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Request-rate ceiling, 0 for none (overrides judge.requests_per_minute)
    #[arg(long)]
    pub requests_per_minute: Option<u32>,
}

/// Arguments for the extract command.
#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Judged table with stored judge text
    #[arg(long, short)]
    pub input: PathBuf,

    /// Where to write the re-derived table (.jsonl)
    #[arg(long, short)]
    pub output: PathBuf,
}

/// Arguments for the metrics command.
#[derive(Args, Debug, Clone)]
pub struct MetricsArgs {
    /// Judged table (.jsonl or .csv)
    #[arg(long, short)]
    pub input: PathBuf,

    /// Column holding the adherence flag lists (overrides columns.adherence)
    #[arg(long)]
    pub column: Option<String>,

    /// Directory for the per-row `<stem>_metrics_extended.jsonl` file
    #[arg(long, default_value = "metrics")]
    pub output_dir: PathBuf,

    /// Summary file; one line is appended per run
    #[arg(long, default_value = "metrics_summary.jsonl")]
    pub summary_file: PathBuf,
}

/// Arguments for the rank command.
#[derive(Args, Debug, Clone)]
pub struct RankArgs {
    /// Directory of per-model result tables (.jsonl)
    #[arg(long)]
    pub input_dir: PathBuf,

    /// Where to write the ranking table (.jsonl)
    #[arg(long, short)]
    pub output: PathBuf,
}

/// Arguments for the filter command.
#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// Ranking table written by `cife rank`
    #[arg(long)]
    pub ranked: PathBuf,

    /// Number of top-ranked instances to drop
    #[arg(long)]
    pub drop_top: usize,

    /// Directory of per-model result tables (.jsonl)
    #[arg(long)]
    pub input_dir: PathBuf,

    /// Directory for the filtered tables, written under the same names
    #[arg(long)]
    pub output_dir: PathBuf,
}
