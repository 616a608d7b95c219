//! `cife metrics` command - CSR/SSR metrics for one judged table
//!
//! Writes `<stem>_metrics_extended.jsonl` (the input rows plus per-row CSR
//! and SSR) into the output directory and appends one summary line to the
//! summary file.

use std::path::PathBuf;

use crate::cli::MetricsArgs;
use crate::commands::dispatch::{trace_command, CommandContext};
use crate::commands::helpers::{percent, print_failure_counts, print_json};
use crate::output_by_format;
use cife_core::error::Result;
use cife_core::metrics::{compute_metrics, MetricsSummary};
use cife_core::table::{append_summary, write_jsonl, Table};

/// Execute the metrics command
pub fn execute(ctx: &CommandContext, args: &MetricsArgs) -> Result<()> {
    let mut columns = ctx.config.columns.clone();
    if let Some(column) = &args.column {
        columns.adherence = column.clone();
    }

    let table = Table::read(&args.input)?;
    trace_command!(ctx.cli, ctx.start, "read_table");

    let report = compute_metrics(&table, &columns)?;
    trace_command!(ctx.cli, ctx.start, "compute_metrics");

    let detailed = extended_path(args, &table);
    write_jsonl(&detailed, &report.rows)?;
    append_summary(&args.summary_file, &report.summary)?;
    tracing::info!(
        detailed = %detailed.display(),
        summary = %args.summary_file.display(),
        "wrote metrics"
    );

    output_by_format!(ctx.cli.format,
        json => print_json(&report.summary),
        human => {
            if !ctx.cli.quiet {
                print_human(&report.summary);
                println!("Per-row metrics -> {}", detailed.display());
                println!("Summary appended -> {}", args.summary_file.display());
            }
        }
    )
}

fn extended_path(args: &MetricsArgs, table: &Table) -> PathBuf {
    args.output_dir
        .join(format!("{}_metrics_extended.jsonl", table.stem()))
}

fn print_human(summary: &MetricsSummary) {
    println!("{} ({} rows scored)", summary.filename, summary.scored_rows);
    println!("  Overall CSR: {}", percent(summary.overall_csr));
    println!("  Overall SSR: {}", percent(summary.overall_ssr));
    println!(
        "  CSR=1 and at least partially correct: {} ({})",
        summary.correctness_csr.at_least_partially_correct_count,
        percent(summary.correctness_csr.at_least_partially_correct_pct)
    );
    if !summary.ssr_by_dataset.is_empty() {
        println!("  SSR by dataset:");
        for (dataset, ssr) in &summary.ssr_by_dataset {
            println!("    {}: {}", dataset, percent(*ssr));
        }
    }
    let failures = &summary.row_failures;
    if !failures.entries.is_empty()
        || failures.missing_category_constraints > 0
        || failures.missing_origin_constraints > 0
    {
        println!("  Row failures:");
        print_failure_counts(failures);
    }
}
