//! `cife extract` command - re-derive verdict columns without the network

use serde_json::json;

use crate::cli::ExtractArgs;
use crate::commands::dispatch::{trace_command, CommandContext};
use crate::commands::helpers::{print_failure_counts, print_json};
use crate::output_by_format;
use cife_core::error::Result;
use cife_core::judge::apply_extraction;
use cife_core::table::{write_jsonl, Table};

/// Execute the extract command
pub fn execute(ctx: &CommandContext, args: &ExtractArgs) -> Result<()> {
    let columns = &ctx.config.columns;

    let mut table = Table::read(&args.input)?;
    table.require_column(&columns.adherence_response)?;
    trace_command!(ctx.cli, ctx.start, "read_table");

    let failures = apply_extraction(&mut table.rows, columns)?;
    write_jsonl(&args.output, &table.rows)?;
    trace_command!(ctx.cli, ctx.start, "extract_rows");

    let summary = failures.summary();
    output_by_format!(ctx.cli.format,
        json => print_json(&json!({
            "input": args.input,
            "output": args.output,
            "rows": table.len(),
            "failures": summary,
        })),
        human => {
            if !ctx.cli.quiet {
                println!(
                    "Extracted verdicts for {} rows -> {}",
                    table.len(),
                    args.output.display()
                );
                print_failure_counts(&summary);
            }
        }
    )
}
