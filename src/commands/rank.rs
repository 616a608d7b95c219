//! `cife rank` command - rank instances by mean SSR across models

use serde_json::json;

use crate::cli::RankArgs;
use crate::commands::dispatch::{trace_command, CommandContext};
use crate::commands::helpers::{percent, print_json};
use crate::output_by_format;
use cife_core::error::Result;
use cife_core::ranking::rank_dir;
use cife_core::table::write_jsonl;

/// Instances shown in human output
const PREVIEW_ROWS: usize = 5;

/// Execute the rank command
pub fn execute(ctx: &CommandContext, args: &RankArgs) -> Result<()> {
    let ranking = rank_dir(&args.input_dir, &ctx.config.columns)?;
    trace_command!(ctx.cli, ctx.start, "rank_tables");

    write_jsonl(&args.output, &ranking.to_rows())?;

    output_by_format!(ctx.cli.format,
        json => print_json(&json!({
            "output": args.output,
            "models": ranking.models,
            "instances": ranking.entries.len(),
        })),
        human => {
            if !ctx.cli.quiet {
                println!(
                    "Ranked {} instances across {} models -> {}",
                    ranking.entries.len(),
                    ranking.models.len(),
                    args.output.display()
                );
                for entry in ranking.entries.iter().take(PREVIEW_ROWS) {
                    let ssr = entry
                        .overall_ssr
                        .map(percent)
                        .unwrap_or_else(|| "n/a".to_string());
                    println!("  {} ssr={} constraints={}", entry.id, ssr, entry.num_constraints);
                }
            }
        }
    )
}
