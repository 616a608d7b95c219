//! `cife filter` command - drop the top-ranked instances from every table

use serde_json::json;

use crate::cli::FilterArgs;
use crate::commands::dispatch::{trace_command, CommandContext};
use crate::commands::helpers::print_json;
use crate::output_by_format;
use cife_core::error::Result;
use cife_core::ranking::{filter_dir, retained_ids_from_ranked};
use cife_core::table::Table;

/// Execute the filter command
pub fn execute(ctx: &CommandContext, args: &FilterArgs) -> Result<()> {
    let id_column = &ctx.config.columns.id;

    let ranked = Table::read(&args.ranked)?;
    ranked.require_column(id_column)?;
    if args.drop_top > ranked.len() {
        tracing::warn!(
            drop_top = args.drop_top,
            ranked = ranked.len(),
            "dropping more instances than the ranking holds; every row is removed"
        );
    }

    let retained = retained_ids_from_ranked(&ranked.rows, id_column, args.drop_top);
    let reports = filter_dir(&args.input_dir, &args.output_dir, &retained, id_column)?;
    trace_command!(ctx.cli, ctx.start, "filter_tables");

    output_by_format!(ctx.cli.format,
        json => print_json(&json!({
            "drop_top": args.drop_top,
            "retained": retained.len(),
            "files": reports,
        })),
        human => {
            if !ctx.cli.quiet {
                println!(
                    "Dropped top {} instances, {} retained",
                    args.drop_top,
                    retained.len()
                );
                for report in &reports {
                    println!(
                        "  {}: {} -> {} rows",
                        report.output.display(),
                        report.before,
                        report.after
                    );
                }
            }
        }
    )
}
