//! `cife judge` command - call the judge model for every row
//!
//! Writes the input rows back out with the raw judge text and the derived
//! adherence and correctness columns.

use serde_json::json;

use crate::cli::JudgeArgs;
use crate::commands::dispatch::{trace_command, CommandContext};
use crate::commands::helpers::{print_failure_counts, print_json};
use crate::output_by_format;
use cife_core::config::CifeConfig;
use cife_core::error::{CifeError, Result};
use cife_core::judge::{run_judge, OpenAiJudge, PromptTemplates};
use cife_core::table::{write_jsonl, Table};

/// Execute the judge command
pub fn execute(ctx: &CommandContext, args: &JudgeArgs) -> Result<()> {
    let config = with_overrides(ctx.config, args)?;
    let columns = &config.columns;

    let mut table = Table::read(&args.input)?;
    table.require_column(&columns.response)?;
    trace_command!(ctx.cli, ctx.start, "read_table");

    let client = OpenAiJudge::from_config(&config.judge)?;
    let templates = PromptTemplates::from_config(&config.prompts);
    tracing::info!(
        endpoint = client.endpoint(),
        model = %config.judge.model,
        rows = table.len(),
        "judging"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CifeError::operation("start async runtime", e))?;
    let failures = runtime.block_on(run_judge(
        &client,
        &mut table.rows,
        &config.judge,
        &templates,
        columns,
    ))?;
    trace_command!(ctx.cli, ctx.start, "judge_rows");

    write_jsonl(&args.output, &table.rows)?;

    let summary = failures.summary();
    output_by_format!(ctx.cli.format,
        json => print_json(&json!({
            "input": args.input,
            "output": args.output,
            "rows": table.len(),
            "model": config.judge.model,
            "failures": summary,
        })),
        human => {
            if !ctx.cli.quiet {
                println!(
                    "Judged {} rows with {} -> {}",
                    table.len(),
                    config.judge.model,
                    args.output.display()
                );
                print_failure_counts(&summary);
            }
        }
    )
}

/// Apply command-line overrides on top of the loaded configuration
fn with_overrides(config: &CifeConfig, args: &JudgeArgs) -> Result<CifeConfig> {
    let mut config = config.clone();
    if let Some(model) = &args.model {
        config.judge.model = model.clone();
    }
    if let Some(base_url) = &args.base_url {
        config.judge.base_url = Some(base_url.clone());
    }
    if let Some(provider) = args.provider {
        config.judge.provider = provider;
    }
    if let Some(concurrency) = args.concurrency {
        config.judge.concurrency = concurrency;
    }
    if let Some(rpm) = args.requests_per_minute {
        config.judge.requests_per_minute = rpm;
    }
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cife_core::config::Provider;
    use std::path::PathBuf;

    fn base_args() -> JudgeArgs {
        JudgeArgs {
            input: PathBuf::from("in.jsonl"),
            output: PathBuf::from("out.jsonl"),
            model: None,
            base_url: None,
            provider: None,
            concurrency: None,
            requests_per_minute: None,
        }
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let args = JudgeArgs {
            model: Some("judge-large".to_string()),
            base_url: Some("http://localhost:8000/v1".to_string()),
            provider: Some(Provider::OpenaiCompatible),
            concurrency: Some(4),
            ..base_args()
        };
        let config = with_overrides(&CifeConfig::default(), &args).unwrap();
        assert_eq!(config.judge.model, "judge-large");
        assert_eq!(config.judge.provider, Provider::OpenaiCompatible);
        assert_eq!(config.judge.concurrency, 4);
    }

    #[test]
    fn test_overrides_are_validated() {
        let args = JudgeArgs {
            provider: Some(Provider::Azure),
            ..base_args()
        };
        assert!(with_overrides(&CifeConfig::default(), &args).is_err());
    }
}
