//! The judge stage and its offline counterpart
//!
//! [`run_judge`] sends every row to the adherence judge and then the
//! correctness judge, stores the raw text, and derives the structured
//! columns. [`apply_extraction`] derives the same columns from raw text
//! already stored in a table, without any network access.

use std::time::Instant;

use serde_json::{Map, Value};

use super::client::{CompletionRequest, JudgeClient};
use super::prompts::PromptTemplates;
use crate::config::{ColumnConfig, JudgeConfig};
use crate::error::Result;
use crate::extract::{extract_correctness, interpret_adherence, AdherenceOutcome, Extractor};
use crate::logging::truncate_for_log;
use crate::metrics::{FailureKind, FailureReport};
use crate::row::{row_label, ConstraintRecord, CorrectnessLevel, Misalignment, RowMap};
use crate::table::decode_embedded;
use crate::trace_time;

/// Judge every row in place.
///
/// Rows without a response get no prompt and end up absent.
pub async fn run_judge(
    client: &dyn JudgeClient,
    rows: &mut [RowMap],
    config: &JudgeConfig,
    templates: &PromptTemplates,
    columns: &ColumnConfig,
) -> Result<FailureReport> {
    let start = Instant::now();

    let prompts: Vec<Option<String>> = rows
        .iter()
        .map(|row| {
            let response = text_cell(row, &columns.response)?;
            let instruction = text_cell(row, &columns.instruction).unwrap_or_default();
            let constraints = constraint_values(row, &columns.constraints).unwrap_or_default();
            let records: Vec<ConstraintRecord> =
                constraints.iter().map(ConstraintRecord::from_value).collect();
            Some(templates.adherence_prompt(&instruction, &records, &response))
        })
        .collect();
    let request = CompletionRequest {
        system_prompt: Some(templates.adherence_system.clone()),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };
    let outputs = client.complete_batch(&prompts, &request).await;
    store_text(rows, &columns.adherence_response, outputs);
    trace_time!(start, "adherence_judge", rows = rows.len());

    let prompts: Vec<Option<String>> = rows
        .iter()
        .map(|row| {
            let response = text_cell(row, &columns.response)?;
            let instruction = text_cell(row, &columns.instruction).unwrap_or_default();
            Some(templates.correctness_prompt(&instruction, &response))
        })
        .collect();
    let request = CompletionRequest {
        system_prompt: None,
        temperature: config.correctness_temperature,
        max_tokens: config.correctness_max_tokens,
    };
    let outputs = client.complete_batch(&prompts, &request).await;
    store_text(rows, &columns.correctness_response, outputs);
    trace_time!(start, "correctness_judge", rows = rows.len());

    apply_extraction(rows, columns)
}

/// Derive the structured columns from stored judge text
pub fn apply_extraction(rows: &mut [RowMap], columns: &ColumnConfig) -> Result<FailureReport> {
    let extractor = Extractor::new();
    let mut failures = FailureReport::new();

    for (index, row) in rows.iter_mut().enumerate() {
        let label = row_label(row, index, &columns.id);
        let _span = tracing::debug_span!("row", id = %label).entered();
        apply_adherence(row, &label, &extractor, columns, &mut failures)?;
        apply_correctness(row, &label, columns, &mut failures);
    }

    Ok(failures)
}

fn apply_adherence(
    row: &mut RowMap,
    label: &str,
    extractor: &Extractor,
    columns: &ColumnConfig,
    failures: &mut FailureReport,
) -> Result<()> {
    let raw = text_cell(row, &columns.adherence_response);
    let extracted = extractor.extract(raw.as_deref());
    if let Some(extracted) = &extracted {
        tracing::debug!(strategy = extracted.strategy, "extracted adherence judgment");
    }

    let evaluations = match interpret_adherence(extracted, raw.as_deref()) {
        AdherenceOutcome::Evaluated { evaluations, .. } => evaluations,
        AdherenceOutcome::Absent => {
            failures.record(
                label,
                FailureKind::Absent,
                format!(
                    "no adherence judgment in {:?}",
                    truncate_for_log(raw.as_deref().unwrap_or_default())
                ),
            );
            clear(row, columns);
            return Ok(());
        }
        AdherenceOutcome::Malformed(e) => {
            failures.record(label, FailureKind::MalformedFlag, e.to_string());
            clear(row, columns);
            return Ok(());
        }
    };

    let flags: Vec<Value> = evaluations
        .iter()
        .map(|e| Value::from(u8::from(e.aligns)))
        .collect();
    row.insert(columns.adherence.clone(), Value::Array(flags));
    row.insert(columns.evaluations.clone(), serde_json::to_value(&evaluations)?);

    let Some(constraints) = constraint_values(row, &columns.constraints) else {
        failures.record(
            label,
            FailureKind::MissingConstraints,
            format!("no `{}` list", columns.constraints),
        );
        row.insert(columns.scored_constraints.clone(), Value::Null);
        return Ok(());
    };
    let scored = if constraints.len() == evaluations.len() {
        let paired = constraints
            .iter()
            .zip(&evaluations)
            .map(|(constraint, evaluation)| {
                let mut record = match constraint {
                    Value::Object(map) => map.clone(),
                    other => {
                        let mut map = Map::new();
                        map.insert("constraint".to_string(), other.clone());
                        map
                    }
                };
                record.insert("aligns".to_string(), Value::Bool(evaluation.aligns));
                if let Some(reason) = &evaluation.reason {
                    record.insert("reason".to_string(), Value::from(reason.as_str()));
                }
                Value::Object(record)
            })
            .collect();
        Value::Array(paired)
    } else {
        failures.record(
            label,
            FailureKind::Misaligned,
            Misalignment {
                constraints: constraints.len(),
                flags: evaluations.len(),
            }
            .to_string(),
        );
        Value::Null
    };
    row.insert(columns.scored_constraints.clone(), scored);
    Ok(())
}

fn apply_correctness(
    row: &mut RowMap,
    label: &str,
    columns: &ColumnConfig,
    failures: &mut FailureReport,
) {
    let Some(raw) = text_cell(row, &columns.correctness_response) else {
        // no judge text: a stored label stands
        match CorrectnessLevel::of(row, &columns.correctness) {
            Some(level) => {
                row.insert(columns.correctness.clone(), Value::from(level.label()));
            }
            None => {
                failures.record(
                    label,
                    FailureKind::MissingCorrectness,
                    format!(
                        "no `{}` text and no stored `{}`",
                        columns.correctness_response, columns.correctness
                    ),
                );
                row.insert(columns.correctness.clone(), Value::Null);
            }
        }
        return;
    };

    let level = extract_correctness(Some(raw.as_str()));
    if level.is_none() {
        failures.record(
            label,
            FailureKind::MissingCorrectness,
            format!("no correctness label in {:?}", truncate_for_log(&raw)),
        );
    }
    row.insert(
        columns.correctness.clone(),
        level
            .map(|l| Value::from(l.label()))
            .unwrap_or(Value::Null),
    );
}

fn clear(row: &mut RowMap, columns: &ColumnConfig) {
    for column in [
        &columns.adherence,
        &columns.evaluations,
        &columns.scored_constraints,
    ] {
        row.insert(column.clone(), Value::Null);
    }
}

fn store_text(rows: &mut [RowMap], column: &str, outputs: Vec<Option<String>>) {
    for (row, text) in rows.iter_mut().zip(outputs) {
        row.insert(
            column.to_string(),
            text.map(Value::String).unwrap_or(Value::Null),
        );
    }
}

/// Non-empty string cell
fn text_cell(row: &RowMap, column: &str) -> Option<String> {
    row.get(column)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn constraint_values(row: &RowMap, column: &str) -> Option<Vec<Value>> {
    match row.get(column).map(decode_embedded) {
        Some(Value::Array(items)) => Some(items),
        _ => None,
    }
}
