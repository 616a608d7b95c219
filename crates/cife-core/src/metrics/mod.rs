//! Aggregate constraint-satisfaction metrics over one result set
//!
//! Each row is first evaluated on its own: flags are read and coerced,
//! scored, and paired with the row's constraint records. Rows with no
//! signal or with unreadable flags are recorded in the [`FailureReport`]
//! and left out of every statistic; the rest are folded into a
//! [`MetricsAccumulator`].
//!
//! Two different SSR statistics are reported on purpose: `Overall_SSR` is
//! the mean of per-row fractions, while the `SSR_by_*` breakdowns pool
//! flags, so rows with more constraints weigh more.

mod accumulator;
mod report;
mod summary;


pub use accumulator::{Mean, MetricsAccumulator, Ratio, OVERALL_KEY};
pub use report::{FailureKind, FailureReport, FailureSummary, RowFailure};
pub use summary::{CorrectnessCsr, CorrectnessLevelPct, MetricsSummary};

use std::time::Instant;

use serde_json::Value;

use crate::config::ColumnConfig;
use crate::error::Result;
use crate::logging::truncate_for_log;
use crate::row::{
    pair_constraints, row_label, ConstraintRecord, CorrectnessLevel, RowMap, ScoredConstraint,
};
use crate::score::{coerce_flags, score, FlagError, RowScore};
use crate::table::{decode_embedded, Table};
use crate::trace_time;

/// Per-row columns added to the detailed output
pub const CSR_ROW_COLUMN: &str = "CSR_per_row";
pub const SSR_ROW_COLUMN: &str = "SSR_per_row";

/// A row that passed evaluation and takes part in the aggregates
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedRow {
    pub flags: Vec<bool>,
    pub score: RowScore,
    pub correctness: Option<CorrectnessLevel>,
    pub dataset: Option<String>,
    /// Constraint records paired with flags; `None` when misaligned
    pub constraints: Option<Vec<ScoredConstraint>>,
}

/// Summary plus the input rows annotated with their per-row scores
#[derive(Debug, Clone)]
pub struct MetricsReport {
    pub summary: MetricsSummary,
    pub rows: Vec<RowMap>,
    pub failures: FailureReport,
}

/// Evaluate every row of `table` and aggregate.
///
/// `columns.adherence` must exist in the table. Rows that fail are
/// annotated with null per-row scores.
#[tracing::instrument(skip(table, columns), fields(path = %table.path.display(), rows = table.len()))]
pub fn compute_metrics(table: &Table, columns: &ColumnConfig) -> Result<MetricsReport> {
    let start = Instant::now();
    table.require_column(&columns.adherence)?;

    let mut failures = FailureReport::new();
    let mut accumulator = MetricsAccumulator::new();
    let mut rows = Vec::with_capacity(table.len());

    for (index, row) in table.rows.iter().enumerate() {
        let mut annotated = row.clone();
        match evaluate_row(row, index, columns, &mut failures) {
            Some(evaluated) => {
                accumulator.add(&evaluated, &mut failures);
                annotated.insert(
                    columns.adherence.clone(),
                    Value::Array(evaluated.flags.iter().map(|&f| Value::from(u8::from(f))).collect()),
                );
                annotated.insert(
                    CSR_ROW_COLUMN.to_string(),
                    Value::from(evaluated.score.all_satisfied),
                );
                annotated.insert(
                    SSR_ROW_COLUMN.to_string(),
                    Value::from(evaluated.score.fraction_satisfied),
                );
            }
            None => {
                annotated.insert(CSR_ROW_COLUMN.to_string(), Value::Null);
                annotated.insert(SSR_ROW_COLUMN.to_string(), Value::Null);
            }
        }
        rows.push(annotated);
    }

    let filename = table
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let without_constraints = failures.count(FailureKind::MissingConstraints);
    if without_constraints > 0 {
        tracing::warn!(
            rows = without_constraints,
            column = %columns.constraints,
            "rows without a constraint list are left out of the category and origin breakdowns"
        );
    }
    let summary = accumulator.finish(filename, &failures);
    trace_time!(start, "compute_metrics", scored = summary.scored_rows);

    Ok(MetricsReport {
        summary,
        rows,
        failures,
    })
}

/// Evaluate one row; `None` means it is excluded from every aggregate
pub fn evaluate_row(
    row: &RowMap,
    index: usize,
    columns: &ColumnConfig,
    failures: &mut FailureReport,
) -> Option<EvaluatedRow> {
    let label = row_label(row, index, &columns.id);

    let flags = match read_flags(row.get(&columns.adherence)) {
        Ok(Some(flags)) => flags,
        Ok(None) => {
            let raw = row
                .get(&columns.adherence_response)
                .and_then(Value::as_str)
                .map(truncate_for_log)
                .unwrap_or_default();
            failures.record(
                label,
                FailureKind::Absent,
                format!("no adherence signal; judge text: {:?}", raw),
            );
            return None;
        }
        Err(e) => {
            failures.record(label, FailureKind::MalformedFlag, e.to_string());
            return None;
        }
    };

    let row_score = score(&flags);
    if row_score.is_vacuous() {
        failures.record(
            label.clone(),
            FailureKind::EmptyFlag,
            "empty flag list scored as all satisfied",
        );
    }

    let correctness = CorrectnessLevel::of(row, &columns.correctness);
    if correctness.is_none() {
        failures.record(
            label.clone(),
            FailureKind::MissingCorrectness,
            format!("no recognized `{}`", columns.correctness),
        );
    }

    let dataset = dataset_key(row.get(&columns.dataset));
    if dataset.is_none() {
        failures.record(
            label.clone(),
            FailureKind::MissingDataset,
            format!("no `{}`", columns.dataset),
        );
    }

    let constraints = match constraint_records(row, columns) {
        None => {
            failures.record(
                label,
                FailureKind::MissingConstraints,
                format!(
                    "no `{}` or `{}` list",
                    columns.scored_constraints, columns.constraints
                ),
            );
            None
        }
        Some(records) => match pair_constraints(&records, &flags) {
            Ok(paired) => Some(paired),
            Err(mismatch) => {
                failures.record(label, FailureKind::Misaligned, mismatch.to_string());
                None
            }
        },
    };

    Some(EvaluatedRow {
        flags,
        score: row_score,
        correctness,
        dataset,
        constraints,
    })
}

/// Read an adherence cell. `Ok(None)` is absent: a missing cell or null.
fn read_flags(cell: Option<&Value>) -> std::result::Result<Option<Vec<bool>>, FlagError> {
    let value = match cell {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => decode_embedded(value),
    };
    match value {
        Value::Array(items) => coerce_flags(&items).map(Some),
        other => Err(FlagError::NotAList {
            value: truncate_for_log(&other.to_string()),
        }),
    }
}

/// Dataset group key. The all-rows key is reserved, so a dataset that uses
/// it is renamed.
fn dataset_key(cell: Option<&Value>) -> Option<String> {
    let key = match cell? {
        Value::Null => return None,
        Value::String(s) if s.trim().is_empty() => return None,
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if key == OVERALL_KEY {
        tracing::warn!(dataset = %key, "dataset name collides with the all-rows key; renamed");
        return Some(format!("{}#dataset", key));
    }
    Some(key)
}

/// Constraint records of a row: the scored column when present, else the
/// constraints column. `None` when neither holds a list.
fn constraint_records(row: &RowMap, columns: &ColumnConfig) -> Option<Vec<ConstraintRecord>> {
    let cell = row
        .get(&columns.scored_constraints)
        .filter(|v| !v.is_null())
        .or_else(|| row.get(&columns.constraints));

    match cell.map(decode_embedded) {
        Some(Value::Array(items)) => {
            Some(items.iter().map(ConstraintRecord::from_value).collect())
        }
        _ => None,
    }
}
