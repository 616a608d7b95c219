//! Cross-model ranking and retained-subset filtering
//!
//! Every per-model result set scores the same rows. Rows are ranked by their
//! mean SSR across models (ties: more constraints first), the top K are
//! treated as solved and dropped, and the remaining ids are applied as a
//! filter to every result set.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::ColumnConfig;
use crate::error::{CifeError, Result};
use crate::row::{RowId, RowMap};
use crate::score::{coerce_flags, score};
use crate::table::{decode_embedded, list_tables, write_jsonl, Table};

pub const OVERALL_SSR_COLUMN: &str = "overall_ssr";
pub const NUM_CONSTRAINTS_COLUMN: &str = "num_constraints";

/// Column holding one model's per-row SSR in the ranking table
pub fn model_column(model: &str) -> String {
    format!("ssr_{}", model)
}

/// One row of the ranking table
#[derive(Debug, Clone, PartialEq)]
pub struct RankingEntry {
    pub id: RowId,
    /// Columns carried over from the base result set
    pub base: RowMap,
    /// Per-model SSR, in [`RankingTable::models`] order; `None` when the
    /// model has no usable score for this row
    pub scores: Vec<Option<f64>>,
    /// Mean of the present scores; `None` when no model scored the row
    pub overall_ssr: Option<f64>,
    pub num_constraints: usize,
}

/// Rows in rank order, hardest last
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankingTable {
    pub models: Vec<String>,
    pub entries: Vec<RankingEntry>,
}

impl RankingTable {
    /// Join per-model SSR onto the rows of the first table and rank.
    ///
    /// The first table fixes the row set and the constraint counts; an id
    /// missing from another table leaves that model's score empty.
    pub fn build(tables: &[Table], columns: &ColumnConfig) -> Result<Self> {
        let Some(base) = tables.first() else {
            return Err(CifeError::not_found("result tables", "no .jsonl files"));
        };
        for table in tables {
            table.require_column(&columns.id)?;
        }

        let models: Vec<String> = tables.iter().map(Table::stem).collect();
        let per_model: Vec<HashMap<RowId, Option<f64>>> = tables
            .iter()
            .map(|table| model_scores(table, columns))
            .collect();

        let mut entries = Vec::with_capacity(base.len());
        for (index, row) in base.rows.iter().enumerate() {
            let Some(id) = RowId::of(row, &columns.id) else {
                tracing::warn!(row = index, path = %base.path.display(), "row without id left out of ranking");
                continue;
            };

            let scores: Vec<Option<f64>> = per_model
                .iter()
                .map(|scores| scores.get(&id).copied().flatten())
                .collect();
            let present: Vec<f64> = scores.iter().flatten().copied().collect();
            let overall_ssr = if present.is_empty() {
                None
            } else {
                Some(present.iter().sum::<f64>() / present.len() as f64)
            };

            entries.push(RankingEntry {
                num_constraints: count_constraints(row.get(&columns.constraints)),
                base: carried_columns(row, columns),
                id,
                scores,
                overall_ssr,
            });
        }

        entries.sort_by(rank_order);
        tracing::debug!(models = models.len(), rows = entries.len(), "ranked");
        Ok(RankingTable { models, entries })
    }

    /// Ranking table rows: base columns, one `ssr_<model>` per model,
    /// `overall_ssr` and `num_constraints`
    pub fn to_rows(&self) -> Vec<RowMap> {
        self.entries
            .iter()
            .map(|entry| {
                let mut row = entry.base.clone();
                for (model, score) in self.models.iter().zip(&entry.scores) {
                    row.insert(model_column(model), optional_number(*score));
                }
                row.insert(
                    OVERALL_SSR_COLUMN.to_string(),
                    optional_number(entry.overall_ssr),
                );
                row.insert(
                    NUM_CONSTRAINTS_COLUMN.to_string(),
                    Value::from(entry.num_constraints),
                );
                row
            })
            .collect()
    }

    /// Ids left after dropping the top `drop_top` rows
    pub fn retained_ids(&self, drop_top: usize) -> HashSet<RowId> {
        self.entries
            .iter()
            .skip(drop_top)
            .map(|entry| entry.id.clone())
            .collect()
    }
}

/// Descending by overall SSR (unscored rows last), then descending by
/// constraint count. Used with a stable sort, so equal rows keep file order.
fn rank_order(a: &RankingEntry, b: &RankingEntry) -> Ordering {
    let by_score = match (a.overall_ssr, b.overall_ssr) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_score.then_with(|| b.num_constraints.cmp(&a.num_constraints))
}

fn optional_number(value: Option<f64>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

/// Per-row SSR of one result set, keyed by id. The first row wins when an id
/// repeats; a row with absent or unreadable flags has no score.
fn model_scores(table: &Table, columns: &ColumnConfig) -> HashMap<RowId, Option<f64>> {
    let mut scores = HashMap::with_capacity(table.len());
    for row in &table.rows {
        let Some(id) = RowId::of(row, &columns.id) else {
            continue;
        };
        let ssr = match row.get(&columns.adherence).map(decode_embedded) {
            Some(Value::Array(items)) => coerce_flags(&items)
                .map(|flags| score(&flags).fraction_satisfied)
                .ok(),
            _ => None,
        };
        if ssr.is_none() {
            tracing::debug!(id = %id, path = %table.path.display(), "no usable adherence flags");
        }
        scores.entry(id).or_insert(ssr);
    }
    scores
}

fn count_constraints(cell: Option<&Value>) -> usize {
    match cell.map(decode_embedded) {
        Some(Value::Array(items)) => items.len(),
        _ => 0,
    }
}

/// Base columns without the per-model judge output
fn carried_columns(row: &RowMap, columns: &ColumnConfig) -> RowMap {
    let dropped = [
        &columns.response,
        &columns.adherence,
        &columns.adherence_response,
        &columns.evaluations,
        &columns.scored_constraints,
        &columns.correctness,
        &columns.correctness_response,
    ];
    row.iter()
        .filter(|(key, _)| !dropped.contains(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Read every `.jsonl` file in `dir` (sorted) and rank
pub fn rank_dir(dir: &Path, columns: &ColumnConfig) -> Result<RankingTable> {
    let tables = list_tables(dir)?
        .iter()
        .map(|path| Table::read(path))
        .collect::<Result<Vec<_>>>()?;
    RankingTable::build(&tables, columns)
}

/// Ids left after dropping the first `drop_top` rows of a saved ranking table
pub fn retained_ids_from_ranked(rows: &[RowMap], id_column: &str, drop_top: usize) -> HashSet<RowId> {
    rows.iter()
        .skip(drop_top)
        .filter_map(|row| RowId::of(row, id_column))
        .collect()
}

/// Keep the rows whose id is retained, in their original order
pub fn filter_rows(rows: &[RowMap], retained: &HashSet<RowId>, id_column: &str) -> Vec<RowMap> {
    rows.iter()
        .filter(|row| RowId::of(row, id_column).is_some_and(|id| retained.contains(&id)))
        .cloned()
        .collect()
}

/// Row counts of one filtered file
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FilterReport {
    pub file: PathBuf,
    pub output: PathBuf,
    pub before: usize,
    pub after: usize,
}

/// Filter every `.jsonl` file in `input_dir` into `output_dir` under the
/// same file name
pub fn filter_dir(
    input_dir: &Path,
    output_dir: &Path,
    retained: &HashSet<RowId>,
    id_column: &str,
) -> Result<Vec<FilterReport>> {
    let mut reports = Vec::new();
    for path in list_tables(input_dir)? {
        let table = Table::read(&path)?;
        table.require_column(id_column)?;
        let kept = filter_rows(&table.rows, retained, id_column);

        let name = path
            .file_name()
            .ok_or_else(|| CifeError::invalid_value("table path", path.display()))?;
        let output = output_dir.join(name);
        write_jsonl(&output, &kept)?;

        tracing::info!(file = %path.display(), before = table.len(), after = kept.len(), "filtered");
        reports.push(FilterReport {
            file: path,
            output,
            before: table.len(),
            after: kept.len(),
        });
    }
    Ok(reports)
}
