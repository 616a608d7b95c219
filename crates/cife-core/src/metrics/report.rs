//! Per-row failure bookkeeping
//!
//! Rows that cannot be scored, or cannot join a breakdown, are recorded here
//! instead of aborting the run. Every entry names the row and what was wrong
//! with it so the row can be inspected by hand.

use std::fmt;

use serde::Serialize;

/// Why a row was excluded from some or all aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No judge signal; excluded from every aggregate
    Absent,
    /// A flag that could not be coerced; excluded from every aggregate
    MalformedFlag,
    /// Constraints and flags differ in length; excluded from the category
    /// and origin breakdowns only
    Misaligned,
    /// No constraint list to pair with the flags; excluded from the category
    /// and origin breakdowns only
    MissingConstraints,
    /// No dataset; excluded from the per-dataset breakdowns
    MissingDataset,
    /// No recognized correctness level; in no level group
    MissingCorrectness,
    /// Scored from an empty flag list: `all_satisfied` is vacuously 1
    EmptyFlag,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Absent => "absent",
            FailureKind::MalformedFlag => "malformed_flag",
            FailureKind::Misaligned => "misaligned",
            FailureKind::MissingConstraints => "missing_constraints",
            FailureKind::MissingDataset => "missing_dataset",
            FailureKind::MissingCorrectness => "missing_correctness",
            FailureKind::EmptyFlag => "empty_flag",
        }
    }

    /// Whether the row is dropped from every aggregate
    pub fn excludes_row(&self) -> bool {
        matches!(self, FailureKind::Absent | FailureKind::MalformedFlag)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    pub row: String,
    pub kind: FailureKind,
    pub detail: String,
}

/// All problems recorded during one pass over a table
#[derive(Debug, Clone, Default)]
pub struct FailureReport {
    entries: Vec<RowFailure>,
    missing_category: usize,
    missing_origin: usize,
}

impl FailureReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, row: impl Into<String>, kind: FailureKind, detail: impl Into<String>) {
        let failure = RowFailure {
            row: row.into(),
            kind,
            detail: detail.into(),
        };
        match kind {
            FailureKind::EmptyFlag => {
                tracing::info!(row = %failure.row, kind = %kind, "{}", failure.detail)
            }
            FailureKind::MissingConstraints => {
                tracing::debug!(row = %failure.row, kind = %kind, "{}", failure.detail)
            }
            _ => tracing::warn!(row = %failure.row, kind = %kind, "{}", failure.detail),
        }
        self.entries.push(failure);
    }

    /// A constraint record without a `type`; left out of the category breakdown
    pub fn note_missing_category(&mut self) {
        self.missing_category += 1;
    }

    /// A constraint record without an `instruction_part`; left out of the
    /// origin breakdown
    pub fn note_missing_origin(&mut self) {
        self.missing_origin += 1;
    }

    pub fn entries(&self) -> &[RowFailure] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.missing_category == 0 && self.missing_origin == 0
    }

    pub fn count(&self, kind: FailureKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    /// Labels of the rows recorded with `kind`, in record order
    pub fn rows(&self, kind: FailureKind) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.row.as_str())
            .collect()
    }

    /// Rows dropped from every aggregate
    pub fn excluded_rows(&self) -> usize {
        self.entries.iter().filter(|e| e.kind.excludes_row()).count()
    }

    pub fn summary(&self) -> FailureSummary {
        FailureSummary {
            excluded_rows: self.excluded_rows(),
            absent_rows: self.count(FailureKind::Absent),
            malformed_flag_rows: self.count(FailureKind::MalformedFlag),
            misaligned_rows: self.count(FailureKind::Misaligned),
            missing_constraints_rows: self.count(FailureKind::MissingConstraints),
            missing_dataset_rows: self.count(FailureKind::MissingDataset),
            missing_correctness_rows: self.count(FailureKind::MissingCorrectness),
            empty_flag_rows: self.count(FailureKind::EmptyFlag),
            missing_category_constraints: self.missing_category,
            missing_origin_constraints: self.missing_origin,
            entries: self.entries.clone(),
        }
    }
}

/// Serializable form of a [`FailureReport`], embedded in the summary line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureSummary {
    pub excluded_rows: usize,
    pub absent_rows: usize,
    pub malformed_flag_rows: usize,
    pub misaligned_rows: usize,
    pub missing_constraints_rows: usize,
    pub missing_dataset_rows: usize,
    pub missing_correctness_rows: usize,
    pub empty_flag_rows: usize,
    pub missing_category_constraints: usize,
    pub missing_origin_constraints: usize,
    pub entries: Vec<RowFailure>,
}
