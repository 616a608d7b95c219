//! Row-level domain types
//!
//! A row is carried as a JSON object so that columns the pipeline does not
//! interpret (instruction text, model response, provenance) pass through
//! untouched. The typed views here pull out the fields the metrics care about.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CifeError;

/// One table row, in column order
pub type RowMap = Map<String, Value>;

/// Stable cross-run identifier of a row, rendered to text for joining.
///
/// String ids are used verbatim; any other JSON scalar uses its JSON text,
/// so `7` and `"7"` join as the same key. CSV cells are always text, so this
/// lets a CSV table join a JSONL table with numeric ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId(String);

impl RowId {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(RowId(s.clone())),
            other => Some(RowId(other.to_string())),
        }
    }

    /// Read the id column of a row
    pub fn of(row: &RowMap, id_column: &str) -> Option<Self> {
        row.get(id_column).and_then(Self::from_value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Label used in diagnostics: the row id, or its position when the id is missing
pub fn row_label(row: &RowMap, index: usize, id_column: &str) -> String {
    RowId::of(row, id_column)
        .map(|id| id.to_string())
        .unwrap_or_else(|| format!("#{}", index))
}

/// Functional correctness verdict from the correctness judge.
///
/// The order of [`CorrectnessLevel::ALL`] is the order used for every
/// grouped statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CorrectnessLevel {
    #[serde(rename = "Completely Correct")]
    CompletelyCorrect,
    #[serde(rename = "Partially Correct")]
    PartiallyCorrect,
    #[serde(rename = "Wrong")]
    Wrong,
}

impl CorrectnessLevel {
    pub const ALL: [CorrectnessLevel; 3] = [
        CorrectnessLevel::CompletelyCorrect,
        CorrectnessLevel::PartiallyCorrect,
        CorrectnessLevel::Wrong,
    ];

    /// Canonical label as written by the judge
    pub fn label(&self) -> &'static str {
        match self {
            CorrectnessLevel::CompletelyCorrect => "Completely Correct",
            CorrectnessLevel::PartiallyCorrect => "Partially Correct",
            CorrectnessLevel::Wrong => "Wrong",
        }
    }

    /// Read the correctness column of a row; unknown labels count as missing
    pub fn of(row: &RowMap, column: &str) -> Option<Self> {
        row.get(column)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }
}

impl FromStr for CorrectnessLevel {
    type Err = CifeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        CorrectnessLevel::ALL
            .into_iter()
            .find(|level| level.label().to_lowercase() == normalized)
            .ok_or_else(|| CifeError::invalid_value("correctness level", s))
    }
}

impl fmt::Display for CorrectnessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The fields of a constraint record the metrics read. Other fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintRecord {
    pub text: Option<String>,
    /// Constraint category (`type` field)
    pub category: Option<String>,
    /// Origin tag (`instruction_part` field), e.g. "Extracted from instruction"
    pub instruction_part: Option<String>,
}

impl ConstraintRecord {
    /// Build from a JSON value; a bare string is a constraint with text only
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => ConstraintRecord {
                text: Some(s.clone()),
                ..Default::default()
            },
            Value::Object(map) => ConstraintRecord {
                text: string_field(map, &["constraint", "text", "Constraint"]),
                category: string_field(map, &["type"]),
                instruction_part: string_field(map, &["instruction_part"]),
            },
            _ => ConstraintRecord::default(),
        }
    }

    /// Text shown to the judge for this constraint
    pub fn prompt_text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

fn string_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| map.get(*k))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// A constraint with its adherence flag attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredConstraint {
    pub constraint: ConstraintRecord,
    pub aligns: bool,
}

/// Constraints and flags that cannot be paired position by position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Misalignment {
    pub constraints: usize,
    pub flags: usize,
}

impl fmt::Display for Misalignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} constraint records but {} adherence flags",
            self.constraints, self.flags
        )
    }
}

/// Attach each flag to the constraint at the same position.
///
/// Lengths must match exactly; the shorter side is never truncated.
pub fn pair_constraints(
    constraints: &[ConstraintRecord],
    flags: &[bool],
) -> Result<Vec<ScoredConstraint>, Misalignment> {
    if constraints.len() != flags.len() {
        return Err(Misalignment {
            constraints: constraints.len(),
            flags: flags.len(),
        });
    }
    Ok(constraints
        .iter()
        .zip(flags)
        .map(|(constraint, &aligns)| ScoredConstraint {
            constraint: constraint.clone(),
            aligns,
        })
        .collect())
}
