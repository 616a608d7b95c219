//! Per-row constraint satisfaction scores
//!
//! Two scalars per row:
//! - `all_satisfied` (CSR): 1 iff every flag is set. An empty sequence is
//!   vacuously satisfied and scores 1.
//! - `fraction_satisfied` (SSR): satisfied flags over total flags, 0 for an
//!   empty sequence.
//!
//! The asymmetry on the empty sequence is kept for comparability with
//! previously published numbers. Callers that can tell "no signal" apart
//! from "zero constraints" must do so before scoring.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Scores of a single row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowScore {
    pub all_satisfied: u8,
    pub fraction_satisfied: f64,
    /// Number of flags the scores were computed from
    pub flag_count: usize,
    pub satisfied_count: usize,
}

impl RowScore {
    /// True when `all_satisfied` is 1 only because there were no flags
    pub fn is_vacuous(&self) -> bool {
        self.flag_count == 0
    }
}

/// A flag value that cannot be read as satisfied/unsatisfied
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlagError {
    #[error("flag at position {index} is not 0/1 or true/false: {value}")]
    Malformed { index: usize, value: String },

    #[error("adherence value is not a list: {value}")]
    NotAList { value: String },

    #[error("evaluation at position {index} has no `aligns` field")]
    MissingAligns { index: usize },
}

/// Score an already-coerced flag sequence
pub fn score(flags: &[bool]) -> RowScore {
    let satisfied = flags.iter().filter(|&&f| f).count();
    let fraction = if flags.is_empty() {
        0.0
    } else {
        satisfied as f64 / flags.len() as f64
    };

    RowScore {
        all_satisfied: u8::from(flags.iter().all(|&f| f)),
        fraction_satisfied: fraction,
        flag_count: flags.len(),
        satisfied_count: satisfied,
    }
}

/// Coerce raw JSON flag values, then score them
pub fn score_values(values: &[Value]) -> Result<RowScore, FlagError> {
    Ok(score(&coerce_flags(values)?))
}

/// Coerce every element of a flag sequence, failing on the first bad one
pub fn coerce_flags(values: &[Value]) -> Result<Vec<bool>, FlagError> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| coerce_flag(value, index))
        .collect()
}

/// Read one flag.
///
/// Accepts booleans, the integers 0 and 1, the strings "true"/"false"/"1"/"0"
/// in any case, and a single-element list of any of these (judges asked for
/// `"Aligns": [true|false]` sometimes answer literally).
pub fn coerce_flag(value: &Value, index: usize) -> Result<bool, FlagError> {
    let malformed = || FlagError::Malformed {
        index,
        value: value.to_string(),
    };

    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_f64() {
            Some(x) if x == 1.0 => Ok(true),
            Some(x) if x == 0.0 => Ok(false),
            _ => Err(malformed()),
        },
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(malformed()),
        },
        Value::Array(items) if items.len() == 1 => coerce_flag(&items[0], index),
        _ => Err(malformed()),
    }
}
