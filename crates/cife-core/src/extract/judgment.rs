//! Interpretation of an extracted adherence judgment
//!
//! Turns whatever the extractor recovered into an ordered list of
//! per-constraint evaluations, or into one of the two per-row failure
//! outcomes: absent (no signal) or malformed (a flag that is not a flag).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{AlignsMarkers, ExtractStrategy, Extracted, Extraction};
use crate::score::{coerce_flag, FlagError};

/// One judge verdict, in the order the constraints were presented
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintEvaluation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub aligns: bool,
}

/// Where the flags of an evaluated row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagSource {
    /// A parsed evaluation list
    Structured,
    /// The `"aligns": ...` marker scan
    Markers,
}

/// Result of interpreting one row's adherence judgment
#[derive(Debug, Clone, PartialEq)]
pub enum AdherenceOutcome {
    Evaluated {
        evaluations: Vec<ConstraintEvaluation>,
        source: FlagSource,
    },
    Absent,
    Malformed(FlagError),
}

impl AdherenceOutcome {
    /// Flags in evaluation order; `None` unless evaluated
    pub fn flags(&self) -> Option<Vec<bool>> {
        match self {
            AdherenceOutcome::Evaluated { evaluations, .. } => {
                Some(evaluations.iter().map(|e| e.aligns).collect())
            }
            AdherenceOutcome::Absent | AdherenceOutcome::Malformed(_) => None,
        }
    }
}

/// Interpret an extraction result.
///
/// A structured value is read as either an object holding an evaluation
/// list (key `Evaluation`, `evaluations` or `constraint_evaluations`, any
/// case) or a top-level list of evaluations. A structured value without
/// such a list carries no signal, so the marker scan is tried on the raw
/// text before declaring the row absent. An explicit list, even an empty
/// one, is taken as given.
pub fn interpret_adherence(extracted: Option<Extracted>, raw: Option<&str>) -> AdherenceOutcome {
    let Some(extracted) = extracted else {
        return AdherenceOutcome::Absent;
    };

    match extracted.extraction {
        Extraction::Flags(flags) => from_flags(flags),
        Extraction::Structured(value) => match evaluation_items(&value) {
            Ok(Some(items)) => match read_evaluations(items) {
                Ok(evaluations) => AdherenceOutcome::Evaluated {
                    evaluations,
                    source: FlagSource::Structured,
                },
                Err(e) => AdherenceOutcome::Malformed(e),
            },
            Ok(None) => {
                tracing::debug!("structured judgment has no evaluation list");
                match raw.and_then(|text| AlignsMarkers.attempt(text)) {
                    Some(Extraction::Flags(flags)) => from_flags(flags),
                    _ => AdherenceOutcome::Absent,
                }
            }
            Err(e) => AdherenceOutcome::Malformed(e),
        },
    }
}

fn from_flags(flags: Vec<bool>) -> AdherenceOutcome {
    AdherenceOutcome::Evaluated {
        evaluations: flags
            .into_iter()
            .map(|aligns| ConstraintEvaluation {
                constraint: None,
                reason: None,
                aligns,
            })
            .collect(),
        source: FlagSource::Markers,
    }
}

const EVALUATION_KEYS: [&str; 3] = ["evaluation", "evaluations", "constraint_evaluations"];

fn get_ignore_case<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| keys.iter().any(|key| k.eq_ignore_ascii_case(key)))
        .map(|(_, v)| v)
}

fn evaluation_items(value: &Value) -> Result<Option<&Vec<Value>>, FlagError> {
    match value {
        Value::Array(items) => Ok(Some(items)),
        Value::Object(map) => match get_ignore_case(map, &EVALUATION_KEYS) {
            Some(Value::Array(items)) => Ok(Some(items)),
            Some(other) => Err(FlagError::NotAList {
                value: other.to_string(),
            }),
            None => Ok(None),
        },
        _ => Ok(None),
    }
}

fn read_evaluations(items: &[Value]) -> Result<Vec<ConstraintEvaluation>, FlagError> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => {
                let aligns = get_ignore_case(map, &["aligns"])
                    .ok_or(FlagError::MissingAligns { index })?;
                Ok(ConstraintEvaluation {
                    constraint: text_field(map, "constraint"),
                    reason: text_field(map, "reason"),
                    aligns: coerce_flag(aligns, index)?,
                })
            }
            // a bare flag list
            other => Ok(ConstraintEvaluation {
                constraint: None,
                reason: None,
                aligns: coerce_flag(other, index)?,
            }),
        })
        .collect()
}

fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match get_ignore_case(map, &[key])? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
