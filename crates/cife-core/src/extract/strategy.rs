//! Extraction tiers
//!
//! Every tier receives the fence-stripped judge text and either succeeds
//! with an [`Extraction`] or returns `None`. Tiers never panic and never
//! look at each other's results.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use super::Extraction;

/// One tier of the extraction chain
pub trait ExtractStrategy: Send + Sync {
    /// Stable identifier, used in logs and recorded with the result
    fn name(&self) -> &'static str;

    fn attempt(&self, text: &str) -> Option<Extraction>;
}

/// Strict JSON parse of the text as given
pub struct StrictJson;

/// Strict parse after [`repair_quotes`]
pub struct QuoteRepair;

/// Greedy `{...}` match (first `{` to last `}`), repaired and parsed
pub struct EnclosingObject;

/// Greedy `[{...}]` match, repaired and parsed
pub struct EnclosingList;

/// Left-to-right scan for `"aligns": true|false`, case-insensitive
pub struct AlignsMarkers;

static ESCAPED_VALUE_OPEN: OnceLock<Regex> = OnceLock::new();
static ESCAPED_QUOTED: OnceLock<Regex> = OnceLock::new();
static ENCLOSING_OBJECT: OnceLock<Regex> = OnceLock::new();
static ENCLOSING_LIST: OnceLock<Regex> = OnceLock::new();
static ALIGNS_MARKER: OnceLock<Regex> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("Invalid extraction regex pattern"))
}

/// Remove a wrapping code fence.
///
/// Only a fence that both opens the text and closes it is removed; a
/// ```` ```json ```` opener is checked before the bare one. Fences in the
/// middle of the text are left alone.
pub fn strip_fence(raw: &str) -> &str {
    let text = raw.trim();
    text.strip_prefix("```json")
        .and_then(|rest| rest.strip_suffix("```"))
        .or_else(|| {
            text.strip_prefix("```")
                .and_then(|rest| rest.strip_suffix("```"))
        })
        .map(str::trim)
        .unwrap_or(text)
}

/// Collapse escaped quotes that wrap whole values.
///
/// `: \"` becomes `: "`, then every `\"...\"` pair (shortest match) becomes
/// `"..."`.
pub fn repair_quotes(text: &str) -> String {
    let open = compiled(&ESCAPED_VALUE_OPEN, r#":\s+\\""#);
    let quoted = compiled(&ESCAPED_QUOTED, r#"\\"(.*?)\\""#);
    let step = open.replace_all(text, r#": ""#);
    quoted.replace_all(&step, r#""${1}""#).into_owned()
}

/// Parse text as a JSON object or list; scalars do not count
fn parse_structured(text: &str) -> Option<Extraction> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) if value.is_object() || value.is_array() => Some(Extraction::Structured(value)),
        Ok(_) => None,
        Err(e) => {
            tracing::trace!(error = %e, "parse failed");
            None
        }
    }
}

impl ExtractStrategy for StrictJson {
    fn name(&self) -> &'static str {
        "strict_json"
    }

    fn attempt(&self, text: &str) -> Option<Extraction> {
        parse_structured(text)
    }
}

impl ExtractStrategy for QuoteRepair {
    fn name(&self) -> &'static str {
        "quote_repair"
    }

    fn attempt(&self, text: &str) -> Option<Extraction> {
        parse_structured(&repair_quotes(text))
    }
}

impl ExtractStrategy for EnclosingObject {
    fn name(&self) -> &'static str {
        "enclosing_object"
    }

    fn attempt(&self, text: &str) -> Option<Extraction> {
        let found = compiled(&ENCLOSING_OBJECT, r"(?s)\{.*\}").find(text)?;
        parse_structured(&repair_quotes(found.as_str()))
    }
}

impl ExtractStrategy for EnclosingList {
    fn name(&self) -> &'static str {
        "enclosing_list"
    }

    fn attempt(&self, text: &str) -> Option<Extraction> {
        let found = compiled(&ENCLOSING_LIST, r"(?s)\[\{.*\}\]").find(text)?;
        parse_structured(&repair_quotes(found.as_str()))
    }
}

impl ExtractStrategy for AlignsMarkers {
    fn name(&self) -> &'static str {
        "aligns_markers"
    }

    /// Zero markers is a failure, so "no signal" never reaches scoring as an
    /// empty, vacuously satisfied flag list.
    fn attempt(&self, text: &str) -> Option<Extraction> {
        let flags: Vec<bool> = compiled(&ALIGNS_MARKER, r#"(?i)"aligns"\s*:\s*(true|false)"#)
            .captures_iter(text)
            .map(|caps| caps[1].eq_ignore_ascii_case("true"))
            .collect();

        if flags.is_empty() {
            None
        } else {
            Some(Extraction::Flags(flags))
        }
    }
}
