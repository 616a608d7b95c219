use std::sync::OnceLock;

use regex::Regex;

use crate::row::CorrectnessLevel;

static CORRECTNESS_MARKER: OnceLock<Regex> = OnceLock::new();

/// Read the correctness verdict from functional-correctness judge output.
///
/// Returns the first `"correctness": "<label>"` pair whose label is one of
/// the fixed levels, matched case-insensitively and normalized to the
/// canonical spelling. Absent input stays absent.
pub fn extract_correctness(raw: Option<&str>) -> Option<CorrectnessLevel> {
    let raw = raw?;
    let pattern = CORRECTNESS_MARKER.get_or_init(|| {
        Regex::new(r#"(?i)"correctness"\s*:\s*"(Completely Correct|Partially Correct|Wrong)""#)
            .expect("Invalid correctness regex pattern")
    });

    let level = pattern
        .captures(raw)
        .and_then(|caps| caps[1].parse::<CorrectnessLevel>().ok());
    if level.is_none() {
        tracing::debug!("no correctness label found");
    }
    level
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_correctness_first_match_wins() {
        let raw = r#"{"reason": "ok", "correctness": "partially correct"} {"correctness": "Wrong"}"#;
        assert_eq!(
            extract_correctness(Some(raw)),
            Some(CorrectnessLevel::PartiallyCorrect)
        );
    }

    #[test]
    fn test_extract_correctness_from_fenced_text() {
        let raw = "```json\n{\"reason\": \"fine\",\n  \"Correctness\" : \"Completely Correct\"}\n```";
        assert_eq!(
            extract_correctness(Some(raw)),
            Some(CorrectnessLevel::CompletelyCorrect)
        );
    }

    #[test]
    fn test_extract_correctness_unknown_or_absent() {
        assert_eq!(extract_correctness(None), None);
        assert_eq!(
            extract_correctness(Some(r#"{"correctness": "Mostly Correct"}"#)),
            None
        );
    }
}
