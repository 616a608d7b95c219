//! Helper functions shared across commands

use serde::Serialize;

use cife_core::error::Result;
use cife_core::metrics::FailureSummary;

/// Print one pretty JSON document to stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the non-zero row failure counts, one per line
pub fn print_failure_counts(summary: &FailureSummary) {
    let counts = [
        ("absent (excluded)", summary.absent_rows),
        ("malformed flags (excluded)", summary.malformed_flag_rows),
        ("misaligned constraints", summary.misaligned_rows),
        ("no constraint list", summary.missing_constraints_rows),
        ("missing dataset", summary.missing_dataset_rows),
        ("missing correctness", summary.missing_correctness_rows),
        ("empty flag lists", summary.empty_flag_rows),
        ("constraints without category", summary.missing_category_constraints),
        ("constraints without origin", summary.missing_origin_constraints),
    ];
    for (label, count) in counts {
        if count > 0 {
            println!("  {}: {}", label, count);
        }
    }
}

/// Format a fraction in [0, 1] as a percentage
pub fn percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}
