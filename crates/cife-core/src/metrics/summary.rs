use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::report::FailureSummary;

/// One summary line, appended to the summary file once per run
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub filename: String,
    pub generated_at: DateTime<Utc>,
    #[serde(rename = "Overall_CSR")]
    pub overall_csr: f64,
    #[serde(rename = "Overall_SSR")]
    pub overall_ssr: f64,
    #[serde(flatten)]
    pub correctness_csr: CorrectnessCsr,
    /// Flag-weighted, not a mean of per-row fractions
    #[serde(rename = "SSR_by_Dataset")]
    pub ssr_by_dataset: BTreeMap<String, f64>,
    #[serde(rename = "SSR_by_Category")]
    pub ssr_by_category: BTreeMap<String, f64>,
    #[serde(rename = "SSR_by_Instruction_Part")]
    pub ssr_by_instruction_part: BTreeMap<String, f64>,
    /// Includes the all-rows entry under `__overall__`
    #[serde(rename = "CSR_by_Dataset")]
    pub csr_by_dataset: BTreeMap<String, f64>,
    #[serde(rename = "Correctness_Level_Pct")]
    pub correctness_level_pct: CorrectnessLevelPct,
    #[serde(rename = "Scored_Rows")]
    pub scored_rows: usize,
    #[serde(rename = "Row_Failures")]
    pub row_failures: FailureSummary,
}

/// Rows with `all_satisfied == 1`, crossed with correctness level.
/// Percentages are over all scored rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectnessCsr {
    #[serde(rename = "Completely_Correct_CSR1_Count")]
    pub completely_correct_count: usize,
    #[serde(rename = "Completely_Correct_CSR1_Pct")]
    pub completely_correct_pct: f64,
    #[serde(rename = "Partially_Correct_CSR1_Count")]
    pub partially_correct_count: usize,
    #[serde(rename = "Partially_Correct_CSR1_Pct")]
    pub partially_correct_pct: f64,
    #[serde(rename = "Wrong_CSR1_Count")]
    pub wrong_count: usize,
    #[serde(rename = "Wrong_CSR1_Pct")]
    pub wrong_pct: f64,
    #[serde(rename = "At_Least_Partially_Correct_CSR1_Count")]
    pub at_least_partially_correct_count: usize,
    #[serde(rename = "At_Least_Partially_Correct_CSR1_Pct")]
    pub at_least_partially_correct_pct: f64,
}

/// Share of rows at each correctness level, overall and within each dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectnessLevelPct {
    pub overall: BTreeMap<String, f64>,
    pub per_dataset: BTreeMap<String, BTreeMap<String, f64>>,
}
