//! Streaming accumulation of the aggregate statistics
//!
//! One [`MetricsAccumulator::add`] call per scored row, then a single
//! [`MetricsAccumulator::finish`]. Every ratio with an empty denominator is 0.

use std::collections::BTreeMap;

use chrono::Utc;

use super::report::FailureReport;
use super::summary::{CorrectnessCsr, CorrectnessLevelPct, MetricsSummary};
use super::EvaluatedRow;
use crate::row::CorrectnessLevel;

/// Key of the all-rows entry in the per-dataset CSR map
pub const OVERALL_KEY: &str = "__overall__";

/// Flag-weighted ratio: satisfied flags over all flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ratio {
    pub satisfied: usize,
    pub total: usize,
}

impl Ratio {
    pub fn add_flag(&mut self, flag: bool) {
        self.satisfied += usize::from(flag);
        self.total += 1;
    }

    pub fn value(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.satisfied as f64 / self.total as f64
        }
    }
}

/// Unweighted mean of per-row values
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Mean {
    pub sum: f64,
    pub count: usize,
}

impl Mean {
    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn value(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

#[derive(Debug, Clone, Default)]
struct LevelCounts {
    rows: usize,
    by_level: BTreeMap<CorrectnessLevel, usize>,
}

impl LevelCounts {
    fn add(&mut self, level: Option<CorrectnessLevel>) {
        self.rows += 1;
        if let Some(level) = level {
            *self.by_level.entry(level).or_default() += 1;
        }
    }

    fn percentages(&self) -> BTreeMap<String, f64> {
        CorrectnessLevel::ALL
            .iter()
            .map(|level| {
                let count = self.by_level.get(level).copied().unwrap_or(0);
                (level.label().to_string(), fraction(count, self.rows))
            })
            .collect()
    }
}

fn fraction(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Running state for every statistic in a [`MetricsSummary`]
#[derive(Debug, Clone, Default)]
pub struct MetricsAccumulator {
    csr: Mean,
    ssr: Mean,
    csr1_by_level: BTreeMap<CorrectnessLevel, usize>,
    levels: LevelCounts,
    ssr_by_dataset: BTreeMap<String, Ratio>,
    csr_by_dataset: BTreeMap<String, Mean>,
    levels_by_dataset: BTreeMap<String, LevelCounts>,
    ssr_by_category: BTreeMap<String, Ratio>,
    ssr_by_part: BTreeMap<String, Ratio>,
}

impl MetricsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows added so far
    pub fn rows(&self) -> usize {
        self.csr.count
    }

    pub fn add(&mut self, row: &EvaluatedRow, failures: &mut FailureReport) {
        let score = row.score;
        self.csr.add(f64::from(score.all_satisfied));
        self.ssr.add(score.fraction_satisfied);
        self.levels.add(row.correctness);

        if let Some(level) = row.correctness {
            if score.all_satisfied == 1 {
                *self.csr1_by_level.entry(level).or_default() += 1;
            }
        }

        if let Some(dataset) = &row.dataset {
            let ratio = self.ssr_by_dataset.entry(dataset.clone()).or_default();
            for &flag in &row.flags {
                ratio.add_flag(flag);
            }
            self.csr_by_dataset
                .entry(dataset.clone())
                .or_default()
                .add(f64::from(score.all_satisfied));
            self.levels_by_dataset
                .entry(dataset.clone())
                .or_default()
                .add(row.correctness);
        }

        if let Some(constraints) = &row.constraints {
            for scored in constraints {
                match &scored.constraint.category {
                    Some(category) => self
                        .ssr_by_category
                        .entry(category.clone())
                        .or_default()
                        .add_flag(scored.aligns),
                    None => failures.note_missing_category(),
                }
                match &scored.constraint.instruction_part {
                    Some(part) => self
                        .ssr_by_part
                        .entry(part.clone())
                        .or_default()
                        .add_flag(scored.aligns),
                    None => failures.note_missing_origin(),
                }
            }
        }
    }

    pub fn finish(self, filename: impl Into<String>, failures: &FailureReport) -> MetricsSummary {
        let total = self.rows();
        let csr1 = |level: CorrectnessLevel| self.csr1_by_level.get(&level).copied().unwrap_or(0);
        let completely = csr1(CorrectnessLevel::CompletelyCorrect);
        let partially = csr1(CorrectnessLevel::PartiallyCorrect);
        let wrong = csr1(CorrectnessLevel::Wrong);

        let correctness_csr = CorrectnessCsr {
            completely_correct_count: completely,
            completely_correct_pct: fraction(completely, total),
            partially_correct_count: partially,
            partially_correct_pct: fraction(partially, total),
            wrong_count: wrong,
            wrong_pct: fraction(wrong, total),
            at_least_partially_correct_count: completely + partially,
            at_least_partially_correct_pct: fraction(completely + partially, total),
        };

        let mut csr_by_dataset: BTreeMap<String, f64> = self
            .csr_by_dataset
            .iter()
            .map(|(dataset, mean)| (dataset.clone(), mean.value()))
            .collect();
        csr_by_dataset.insert(OVERALL_KEY.to_string(), self.csr.value());

        MetricsSummary {
            filename: filename.into(),
            generated_at: Utc::now(),
            overall_csr: self.csr.value(),
            overall_ssr: self.ssr.value(),
            correctness_csr,
            ssr_by_dataset: ratios(&self.ssr_by_dataset),
            ssr_by_category: ratios(&self.ssr_by_category),
            ssr_by_instruction_part: ratios(&self.ssr_by_part),
            csr_by_dataset,
            correctness_level_pct: CorrectnessLevelPct {
                overall: self.levels.percentages(),
                per_dataset: self
                    .levels_by_dataset
                    .iter()
                    .map(|(dataset, counts)| (dataset.clone(), counts.percentages()))
                    .collect(),
            },
            scored_rows: total,
            row_failures: failures.summary(),
        }
    }
}

fn ratios(groups: &BTreeMap<String, Ratio>) -> BTreeMap<String, f64> {
    groups
        .iter()
        .map(|(key, ratio)| (key.clone(), ratio.value()))
        .collect()
}
