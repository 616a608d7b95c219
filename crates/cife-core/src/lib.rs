//! CIFE Core Library
//!
//! Judge-response extraction and constraint-satisfaction metrics for
//! code-instruction-following benchmarks: recovering per-constraint verdicts
//! from free-form judge text, scoring rows (CSR/SSR), aggregating by dataset,
//! category and instruction part, and ranking/filtering instances across
//! model result tables.

pub mod config;
pub mod error;
pub mod extract;
pub mod format;
pub mod judge;
pub mod logging;
pub mod metrics;
pub mod ranking;
pub mod row;
pub mod score;
pub mod table;
