//! Structured-response extraction from judge output
//!
//! Judge models are asked for JSON but answer with fenced blocks, stray
//! escaping, prose around the object, or JSON that does not parse at all.
//! [`Extractor`] runs an ordered chain of [`ExtractStrategy`] tiers over the
//! text and returns the first success:
//!
//! 1. `strict_json`: strict parse of the fence-stripped text
//! 2. `quote_repair`: strict parse after collapsing escaped quotes
//! 3. `enclosing_object`: greedy `{...}` match, repaired and parsed
//! 4. `enclosing_list`: greedy `[{...}]` match, repaired and parsed
//! 5. `aligns_markers`: scan for `"aligns": true|false` markers
//!
//! When every tier fails the result is absent (`None`). Absent input (no
//! judge text at all) is absent output without running any tier.

mod correctness;
mod judgment;
mod strategy;

pub use correctness::extract_correctness;
pub use judgment::{interpret_adherence, AdherenceOutcome, ConstraintEvaluation, FlagSource};
pub use strategy::{
    repair_quotes, strip_fence, AlignsMarkers, EnclosingList, EnclosingObject, ExtractStrategy,
    QuoteRepair, StrictJson,
};

use serde_json::Value;

/// What a successful tier produced
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// A parsed JSON object or list
    Structured(Value),
    /// Bare flags recovered by the marker scan, in textual order
    Flags(Vec<bool>),
}

/// A successful extraction and the tier that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub strategy: &'static str,
    pub extraction: Extraction,
}

/// Ordered chain of extraction tiers
pub struct Extractor {
    strategies: Vec<Box<dyn ExtractStrategy>>,
}

impl Default for Extractor {
    fn default() -> Self {
        Extractor {
            strategies: vec![
                Box::new(StrictJson),
                Box::new(QuoteRepair),
                Box::new(EnclosingObject),
                Box::new(EnclosingList),
                Box::new(AlignsMarkers),
            ],
        }
    }
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a chain from explicit tiers, tried in the given order
    pub fn with_strategies(strategies: Vec<Box<dyn ExtractStrategy>>) -> Self {
        Extractor { strategies }
    }

    /// Names of the tiers in the order they are tried
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run the chain; `None` means absent
    pub fn extract(&self, raw: Option<&str>) -> Option<Extracted> {
        let raw = raw?;
        let text = strip_fence(raw);

        for strategy in &self.strategies {
            match strategy.attempt(text) {
                Some(extraction) => {
                    return Some(Extracted {
                        strategy: strategy.name(),
                        extraction,
                    })
                }
                None => tracing::debug!(strategy = strategy.name(), "extraction tier failed"),
            }
        }

        tracing::debug!("all extraction tiers failed");
        None
    }
}
