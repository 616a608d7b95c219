//! LLM-as-judge calls for constraint adherence and functional correctness.
//!
//! The client is a seam: [`JudgeClient`] is implemented by [`OpenAiJudge`]
//! for real runs and by in-memory fakes in tests. Provider selection comes
//! from [`crate::config::JudgeConfig`], never from process-wide state.

pub mod client;
pub mod prompts;
pub mod stage;

pub use client::{CompletionRequest, JudgeClient, OpenAiJudge, RateLimiter};
pub use prompts::PromptTemplates;
pub use stage::{apply_extraction, run_judge};

#[cfg(test)]
mod tests;
