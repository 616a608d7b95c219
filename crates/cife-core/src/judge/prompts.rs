//! Judge prompt templates
//!
//! Templates are plain text with `{instruction}`, `{constraints}` and
//! `{response}` placeholders. Any other brace pair is copied literally, so
//! templates can show the judge a JSON example.

use serde_json::Value;

use crate::config::PromptConfig;
use crate::row::ConstraintRecord;

pub const ADHERENCE_SYSTEM_PROMPT: &str = r#"You are a verifier. Your task is to evaluate whether a given response satisfies a set of constraints for a specific instruction.

You will be provided:
- An instruction
- A list of constraints
- A response to the instruction

Your task:
- Analyze the response against each constraint independently.
- For each constraint, determine whether it is strictly and completely satisfied.
- If any part of a constraint is only partially fulfilled or ambiguous, mark it as not satisfied.
- Provide a brief but clear explanation of your judgment for each constraint.
- Do not make assumptions beyond the constraint. Only base your judgment on what is explicitly implemented or stated in the response.

Output your evaluation in a valid JSON format like below:
{
"Evaluation": [
    {
    "Constraint": "<constraint text>",
    "Reason": "explanation",
    "Aligns": [true|false]
    },
    ...
]
}

Do not include any text outside this JSON object."#;

pub const ADHERENCE_TEMPLATE: &str = r#"[Instruction]:
{instruction}

[Constraints]:
{constraints}

[Response]:
```python
{response}
```"#;

pub const CORRECTNESS_TEMPLATE: &str = r#"You are an expert Python developer and uncompromising code reviewer.
Your task is to evaluate whether the provided Python code strictly and robustly follows the instruction, based only on three dimensions:

1. Syntax Correctness:
- The code must parse and compile without any syntax errors.

2. Semantic Correctness:
- The code must run and produce the intended effect exactly as described.
- Any hidden bugs or logical mistakes count as failures.

3. Constraint Correctness:
- The code must satisfy every constraint explicitly stated in the instruction, including any edge-case, privacy, or consistency requirements.
- If the instruction implies or adds new requirements (e.g. key ordering, redaction of sensitive data), those must be met exactly.

Review principles:
- Be conservative. Only label "Completely Correct" if you are certain that all dimensions are fully satisfied.
- If syntax or runtime errors exist, mark as "Wrong".
- If the code runs but omits or mis-implements any single required constraint, mark as "Partially Correct" at best.
- Extra functionality that interferes with, overrides, or exposes data beyond the instruction is a constraint violation.

Evaluation labels:
- "Completely Correct": perfect in syntax, semantics, and constraint adherence.
- "Partially Correct": runs without errors but misses or mis-implements one or more explicit requirements.
- "Wrong": contains syntax/runtime errors or fails to implement the core instruction at all.

If you have any doubt about full compliance, choose the lower category.

Output format:
Return your final evaluation as JSON without any explanation:
{"reason": "<Your reason for the evaluation>",
  "correctness": "Completely Correct/Partially Correct/Wrong"
}

Input:
Instruction:
{instruction}

Generated Code:
```python
{response}
```"#;

/// Resolved templates, defaults overridden by configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplates {
    pub adherence_system: String,
    pub adherence: String,
    pub correctness: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self::from_config(&PromptConfig::default())
    }
}

impl PromptTemplates {
    pub fn from_config(config: &PromptConfig) -> Self {
        PromptTemplates {
            adherence_system: config
                .adherence_system
                .clone()
                .unwrap_or_else(|| ADHERENCE_SYSTEM_PROMPT.to_string()),
            adherence: config
                .adherence_template
                .clone()
                .unwrap_or_else(|| ADHERENCE_TEMPLATE.to_string()),
            correctness: config
                .correctness_template
                .clone()
                .unwrap_or_else(|| CORRECTNESS_TEMPLATE.to_string()),
        }
    }

    /// Constraints are shown as a JSON list of their texts, in row order
    pub fn adherence_prompt(
        &self,
        instruction: &str,
        constraints: &[ConstraintRecord],
        response: &str,
    ) -> String {
        let listed = Value::Array(
            constraints
                .iter()
                .map(|c| Value::from(c.prompt_text()))
                .collect(),
        )
        .to_string();
        render(&self.adherence, instruction, &listed, response)
    }

    pub fn correctness_prompt(&self, instruction: &str, response: &str) -> String {
        render(&self.correctness, instruction, "", response)
    }
}

/// Single-pass placeholder substitution; substituted text is never rescanned
fn render(template: &str, instruction: &str, constraints: &str, response: &str) -> String {
    let mut out = String::with_capacity(template.len() + instruction.len() + response.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open..];
        let replacement = after.find('}').and_then(|close| {
            let value = match &after[1..close] {
                "instruction" => instruction,
                "constraints" => constraints,
                "response" => response,
                _ => return None,
            };
            Some((value, close + 1))
        });
        match replacement {
            Some((value, consumed)) => {
                out.push_str(value);
                rest = &after[consumed..];
            }
            None => {
                out.push('{');
                rest = &after[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
