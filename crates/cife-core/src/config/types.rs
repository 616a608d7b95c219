//! Configuration type definitions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CifeError;

/// Default OpenAI API root
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Top-level configuration (`cife.toml`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CifeConfig {
    #[serde(default)]
    pub judge: JudgeConfig,

    #[serde(default)]
    pub prompts: PromptConfig,

    #[serde(default)]
    pub columns: ColumnConfig,
}

/// Judge API flavor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    #[default]
    Openai,
    Azure,
    OpenaiCompatible,
}

impl Provider {
    pub const SUPPORTED: &'static str = "openai, azure, openai-compatible";

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Openai => "openai",
            Provider::Azure => "azure",
            Provider::OpenaiCompatible => "openai-compatible",
        }
    }
}

impl FromStr for Provider {
    type Err = CifeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::Openai),
            "azure" => Ok(Provider::Azure),
            "openai-compatible" | "openai_compatible" | "compatible" => {
                Ok(Provider::OpenaiCompatible)
            }
            other => crate::bail_unsupported!("provider", other, Provider::SUPPORTED),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Judge model connection and sampling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeConfig {
    #[serde(default)]
    pub provider: Provider,

    /// API root; defaults to the OpenAI endpoint. Required for azure and
    /// openai-compatible providers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Model name (azure: deployment name)
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Sampling temperature for the adherence judge
    #[serde(default)]
    pub temperature: f64,

    /// Sampling temperature for the correctness judge
    #[serde(default = "default_correctness_temperature")]
    pub correctness_temperature: f64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_correctness_max_tokens")]
    pub correctness_max_tokens: u32,

    /// Maximum requests in flight
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Request-rate ceiling; 0 disables it
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Azure `api-version` query parameter
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            base_url: None,
            model: default_model(),
            api_key_env: default_api_key_env(),
            temperature: 0.0,
            correctness_temperature: default_correctness_temperature(),
            max_tokens: default_max_tokens(),
            correctness_max_tokens: default_correctness_max_tokens(),
            concurrency: default_concurrency(),
            requests_per_minute: default_requests_per_minute(),
            timeout_secs: default_timeout_secs(),
            api_version: default_api_version(),
        }
    }
}

/// Prompt overrides. Templates use `{instruction}`, `{constraints}` and
/// `{response}` placeholders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adherence_system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adherence_template: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correctness_template: Option<String>,
}

/// Column names read and written by each stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub id: String,
    pub instruction: String,
    pub response: String,
    /// Constraint records presented to the judge
    pub constraints: String,
    pub dataset: String,
    pub correctness: String,
    /// Adherence flag list
    pub adherence: String,
    /// Raw adherence judge text
    pub adherence_response: String,
    /// Raw correctness judge text
    pub correctness_response: String,
    /// Judge evaluations as extracted
    pub evaluations: String,
    /// Constraint records with their flag attached
    pub scored_constraints: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            instruction: "combined_instruction".to_string(),
            response: "response".to_string(),
            constraints: "final_constraints".to_string(),
            dataset: "dataset".to_string(),
            correctness: "correctness_level".to_string(),
            adherence: "constraint_adherence".to_string(),
            adherence_response: "constraint_adherence_response".to_string(),
            correctness_response: "code_correctness_response".to_string(),
            evaluations: "constraint_evaluations".to_string(),
            scored_constraints: "scored_constraints".to_string(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_correctness_temperature() -> f64 {
    0.1
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_correctness_max_tokens() -> u32 {
    1024
}

fn default_concurrency() -> usize {
    16
}

fn default_requests_per_minute() -> u32 {
    1500
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_api_version() -> String {
    "2024-06-01".to_string()
}
