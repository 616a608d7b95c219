//! Chat-completions client for the judge model
//!
//! Calls run on a bounded worker pool with an evenly spaced request-rate
//! ceiling. Batch output always lines up with batch input: an absent prompt
//! and a failed call both come back as `None`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::config::{JudgeConfig, Provider, OPENAI_BASE_URL};
use crate::error::{CifeError, Result};
use crate::logging::truncate_for_log;

/// Sampling settings shared by every prompt of one batch
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Something that turns prompts into judge text
#[async_trait]
pub trait JudgeClient: Send + Sync {
    /// One completion, whitespace-trimmed
    async fn complete(&self, prompt: &str, request: &CompletionRequest) -> Result<String>;

    /// Order-preserving batch. `None` in gives `None` out; a failed call is
    /// logged and gives `None`.
    async fn complete_batch(
        &self,
        prompts: &[Option<String>],
        request: &CompletionRequest,
    ) -> Vec<Option<String>> {
        let mut out = Vec::with_capacity(prompts.len());
        for (index, prompt) in prompts.iter().enumerate() {
            let text = match prompt {
                Some(prompt) => match self.complete(prompt, request).await {
                    Ok(text) => Some(text),
                    Err(e) => {
                        tracing::warn!(index, error = %e, "judge call failed");
                        None
                    }
                },
                None => None,
            };
            out.push(text);
        }
        out
    }
}

/// Evenly spaced permits: at most one request start per interval
#[derive(Debug)]
pub struct RateLimiter {
    interval: Option<Duration>,
    next: Mutex<Instant>,
}

impl RateLimiter {
    /// `0` disables the limit
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let interval = (requests_per_minute > 0)
            .then(|| Duration::from_secs_f64(60.0 / f64::from(requests_per_minute)));
        RateLimiter {
            interval,
            next: Mutex::new(Instant::now()),
        }
    }

    pub async fn acquire(&self) {
        let Some(interval) = self.interval else {
            return;
        };
        let slot = {
            let mut next = self.next.lock().await;
            let slot = (*next).max(Instant::now());
            *next = slot + interval;
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}

#[derive(Debug, Clone)]
enum Auth {
    Bearer(String),
    ApiKeyHeader(String),
    None,
}

/// OpenAI-compatible chat-completions judge (OpenAI, Azure OpenAI, or any
/// server speaking the same protocol)
#[derive(Debug, Clone)]
pub struct OpenAiJudge {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    auth: Auth,
    workers: Arc<Semaphore>,
    limiter: Arc<RateLimiter>,
}

impl OpenAiJudge {
    /// Build from configuration, reading the API key from the environment
    /// variable the configuration names
    pub fn from_config(config: &JudgeConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).ok();
        if api_key.is_none() && config.provider != Provider::OpenaiCompatible {
            crate::bail_usage!(format!(
                "{} environment variable must be set for provider {}",
                config.api_key_env, config.provider
            ));
        }
        Self::new(config, api_key)
    }

    pub fn new(config: &JudgeConfig, api_key: Option<String>) -> Result<Self> {
        let base = config
            .base_url
            .as_deref()
            .unwrap_or(OPENAI_BASE_URL)
            .trim_end_matches('/');

        let endpoint = match config.provider {
            Provider::Azure => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                base, config.model, config.api_version
            ),
            Provider::Openai | Provider::OpenaiCompatible => format!("{}/chat/completions", base),
        };

        let auth = match (config.provider, api_key) {
            (Provider::Azure, Some(key)) => Auth::ApiKeyHeader(key),
            (_, Some(key)) => Auth::Bearer(key),
            (_, None) => Auth::None,
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(OpenAiJudge {
            http,
            endpoint,
            model: config.model.clone(),
            auth,
            workers: Arc::new(Semaphore::new(config.concurrency.max(1))),
            limiter: Arc::new(RateLimiter::per_minute(config.requests_per_minute)),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body(&self, prompt: &str, request: &CompletionRequest) -> Value {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system_prompt {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": prompt}));

        json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        })
    }
}

#[async_trait]
impl JudgeClient for OpenAiJudge {
    async fn complete(&self, prompt: &str, request: &CompletionRequest) -> Result<String> {
        self.limiter.acquire().await;

        let builder = self.http.post(&self.endpoint);
        let builder = match &self.auth {
            Auth::Bearer(key) => builder.header("Authorization", format!("Bearer {}", key)),
            Auth::ApiKeyHeader(key) => builder.header("api-key", key),
            Auth::None => builder,
        };

        let response = builder
            .json(&self.request_body(prompt, request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CifeError::io_operation(
                "call judge at",
                &self.endpoint,
                format!("{} - {}", status, truncate_for_log(&error_text)),
            ));
        }

        let response_json: Value = response.json().await?;
        let content = response_json
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                CifeError::operation("read judge response", "no choices[0].message.content")
            })?;

        Ok(content.trim().to_string())
    }

    async fn complete_batch(
        &self,
        prompts: &[Option<String>],
        request: &CompletionRequest,
    ) -> Vec<Option<String>> {
        let mut tasks = JoinSet::new();
        for (index, prompt) in prompts.iter().enumerate() {
            let Some(prompt) = prompt.clone() else {
                continue;
            };
            let judge = self.clone();
            let request = request.clone();
            tasks.spawn(async move {
                let result = match judge.workers.clone().acquire_owned().await {
                    Ok(_permit) => judge.complete(&prompt, &request).await,
                    Err(e) => Err(CifeError::operation("acquire judge worker", e)),
                };
                (index, result)
            });
        }

        let mut out = vec![None; prompts.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(text))) => out[index] = Some(text),
                Ok((index, Err(e))) => tracing::warn!(index, error = %e, "judge call failed"),
                Err(e) => tracing::warn!(error = %e, "judge task aborted"),
            }
        }
        out
    }
}
