//! Tests for judge module.

use super::*;
use crate::config::{ColumnConfig, JudgeConfig, Provider};
use crate::error::{CifeError, ExitCode, Result};
use crate::metrics::FailureKind;
use crate::row::RowMap;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

fn compatible_config(base_url: &str) -> JudgeConfig {
    JudgeConfig {
        provider: Provider::OpenaiCompatible,
        base_url: Some(base_url.to_string()),
        requests_per_minute: 0,
        ..Default::default()
    }
}

fn completion(content: &str) -> Value {
    json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
}

fn request() -> CompletionRequest {
    CompletionRequest {
        system_prompt: Some("You are a verifier.".to_string()),
        temperature: 0.0,
        max_tokens: 4096,
    }
}

#[tokio::test]
async fn test_batch_preserves_order_and_absent_prompts() {
    let mock_server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .and(matchers::path("/chat/completions"))
        .and(matchers::header("authorization", "Bearer test-key"))
        .and(matchers::body_string_contains("first prompt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("  A  ")))
        .mount(&mock_server)
        .await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/chat/completions"))
        .and(matchers::body_string_contains("second prompt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("B"))
                .set_delay(Duration::from_millis(50)),
        )
        .mount(&mock_server)
        .await;

    let judge = OpenAiJudge::new(
        &compatible_config(&mock_server.uri()),
        Some("test-key".to_string()),
    )
    .unwrap();
    let prompts = vec![
        Some("second prompt".to_string()),
        None,
        Some("first prompt".to_string()),
    ];

    let outputs = judge.complete_batch(&prompts, &request()).await;
    assert_eq!(
        outputs,
        vec![Some("B".to_string()), None, Some("A".to_string())]
    );
}

#[tokio::test]
async fn test_failed_call_becomes_none() {
    let mock_server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .and(matchers::path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"message": "Rate limit exceeded"}
        })))
        .mount(&mock_server)
        .await;

    let judge = OpenAiJudge::new(&compatible_config(&mock_server.uri()), None).unwrap();

    let err = judge.complete("p", &request()).await.unwrap_err();
    assert!(err.to_string().contains("429"));

    let outputs = judge
        .complete_batch(&[Some("p".to_string())], &request())
        .await;
    assert_eq!(outputs, vec![None]);
}

#[tokio::test]
async fn test_request_body_carries_sampling_settings() {
    let mock_server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .and(matchers::body_partial_json(json!({
            "model": "gpt-4o",
            "temperature": 0.0,
            "max_tokens": 4096,
            "messages": [
                {"role": "system", "content": "You are a verifier."},
                {"role": "user", "content": "judge this"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let judge = OpenAiJudge::new(&compatible_config(&mock_server.uri()), None).unwrap();
    assert_eq!(judge.complete("judge this", &request()).await.unwrap(), "ok");
}

#[tokio::test]
async fn test_azure_deployment_endpoint_and_key_header() {
    let mock_server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .and(matchers::path("/openai/deployments/gpt-4o/chat/completions"))
        .and(matchers::query_param("api-version", "2024-06-01"))
        .and(matchers::header("api-key", "azure-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("azure ok")))
        .mount(&mock_server)
        .await;

    let config = JudgeConfig {
        provider: Provider::Azure,
        base_url: Some(format!("{}/", mock_server.uri())),
        requests_per_minute: 0,
        ..Default::default()
    };
    let judge = OpenAiJudge::new(&config, Some("azure-key".to_string())).unwrap();
    assert!(judge
        .endpoint()
        .ends_with("/openai/deployments/gpt-4o/chat/completions?api-version=2024-06-01"));
    assert_eq!(judge.complete("p", &request()).await.unwrap(), "azure ok");
}

#[tokio::test]
async fn test_missing_response_content_is_error() {
    let mock_server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&mock_server)
        .await;

    let judge = OpenAiJudge::new(&compatible_config(&mock_server.uri()), None).unwrap();
    let err = judge.complete("p", &request()).await.unwrap_err();
    assert!(matches!(err, CifeError::FailedOperation { .. }));
}

#[tokio::test]
async fn test_rate_limiter_spaces_requests() {
    // 600 per minute: one start every 100ms
    let limiter = RateLimiter::per_minute(600);
    let start = Instant::now();
    for _ in 0..3 {
        limiter.acquire().await;
    }
    assert!(start.elapsed() >= Duration::from_millis(190));

    let unlimited = RateLimiter::per_minute(0);
    let start = Instant::now();
    for _ in 0..100 {
        unlimited.acquire().await;
    }
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[test]
fn test_from_config_requires_api_key() {
    let config = JudgeConfig {
        api_key_env: "CIFE_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
        ..Default::default()
    };
    let err = OpenAiJudge::from_config(&config).unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::Usage);
    assert!(err.to_string().contains("CIFE_TEST_KEY_THAT_IS_NEVER_SET"));
}

/// Fixed two-verdict adherence answer and a "Partially Correct" verdict
struct FakeJudge;

#[async_trait]
impl JudgeClient for FakeJudge {
    async fn complete(&self, prompt: &str, _request: &CompletionRequest) -> Result<String> {
        if prompt.contains("[Constraints]") {
            Ok(r#"```json
{"Evaluation": [
  {"Constraint": "Use recursion", "Reason": "recursive", "Aligns": [true]},
  {"Constraint": "No imports", "Reason": "imports os", "Aligns": [false]}
]}
```"#
                .to_string())
        } else {
            Ok(r#"{"reason": "minor bug", "correctness": "Partially Correct"}"#.to_string())
        }
    }
}

fn row(value: Value) -> RowMap {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::test]
async fn test_run_judge_derives_structured_columns() {
    let columns = ColumnConfig::default();
    let mut rows = vec![
        row(json!({
            "id": "r1",
            "combined_instruction": "Write fib",
            "response": "def fib(n): ...",
            "final_constraints": [
                {"constraint": "Use recursion", "type": "Logic", "instruction_part": "Newly Generated"},
                {"constraint": "No imports", "type": "Style", "instruction_part": "Extracted from instruction"}
            ]
        })),
        row(json!({"id": "r2", "combined_instruction": "Write fib", "response": null})),
    ];

    let failures = run_judge(
        &FakeJudge,
        &mut rows,
        &JudgeConfig::default(),
        &PromptTemplates::default(),
        &columns,
    )
    .await
    .unwrap();

    let judged = &rows[0];
    assert_eq!(judged["constraint_adherence"], json!([1, 0]));
    assert_eq!(judged["correctness_level"], json!("Partially Correct"));
    assert_eq!(judged["constraint_evaluations"][1]["reason"], json!("imports os"));
    assert_eq!(judged["scored_constraints"][0]["type"], json!("Logic"));
    assert_eq!(judged["scored_constraints"][0]["aligns"], json!(true));
    assert_eq!(judged["scored_constraints"][1]["aligns"], json!(false));
    assert!(judged["constraint_adherence_response"]
        .as_str()
        .unwrap()
        .starts_with("```json"));

    let skipped = &rows[1];
    assert_eq!(skipped["constraint_adherence_response"], Value::Null);
    assert_eq!(skipped["constraint_adherence"], Value::Null);
    assert_eq!(skipped["correctness_level"], Value::Null);
    assert_eq!(failures.rows(FailureKind::Absent), vec!["r2"]);
    assert_eq!(failures.rows(FailureKind::MissingCorrectness), vec!["r2"]);
}

#[tokio::test]
async fn test_run_judge_misaligned_constraints_left_unpaired() {
    let columns = ColumnConfig::default();
    let mut rows = vec![row(json!({
        "id": "m",
        "combined_instruction": "x",
        "response": "y",
        "final_constraints": ["only one"]
    }))];

    let failures = run_judge(
        &FakeJudge,
        &mut rows,
        &JudgeConfig::default(),
        &PromptTemplates::default(),
        &columns,
    )
    .await
    .unwrap();

    assert_eq!(rows[0]["constraint_adherence"], json!([1, 0]));
    assert_eq!(rows[0]["scored_constraints"], Value::Null);
    assert_eq!(failures.rows(FailureKind::Misaligned), vec!["m"]);
}

#[test]
fn test_apply_extraction_offline() {
    let columns = ColumnConfig::default();
    let mut rows = vec![
        row(json!({
            "id": 1,
            "final_constraints": ["a", "b"],
            "constraint_adherence_response": r#"Verdicts: "Aligns": true ... "Aligns": false"#,
            "code_correctness_response": r#"{"correctness": "wrong"}"#
        })),
        row(json!({
            "id": 2,
            "constraint_adherence_response": "no idea",
            "code_correctness_response": null
        })),
        row(json!({
            "id": 3,
            "constraint_adherence_response": r#"{"Evaluation": [{"Aligns": "perhaps"}]}"#
        })),
    ];

    let failures = apply_extraction(&mut rows, &columns).unwrap();

    assert_eq!(rows[0]["constraint_adherence"], json!([1, 0]));
    assert_eq!(rows[0]["scored_constraints"][1], json!({"constraint": "b", "aligns": false}));
    assert_eq!(rows[0]["correctness_level"], json!("Wrong"));
    assert_eq!(rows[1]["constraint_adherence"], Value::Null);
    assert_eq!(rows[2]["constraint_adherence"], Value::Null);

    assert_eq!(failures.rows(FailureKind::Absent), vec!["2"]);
    assert_eq!(failures.rows(FailureKind::MalformedFlag), vec!["3"]);
    assert_eq!(failures.rows(FailureKind::MissingCorrectness), vec!["2", "3"]);
}

#[test]
fn test_apply_extraction_keeps_stored_correctness_without_judge_text() {
    let columns = ColumnConfig::default();
    let mut rows = vec![
        row(json!({
            "id": "kept",
            "final_constraints": ["a"],
            "correctness_level": "completely correct",
            "constraint_adherence_response": r#"{"Evaluation": [{"Aligns": true}]}"#
        })),
        row(json!({
            "id": "rejudged",
            "final_constraints": ["a"],
            "correctness_level": "Completely Correct",
            "constraint_adherence_response": r#"{"Evaluation": [{"Aligns": true}]}"#,
            "code_correctness_response": "I could not decide."
        })),
    ];

    let failures = apply_extraction(&mut rows, &columns).unwrap();

    assert_eq!(rows[0]["correctness_level"], json!("Completely Correct"));
    assert_eq!(rows[0]["constraint_adherence"], json!([1]));
    assert_eq!(rows[1]["correctness_level"], Value::Null);
    assert_eq!(failures.rows(FailureKind::MissingCorrectness), vec!["rejudged"]);
}

#[test]
fn test_apply_extraction_without_constraint_list() {
    let columns = ColumnConfig::default();
    let mut rows = vec![row(json!({
        "id": "bare",
        "correctness_level": "Wrong",
        "constraint_adherence_response": r#"{"Evaluation": [{"Aligns": true}, {"Aligns": false}]}"#
    }))];

    let failures = apply_extraction(&mut rows, &columns).unwrap();

    assert_eq!(rows[0]["constraint_adherence"], json!([1, 0]));
    assert_eq!(rows[0]["scored_constraints"], Value::Null);
    assert_eq!(failures.rows(FailureKind::MissingConstraints), vec!["bare"]);
    assert!(failures.rows(FailureKind::Misaligned).is_empty());
}
