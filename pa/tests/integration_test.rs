//! Integration tests for pipeagent
//!
//! These tests exercise the public API end to end and drive the CLI binary.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use assert_cmd::Command;
use async_trait::async_trait;
use predicates::prelude::*;
use proptest::prelude::*;
use serde_json::{Value, json};
use tempfile::{NamedTempFile, TempDir};

use pipeagent::agent::RequestOrchestrator;
use pipeagent::config::Config;
use pipeagent::domain::{BatchRecord, RequestOutcome};
use pipeagent::llm::{LlmClient, LlmError, OfflineClient};
use pipeagent::validation::{CodeSafetyAnalyzer, SchemaValidator};

const OFFLINE_CONFIG: &str = r#"
model:
  name: test-model
  provider: offline
  timeout-ms: 5000

tools:
  - name: system.ai.sql_exec

pipeline-templates:
  default:
    target-schema: main
    cluster-id: 0101-abc
    edition: ADVANCED

environments:
  dev:
    catalog-name: dev_catalog
    volume-path: /Volumes/dev/raw

deployment:
  template: default
  environment: dev

concurrency:
  max-requests: 2
"#;

fn write_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("pipeagent.yml");
    std::fs::write(&path, OFFLINE_CONFIG).expect("Failed to write config");
    path
}

fn offline_orchestrator() -> RequestOrchestrator {
    let config = Config::from_yaml(OFFLINE_CONFIG).expect("Failed to parse config");
    RequestOrchestrator::from_config(&config, Arc::new(OfflineClient::new("test-model")))
}

/// Always answers with the same text
struct FixedClient(&'static str);

#[async_trait]
impl LlmClient for FixedClient {
    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        Ok(self.0.to_string())
    }
}

// =============================================================================
// Orchestrator Tests
// =============================================================================

#[tokio::test]
async fn test_offline_request_produces_code_and_settings() {
    let outcome = offline_orchestrator().handle("Create a pipeline for sales data").await;

    let RequestOutcome::Generated {
        generated_code,
        pipeline_config,
    } = outcome
    else {
        panic!("Expected generated outcome");
    };

    assert!(generated_code.contains("import dlt"));
    assert!(generated_code.contains("@dlt.table"));
    assert_eq!(pipeline_config["name"], "mock_pipeline");
    assert_eq!(pipeline_config["target"], "mock_schema");
    assert_eq!(pipeline_config["catalog"], "dev_catalog");
    assert_eq!(pipeline_config["edition"], "ADVANCED");
    assert_eq!(pipeline_config["configuration"]["source_path"], "/Volumes/dev/raw");

    // the generated code passes its own safety check
    let report = CodeSafetyAnalyzer::default().analyze(&generated_code);
    assert!(report.is_empty());
    assert!(report.recognized_decorator_seen());
}

#[tokio::test]
async fn test_non_json_model_output_is_reported() {
    let config = Config::from_yaml(OFFLINE_CONFIG).expect("Failed to parse config");
    let orchestrator = RequestOrchestrator::from_config(&config, Arc::new(FixedClient("Not JSON")));

    let outcome = orchestrator.handle("Bad request").await;
    let value: Value = serde_json::from_str(&outcome.to_json()).unwrap();
    assert_eq!(value["error"], "LLM did not return valid JSON. Response: Not JSON");
}

#[tokio::test]
async fn test_batch_keeps_order_and_isolates_failures() {
    let orchestrator = Arc::new(offline_orchestrator());
    let records = vec![
        BatchRecord::new("first"),
        serde_json::from_str::<BatchRecord>("{}").unwrap(),
        BatchRecord::new("third"),
    ];

    let outcomes = orchestrator.handle_batch(records).await;
    assert_eq!(outcomes.len(), 3);

    let decoded: Vec<Value> = outcomes.iter().map(|o| serde_json::from_str(o).unwrap()).collect();
    assert_eq!(decoded[0]["pipeline_config"]["name"], "mock_pipeline");
    assert_eq!(decoded[1], json!({"error": "No request provided."}));
    assert!(decoded[2].get("code").is_some());
}

#[tokio::test]
async fn test_empty_batch() {
    let orchestrator = Arc::new(offline_orchestrator());
    assert!(orchestrator.handle_batch(Vec::new()).await.is_empty());
}

// =============================================================================
// Validator Properties
// =============================================================================

/// Non-empty strings, including whitespace-only and padded ones
fn identifier() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9_]{0,15}".boxed(),
        "[ \t\n]{1,4}".boxed(),
        " {1,3}[a-z]{1,8} {1,3}".boxed(),
    ]
}

fn table() -> impl Strategy<Value = Value> {
    (identifier(), proptest::option::of("[ -~]{0,20}"), "SELECT [a-z*]{1,10} FROM [a-z]{1,10}").prop_map(
        |(name, description, query)| match description {
            Some(description) => json!({"name": name, "description": description, "query": query}),
            None => json!({"name": name, "query": query}),
        },
    )
}

fn pipeline() -> impl Strategy<Value = Value> {
    (identifier(), identifier(), proptest::collection::vec(table(), 1..6)).prop_map(|(name, schema, tables)| {
        json!({"pipeline_name": name, "target_schema": schema, "tables": tables})
    })
}

proptest! {
    #[test]
    fn prop_valid_input_is_echoed(raw in pipeline()) {
        let definition = SchemaValidator::default().validate(&raw).unwrap();
        prop_assert_eq!(definition.pipeline_name(), raw["pipeline_name"].as_str().unwrap());
        prop_assert_eq!(definition.target_schema(), raw["target_schema"].as_str().unwrap());
        prop_assert_eq!(definition.tables().len(), raw["tables"].as_array().unwrap().len());
        for (table, expected) in definition.tables().iter().zip(raw["tables"].as_array().unwrap()) {
            prop_assert_eq!(table.name(), expected["name"].as_str().unwrap());
            prop_assert_eq!(table.query(), expected["query"].as_str().unwrap());
            prop_assert_eq!(table.description(), expected["description"].as_str());
        }
    }

    #[test]
    fn prop_validation_is_idempotent(raw in pipeline()) {
        let validator = SchemaValidator::default();
        let first = validator.validate(&raw).unwrap();
        let second = validator.validate(&serde_json::to_value(&first).unwrap()).unwrap();
        prop_assert_eq!(first, second);
    }
}

// =============================================================================
// CLI Tests
// =============================================================================

fn pipeagent() -> Command {
    Command::cargo_bin("pipeagent").expect("binary should build")
}

#[test]
fn test_cli_generate_offline() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(dir.path());

    pipeagent()
        .arg("--config")
        .arg(&config)
        .args(["generate", "Create a pipeline for sales data"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mock_pipeline"))
        .stdout(predicate::str::contains("import dlt"));
}

#[test]
fn test_cli_batch_from_stdin() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(dir.path());

    let output = pipeagent()
        .arg("--config")
        .arg(&config)
        .arg("batch")
        .write_stdin("{\"request\": \"first\"}\n{}\nnot json\n{\"request\": \"fourth\"}\n")
        .output()
        .expect("Failed to run batch");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<Value> = stdout.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].get("code").is_some());
    assert_eq!(lines[1]["error"], "No request provided.");
    assert!(lines[2]["error"].as_str().unwrap().starts_with("Invalid batch record"));
    assert!(lines[3].get("code").is_some());
}

#[test]
fn test_cli_check_flags_forbidden_call() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(dir.path());

    let mut script = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(script, "import os\nos.system('rm -rf /')").unwrap();

    pipeagent()
        .arg("--config")
        .arg(&config)
        .arg("check")
        .arg(script.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Forbidden function call: os.system"));
}

#[test]
fn test_cli_check_accepts_clean_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(dir.path());

    let mut script = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(
        script,
        "import dlt\n\n@dlt.table(name=\"t\")\ndef t():\n    return spark.sql(\"SELECT 1\")"
    )
    .unwrap();

    pipeagent()
        .arg("--config")
        .arg(&config)
        .arg("check")
        .arg(script.path())
        .assert()
        .success();
}

#[test]
fn test_cli_tools_lists_configured_tools() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(dir.path());

    pipeagent()
        .arg("--config")
        .arg(&config)
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("system.ai.sql_exec"))
        .stdout(predicate::str::contains("system.ai.python_exec").not());
}

#[test]
fn test_cli_missing_config_fails() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    pipeagent()
        .arg("--config")
        .arg(dir.path().join("absent.yml"))
        .arg("tools")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}
