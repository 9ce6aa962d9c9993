use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use webprobe_core::dom::{ElementFixture, MemoryTree, PageFixture};
use webprobe_core::{ElementTree, EngineConfig, EngineError, ExecutionStatus};
use webprobe_engine::TestEngine;
use webprobe_network::{HttpRequest, HttpResponse, RequestExecutor};
use webprobe_reporting::{NotificationStatus, NotificationSummary, RunRecord};
use webprobe_suite::{CaseContext, TestCase, TestSuite};

fn signup_page() -> Arc<MemoryTree> {
    Arc::new(MemoryTree::from_fixture(PageFixture {
        url: Some("http://localhost:8080/signup".into()),
        elements: vec![ElementFixture::new("form")
            .attr("id", "signup")
            .child(
                ElementFixture::new("input")
                    .attr("type", "email")
                    .attr("name", "email")
                    .attr("required", "")
                    .labelled(),
            )
            .child(
                ElementFixture::new("input")
                    .attr("name", "nickname")
                    .attr("required", "")
                    .labelled(),
            )
            .child(ElementFixture::new("button").attr("type", "submit"))],
    }))
}

fn engine(tree: Arc<MemoryTree>) -> TestEngine {
    TestEngine::new(EngineConfig::default(), tree).unwrap()
}

struct Fails;

#[async_trait]
impl TestCase for Fails {
    fn id(&self) -> &str {
        "fails"
    }

    fn name(&self) -> &str {
        "Fails"
    }

    async fn execute(&self, _ctx: &CaseContext<'_>) -> anyhow::Result<Value> {
        anyhow::bail!("checkout button missing")
    }
}

struct Passes;

#[async_trait]
impl TestCase for Passes {
    fn id(&self) -> &str {
        "passes"
    }

    fn name(&self) -> &str {
        "Passes"
    }

    async fn execute(&self, _ctx: &CaseContext<'_>) -> anyhow::Result<Value> {
        Ok(json!({"ok": true}))
    }
}

#[tokio::test(start_paused = true)]
async fn test_failing_case_is_contained_and_exported() {
    let mut engine = engine(signup_page());
    engine.register_suite(
        "smoke",
        TestSuite::new("Smoke", "two independent cases").case(Fails).case(Passes),
    );

    let result = engine.run_suite("smoke", None).await.unwrap();
    assert_eq!(result.status, ExecutionStatus::Completed);
    assert_eq!(result.cases[0].status, ExecutionStatus::Failed);
    assert_eq!(result.cases[0].error.as_deref(), Some("checkout button missing"));
    assert_eq!(result.cases[1].status, ExecutionStatus::Completed);
    assert_eq!(engine.results().len(), 1);

    let csv = engine.export("csv").unwrap();
    let rows: Vec<&str> = csv.lines().collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows[0],
        "\"Test Name\",\"Status\",\"Duration (ms)\",\"Errors\",\"Timestamp\""
    );
    assert!(rows[1].starts_with("\"Fails\",\"failed\""));

    let junit = engine.export("junit").unwrap();
    assert!(junit.contains("<failure message=\"checkout button missing\">"));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_names_fail_loudly() {
    let engine = engine(signup_page());

    let err = engine.run_suite("nightly", None).await.unwrap_err();
    assert_eq!(err.to_string(), "Test suite not found: nightly");

    let err = engine.validate_form("#missing").await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));

    let err = engine.export("pdf").unwrap_err();
    assert!(matches!(err, EngineError::UnsupportedFormat(_)));

    let err = engine
        .run_sequence_value(json!({"name": "bad", "steps": [{"type": "hover", "selector": "#a"}]}))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownStepType(ref t) if t == "hover"));

    assert!(engine.results().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_sequences_and_form_flows_land_in_results_log() {
    let tree = signup_page();
    let engine = engine(tree.clone());

    let sequence = engine
        .run_sequence_value(json!({
            "name": "fill email",
            "steps": [
                {"type": "input", "selector": "[name=\"email\"]", "value": "a@b.io"},
                {"type": "validate", "selector": "[name=\"email\"]",
                 "validation": {"type": "value", "equals": "a@b.io"}}
            ]
        }))
        .await
        .unwrap();
    assert_eq!(sequence.status, ExecutionStatus::Completed);
    assert_eq!(sequence.completed_steps(), 2);

    let flow = engine.test_form_interaction("#signup", None).await.unwrap();
    assert_eq!(flow.status, ExecutionStatus::Completed);
    assert_eq!(tree.submissions().len(), 1);

    let records = engine.results();
    assert_eq!(records.len(), 2);
    assert!(matches!(records[0], RunRecord::Sequence(_)));
    assert!(matches!(records[1], RunRecord::FormInteraction(_)));

    let report = engine.performance_report();
    assert_eq!(report.test_results.len(), 2);
    assert_eq!(
        report.summary.completed_count + report.summary.failed_count,
        2 + flow.steps.len()
    );

    engine.clear_results();
    assert!(engine.results().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_ci_session_runs_enabled_suites() {
    let engine = engine(signup_page());
    let url = "http://localhost:8080/signup";
    assert!(engine.should_trigger_ci(url));
    assert!(!engine.should_trigger_ci("https://example.com"));

    let session = engine.run_ci_session(url).await;
    assert_eq!(session.status, ExecutionStatus::Completed);
    assert_eq!(session.suites.len(), 2);
    assert_eq!(session.total_tests(), 3);

    let summary = NotificationSummary::from_session(&session);
    assert_eq!(summary.status, NotificationStatus::Success);
    assert_eq!(summary.environment, "development");
    assert_eq!(summary.url, url);
    assert_eq!(engine.results().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_submit_hook_respects_auto_test() {
    let tree = signup_page();
    let form = tree.resolve("#signup").await.unwrap().unwrap();

    let result = engine(tree.clone()).on_form_submitted(form).await.unwrap().unwrap();
    assert!(!result.is_valid);
    assert_eq!(result.errors.len(), 2);

    let config = EngineConfig {
        auto_test: false,
        ..EngineConfig::default()
    };
    let quiet = TestEngine::new(config, tree).unwrap();
    assert!(quiet.on_form_submitted(form).await.unwrap().is_none());
}

struct Upstream;

#[async_trait]
impl RequestExecutor for Upstream {
    async fn execute(&self, request: HttpRequest) -> anyhow::Result<HttpResponse> {
        tokio::time::sleep(std::time::Duration::from_millis(40)).await;
        if request.url.ends_with("/down") {
            anyhow::bail!("connection refused");
        }
        Ok(HttpResponse {
            status: 200,
            body: "{}".into(),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn test_instrumented_calls_appear_in_report() {
    let engine = engine(signup_page());
    let client = engine.instrument(Upstream);

    client.execute(HttpRequest::get("http://api.local/up")).await.unwrap();
    assert!(client.execute(HttpRequest::get("http://api.local/down")).await.is_err());

    let report = engine.performance_report();
    assert_eq!(report.network_stats.total, 2);
    assert_eq!(report.network_stats.successful, 1);
    assert_eq!(report.network_stats.failed, 1);
    assert_eq!(report.network_stats.average_duration, 40.0);
    assert_eq!(report.network_calls[1].error.as_deref(), Some("connection refused"));

    let json: Value = serde_json::from_str(&engine.export("json").unwrap()).unwrap();
    assert_eq!(json["networkStats"]["total"], 2);
}
