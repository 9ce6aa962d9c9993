//! Suite runner — runs every case of a suite in order, containing failures
//! per case.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;
use webprobe_core::{EngineError, EngineResult, ExecutionStatus, Timing};
use webprobe_interaction::StepExecutor;
use webprobe_validation::FormValidationCoordinator;

use crate::case::{CaseContext, Priority, TestCase};
use crate::registry::SuiteRegistry;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseResult {
    pub id: String,
    pub name: String,
    pub priority: Priority,
    pub status: ExecutionStatus,
    #[serde(flatten)]
    pub timing: Timing,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteResult {
    pub id: Uuid,
    pub suite_name: String,
    pub description: String,
    pub status: ExecutionStatus,
    #[serde(flatten)]
    pub timing: Timing,
    #[serde(rename = "tests")]
    pub cases: Vec<CaseResult>,
}

impl SuiteResult {
    pub fn passed(&self) -> usize {
        self.cases
            .iter()
            .filter(|c| c.status == ExecutionStatus::Completed)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.cases
            .iter()
            .filter(|c| c.status == ExecutionStatus::Failed)
            .count()
    }
}

pub struct TestSuiteRunner<'a> {
    registry: &'a SuiteRegistry,
    executor: &'a StepExecutor,
    validator: &'a FormValidationCoordinator,
}

impl<'a> TestSuiteRunner<'a> {
    pub fn new(
        registry: &'a SuiteRegistry,
        executor: &'a StepExecutor,
        validator: &'a FormValidationCoordinator,
    ) -> Self {
        Self {
            registry,
            executor,
            validator,
        }
    }

    /// Run the suite registered as `name` against `target` (a selector, or
    /// the whole document). Unknown suites and unresolvable targets fail
    /// immediately; case failures are recorded and the suite still completes.
    pub async fn run_suite(&self, name: &str, target: Option<&str>) -> EngineResult<SuiteResult> {
        let suite = self
            .registry
            .get(name)
            .ok_or_else(|| EngineError::not_found("Test suite", name))?;

        let target = match target {
            Some(selector) => Some(
                self.executor
                    .tree()
                    .resolve(selector)
                    .await?
                    .ok_or_else(|| EngineError::not_found("Target", selector))?,
            ),
            None => None,
        };

        let ctx = CaseContext {
            executor: self.executor,
            validator: self.validator,
            target,
        };
        let clock = self.executor.clock();
        let start_ms = clock.now_ms();

        info!(suite = name, cases = suite.cases.len(), "Running test suite");

        let mut cases = Vec::with_capacity(suite.cases.len());
        for case in &suite.cases {
            cases.push(self.run_case(case.as_ref(), &ctx).await);
        }

        let result = SuiteResult {
            id: Uuid::new_v4(),
            suite_name: name.to_string(),
            description: suite.description.clone(),
            status: ExecutionStatus::Completed,
            timing: Timing::since(clock, start_ms),
            cases,
        };

        info!(
            suite = name,
            passed = result.passed(),
            failed = result.failed(),
            duration_ms = result.timing.duration_ms,
            "Test suite finished"
        );
        Ok(result)
    }

    async fn run_case(&self, case: &dyn TestCase, ctx: &CaseContext<'_>) -> CaseResult {
        let clock = self.executor.clock();
        let start_ms = clock.now_ms();
        let outcome = case.execute(ctx).await;
        let timing = Timing::since(clock, start_ms);

        let (status, result, error) = match outcome {
            Ok(value) => (ExecutionStatus::Completed, Some(value), None),
            Err(err) => {
                warn!(case = case.name(), error = %err, "Test case failed");
                (ExecutionStatus::Failed, None, Some(format!("{err:#}")))
            }
        };

        CaseResult {
            id: case.id().to_string(),
            name: case.name().to_string(),
            priority: case.priority(),
            status,
            timing,
            result,
            error,
        }
    }
}
