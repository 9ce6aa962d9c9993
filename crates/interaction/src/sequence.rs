//! Sequence runner — executes an ordered list of steps with stop-on-failure
//! and inter-step delay policy.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;
use webprobe_core::clock::pause;
use webprobe_core::{EngineError, EngineResult, ErrorRecord, ExecutionStatus, Timing};

use crate::executor::{StepExecutor, StepResult};
use crate::step::InteractionStep;

/// An authored interaction flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sequence {
    pub name: String,
    pub steps: Vec<InteractionStep>,
    /// Falls back to the engine default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_on_failure: Option<bool>,
}

impl Sequence {
    pub fn new(name: impl Into<String>, steps: Vec<InteractionStep>) -> Self {
        Self {
            name: name.into(),
            steps,
            stop_on_failure: None,
        }
    }

    pub fn stop_on_failure(mut self, stop: bool) -> Self {
        self.stop_on_failure = Some(stop);
        self
    }

    /// Parse an untrusted sequence descriptor, checking every step's
    /// discriminants.
    pub fn from_value(value: Value) -> EngineResult<Self> {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("Unnamed sequence")
            .to_string();
        let stop_on_failure = value.get("stopOnFailure").and_then(Value::as_bool);
        let steps = match value.get("steps") {
            Some(Value::Array(items)) => items
                .iter()
                .cloned()
                .map(InteractionStep::from_value)
                .collect::<EngineResult<Vec<_>>>()?,
            None | Some(Value::Null) => Vec::new(),
            Some(other) => {
                return Err(EngineError::Serialization(serde::de::Error::custom(format!(
                    "sequence steps must be an array, got {other}"
                ))))
            }
        };
        Ok(Self {
            name,
            steps,
            stop_on_failure,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceResult {
    pub id: Uuid,
    pub sequence_name: String,
    pub status: ExecutionStatus,
    #[serde(flatten)]
    pub timing: Timing,
    pub steps: Vec<StepResult>,
    #[serde(default)]
    pub errors: Vec<ErrorRecord>,
}

impl SequenceResult {
    pub fn completed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == ExecutionStatus::Completed)
            .count()
    }

    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.is_failed()).count()
    }
}

pub struct SequenceRunner<'a> {
    executor: &'a StepExecutor,
    default_stop_on_failure: bool,
}

impl<'a> SequenceRunner<'a> {
    pub fn new(executor: &'a StepExecutor, default_stop_on_failure: bool) -> Self {
        Self {
            executor,
            default_stop_on_failure,
        }
    }

    /// Run every step in declared order. The sequence fails only when it
    /// aborts: on a failed step with stop-on-failure set, or on an
    /// orchestration fault.
    pub async fn run(&self, sequence: &Sequence) -> SequenceResult {
        let clock = self.executor.clock();
        let start_ms = clock.now_ms();
        let stop_on_failure = sequence
            .stop_on_failure
            .unwrap_or(self.default_stop_on_failure);

        info!(
            sequence = %sequence.name,
            steps = sequence.steps.len(),
            stop_on_failure,
            "Running interaction sequence"
        );

        let mut status = ExecutionStatus::Running;
        let mut steps = Vec::with_capacity(sequence.steps.len());
        let mut errors = Vec::new();

        for (index, step) in sequence.steps.iter().enumerate() {
            let (result, fault) = self.executor.execute_with_fault(step, index).await;
            let failed = result.is_failed();
            let step_error = result.error.clone();
            steps.push(result);

            if let Some(fault) = fault {
                warn!(sequence = %sequence.name, index, error = %fault, "Sequence aborted by fault");
                errors.push(ErrorRecord::from_error(&fault));
                status = ExecutionStatus::Failed;
                break;
            }
            if failed && stop_on_failure {
                warn!(sequence = %sequence.name, index, "Sequence stopped on failed step");
                if let Some(err) = step_error {
                    errors.push(err);
                }
                status = ExecutionStatus::Failed;
                break;
            }
            if let Some(delay) = step.wait_after {
                pause(delay).await;
            }
        }

        if status == ExecutionStatus::Running {
            status = ExecutionStatus::Completed;
        }

        let result = SequenceResult {
            id: Uuid::new_v4(),
            sequence_name: sequence.name.clone(),
            status,
            timing: Timing::since(clock, start_ms),
            steps,
            errors,
        };

        info!(
            sequence = %result.sequence_name,
            status = %result.status,
            completed = result.completed_steps(),
            failed = result.failed_steps(),
            duration_ms = result.timing.duration_ms,
            "Sequence finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use webprobe_core::dom::{ElementFixture, MemoryTree};
    use webprobe_core::{EngineClock, TimingConfig};

    use super::*;

    fn executor(tree: Arc<MemoryTree>) -> StepExecutor {
        StepExecutor::new(tree, TimingConfig::default(), EngineClock::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_after_applied_between_steps() {
        let tree = Arc::new(MemoryTree::new());
        let executor = executor(tree);
        let sequence = Sequence::new(
            "pauses",
            vec![InteractionStep::wait(10).wait_after(40), InteractionStep::wait(10)],
        );
        let result = SequenceRunner::new(&executor, true).run(&sequence).await;
        assert_eq!(result.status, ExecutionStatus::Completed);
        assert_eq!(result.timing.duration_ms, 60);
        assert_eq!(result.steps[1].timing.start_ms, 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detached_target_aborts_even_without_stop() {
        let tree = Arc::new(MemoryTree::new());
        tree.insert(None, ElementFixture::new("button").attr("id", "go"));
        tree.detach();
        let executor = executor(tree);
        let sequence = Sequence::new(
            "detached",
            vec![InteractionStep::click("#go"), InteractionStep::wait(5)],
        )
        .stop_on_failure(false);

        let result = SequenceRunner::new(&executor, true).run(&sequence).await;
        assert_eq!(result.status, ExecutionStatus::Failed);
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.errors[0].kind, "target_detached");
    }

    #[test]
    fn test_from_value() {
        let sequence = Sequence::from_value(json!({
            "name": "login",
            "stopOnFailure": false,
            "steps": [
                {"type": "input", "selector": "#user", "value": "ada"},
                {"type": "click", "selector": "#submit", "waitAfter": 100}
            ]
        }))
        .unwrap();
        assert_eq!(sequence.name, "login");
        assert_eq!(sequence.stop_on_failure, Some(false));
        assert_eq!(sequence.steps[1].wait_after, Some(100));

        let err = Sequence::from_value(json!({"name": "x", "steps": [{"type": "drag"}]})).unwrap_err();
        assert_eq!(err.to_string(), "Unknown step type: drag");
    }
}
