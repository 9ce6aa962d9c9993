//! Test cases — opaque async callbacks producing a raw JSON result.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use webprobe_core::{ElementId, ElementTree, EngineResult};
use webprobe_interaction::StepExecutor;
use webprobe_validation::FormValidationCoordinator;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// What a case runs against: the element tree, an optional target element
/// and the engine components it may drive.
pub struct CaseContext<'a> {
    pub executor: &'a StepExecutor,
    pub validator: &'a FormValidationCoordinator,
    /// Scope for queries; the whole document when `None`.
    pub target: Option<ElementId>,
}

impl<'a> CaseContext<'a> {
    pub fn tree(&self) -> &'a dyn ElementTree {
        self.executor.tree()
    }

    /// Elements matching `selector` inside the target, or anywhere when no
    /// target was given.
    pub async fn query(&self, selector: &str) -> EngineResult<Vec<ElementId>> {
        match self.target {
            Some(scope) => self.tree().query_within(scope, selector).await,
            None => self.tree().resolve_all(selector).await,
        }
    }
}

#[async_trait]
pub trait TestCase: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn priority(&self) -> Priority {
        Priority::Medium
    }

    /// Run the case. Errors are recorded on the case result, never raised
    /// past the suite.
    async fn execute(&self, ctx: &CaseContext<'_>) -> anyhow::Result<Value>;
}
