//! Interaction step executor — runs one step against the element tree and
//! records its lifecycle (pending → running → completed | failed).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::time::Instant;
use tracing::{debug, warn};
use webprobe_core::clock::pause;
use webprobe_core::dom::{DomEvent, ScrollAlign, ScrollBehavior, ScrollOptions, ScreenshotCapture};
use webprobe_core::{
    ElementId, ElementTree, EngineClock, EngineError, EngineResult, ErrorRecord, ExecutionStatus,
    Timing, TimingConfig,
};

use crate::step::{ClickOptions, ElementAssertion, InteractionStep, ScrollStepOptions, ScrollTarget, StepAction, StepType};

/// Externally supplied behaviour for `custom` steps.
#[async_trait]
pub trait CustomAction: Send + Sync {
    async fn run(&self, tree: &dyn ElementTree, params: &Value) -> anyhow::Result<()>;
}

/// Result of one executed step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub index: usize,
    pub name: String,
    #[serde(rename = "type")]
    pub step_type: StepType,
    pub status: ExecutionStatus,
    #[serde(flatten)]
    pub timing: Timing,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
    /// Step-specific output, e.g. screenshot metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

impl StepResult {
    fn pending(step: &InteractionStep, index: usize, start_ms: u64) -> Self {
        Self {
            index,
            name: step.display_name(index),
            step_type: step.step_type(),
            status: ExecutionStatus::Pending,
            timing: Timing::between(start_ms, start_ms),
            error: None,
            output: None,
        }
    }

    /// Move to `next`; backward transitions are ignored.
    fn advance(&mut self, next: ExecutionStatus) {
        if self.status.can_transition_to(next) {
            self.status = next;
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == ExecutionStatus::Failed
    }
}

pub struct StepExecutor {
    tree: Arc<dyn ElementTree>,
    timing: TimingConfig,
    clock: EngineClock,
    screenshots: Option<Arc<dyn ScreenshotCapture>>,
    custom_actions: HashMap<String, Arc<dyn CustomAction>>,
}

impl StepExecutor {
    pub fn new(tree: Arc<dyn ElementTree>, timing: TimingConfig, clock: EngineClock) -> Self {
        Self {
            tree,
            timing,
            clock,
            screenshots: None,
            custom_actions: HashMap::new(),
        }
    }

    pub fn with_screenshots(mut self, capture: Arc<dyn ScreenshotCapture>) -> Self {
        self.screenshots = Some(capture);
        self
    }

    pub fn with_custom_action(mut self, name: impl Into<String>, action: Arc<dyn CustomAction>) -> Self {
        self.custom_actions.insert(name.into(), action);
        self
    }

    pub fn tree(&self) -> &dyn ElementTree {
        self.tree.as_ref()
    }

    pub fn clock(&self) -> &EngineClock {
        &self.clock
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Execute one step. Failures are captured into the result.
    pub async fn execute(&self, step: &InteractionStep, index: usize) -> StepResult {
        self.execute_with_fault(step, index).await.0
    }

    /// Like [`execute`](Self::execute), also handing back the error when it
    /// is an orchestration fault the caller must not continue past.
    pub(crate) async fn execute_with_fault(
        &self,
        step: &InteractionStep,
        index: usize,
    ) -> (StepResult, Option<EngineError>) {
        let start_ms = self.clock.now_ms();
        let mut result = StepResult::pending(step, index, start_ms);
        result.advance(ExecutionStatus::Running);
        debug!(index, name = %result.name, step_type = %result.step_type, "Step started");

        let outcome = self.run_action(&step.action).await;
        result.timing = Timing::since(&self.clock, start_ms);

        match outcome {
            Ok(output) => {
                result.output = output;
                result.advance(ExecutionStatus::Completed);
                debug!(index, duration_ms = result.timing.duration_ms, "Step completed");
                (result, None)
            }
            Err(err) => {
                warn!(index, name = %result.name, error = %err, "Step failed");
                result.error = Some(ErrorRecord::from_error(&err));
                result.advance(ExecutionStatus::Failed);
                let fault = err.is_orchestration_fault().then_some(err);
                (result, fault)
            }
        }
    }

    async fn run_action(&self, action: &StepAction) -> EngineResult<Option<Value>> {
        match action {
            StepAction::Click { selector, options } => {
                self.click(selector, options).await?;
                Ok(None)
            }
            StepAction::Input { selector, value } => {
                let id = self.require(selector).await?;
                self.type_text(id, value).await?;
                Ok(None)
            }
            StepAction::Scroll { target, options } => {
                self.scroll(target, options).await?;
                Ok(None)
            }
            StepAction::Wait { duration } => {
                pause(*duration).await;
                Ok(None)
            }
            StepAction::WaitForElement { selector, timeout } => {
                let timeout = timeout.unwrap_or(self.timing.wait_for_element_timeout_ms);
                self.wait_for_element(selector, timeout).await?;
                Ok(None)
            }
            StepAction::Screenshot { options } => self.screenshot(options).await.map(Some),
            StepAction::Validate {
                selector,
                validation,
            } => {
                self.assert_element(selector, validation).await?;
                Ok(None)
            }
            StepAction::Custom { action, params } => {
                let handler = self
                    .custom_actions
                    .get(action)
                    .ok_or_else(|| EngineError::not_found("Custom action", action.as_str()))?;
                handler
                    .run(self.tree.as_ref(), params)
                    .await
                    .map_err(|e| EngineError::Action(format!("{e:#}")))?;
                Ok(None)
            }
        }
    }

    async fn require(&self, selector: &str) -> EngineResult<ElementId> {
        self.tree
            .resolve(selector)
            .await?
            .ok_or_else(|| EngineError::element(selector))
    }

    /// Pointer-down, pointer-up and click at the element's centre.
    pub async fn click(&self, selector: &str, options: &ClickOptions) -> EngineResult<()> {
        let id = self.require(selector).await?;

        if options.scroll_into_view {
            self.tree
                .scroll_into_view(
                    id,
                    ScrollOptions {
                        behavior: ScrollBehavior::Smooth,
                        block: ScrollAlign::Center,
                    },
                )
                .await?;
            pause(self.timing.click_settle_ms).await;
        }

        let (x, y) = self.tree.snapshot(id).await?.rect.center();
        for event in [
            DomEvent::MouseDown { x, y },
            DomEvent::MouseUp { x, y },
            DomEvent::Click { x, y },
        ] {
            self.tree.dispatch(id, event).await?;
            pause(self.timing.pointer_event_gap_ms).await;
        }
        Ok(())
    }

    /// Focus, clear, type one character at a time, then change and blur.
    pub async fn type_text(&self, id: ElementId, value: &str) -> EngineResult<()> {
        self.tree.focus(id).await?;
        pause(self.timing.focus_settle_ms).await;

        self.tree.set_value(id, "").await?;
        pause(self.timing.focus_settle_ms).await;

        let mut typed = String::with_capacity(value.len());
        for ch in value.chars() {
            typed.push(ch);
            self.tree.set_value(id, &typed).await?;
            self.tree.dispatch(id, DomEvent::Input).await?;
            self.tree.dispatch(id, DomEvent::KeyUp).await?;
            pause(self.timing.typing_char_delay_ms).await;
        }

        self.tree.dispatch(id, DomEvent::Change).await?;
        self.tree.blur(id).await?;
        pause(self.timing.focus_settle_ms).await;
        Ok(())
    }

    pub async fn scroll(&self, target: &ScrollTarget, options: &ScrollStepOptions) -> EngineResult<()> {
        match target {
            ScrollTarget::Selector(selector) => {
                let id = self.require(selector).await?;
                self.tree
                    .scroll_into_view(
                        id,
                        ScrollOptions {
                            behavior: options.behavior(),
                            block: options.block,
                        },
                    )
                    .await?;
            }
            ScrollTarget::Point { x, y } => {
                self.tree.scroll_viewport(*x, *y, options.behavior()).await?;
            }
        }
        pause(options.wait_after.unwrap_or(self.timing.scroll_settle_ms)).await;
        Ok(())
    }

    /// Poll until the element exists and is visible, or fail once `timeout_ms`
    /// has elapsed.
    pub async fn wait_for_element(&self, selector: &str, timeout_ms: u64) -> EngineResult<ElementId> {
        let started = Instant::now();
        let timeout = Duration::from_millis(timeout_ms);

        loop {
            if let Some(id) = self.tree.resolve(selector).await? {
                if self.tree.snapshot(id).await?.visible {
                    debug!(selector, waited_ms = started.elapsed().as_millis() as u64, "Element visible");
                    return Ok(id);
                }
            }
            if started.elapsed() >= timeout {
                break;
            }
            pause(self.timing.poll_interval_ms.max(1)).await;
        }

        Err(EngineError::ElementNotFound {
            selector: selector.to_string(),
            timeout_ms,
        })
    }

    async fn screenshot(&self, options: &Value) -> EngineResult<Value> {
        let timestamp = self.clock.wall_time(self.clock.now_ms()).to_rfc3339();
        match &self.screenshots {
            Some(capture) => {
                let reference = capture.capture(options).await?;
                Ok(json!({
                    "status": "captured",
                    "reference": reference,
                    "options": options,
                    "timestamp": timestamp,
                }))
            }
            None => {
                debug!(?options, "Screenshot requested without a capture backend");
                Ok(json!({
                    "status": "simulated",
                    "options": options,
                    "timestamp": timestamp,
                }))
            }
        }
    }

    pub async fn assert_element(&self, selector: &str, assertion: &ElementAssertion) -> EngineResult<()> {
        let id = self.require(selector).await?;
        let el = self.tree.snapshot(id).await?;

        match assertion {
            ElementAssertion::Exists => Ok(()),
            ElementAssertion::Visible => {
                if el.visible {
                    Ok(())
                } else {
                    Err(EngineError::mismatch("Element is not visible", "visible", "hidden"))
                }
            }
            ElementAssertion::Text { equals, contains } => {
                let text = el.text.trim();
                if let Some(expected) = equals {
                    if text != expected {
                        return Err(EngineError::mismatch(
                            format!("Text mismatch. Expected: \"{expected}\", Got: \"{text}\""),
                            expected.as_str(),
                            text,
                        ));
                    }
                }
                if let Some(needle) = contains {
                    if !text.contains(needle.as_str()) {
                        return Err(EngineError::mismatch(
                            format!("Text does not contain: \"{needle}\""),
                            needle.as_str(),
                            text,
                        ));
                    }
                }
                Ok(())
            }
            ElementAssertion::Value { equals } => match equals {
                Some(expected) if &el.value != expected => Err(EngineError::mismatch(
                    format!("Value mismatch. Expected: \"{expected}\", Got: \"{}\"", el.value),
                    expected.as_str(),
                    el.value.as_str(),
                )),
                _ => Ok(()),
            },
            ElementAssertion::Attribute { attribute, equals } => {
                let actual = el.attribute(attribute);
                match equals {
                    Some(expected) if actual != Some(expected.as_str()) => {
                        let shown = actual.unwrap_or("null");
                        Err(EngineError::mismatch(
                            format!(
                                "Attribute \"{attribute}\" mismatch. Expected: \"{expected}\", Got: \"{shown}\""
                            ),
                            expected.as_str(),
                            shown,
                        ))
                    }
                    _ => Ok(()),
                }
            }
        }
    }
}
