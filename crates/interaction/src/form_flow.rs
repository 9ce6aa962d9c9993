//! End-to-end form interaction: fill, validate, submit and optionally reset
//! one form, recording each phase as a flow step.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use webprobe_core::clock::pause;
use webprobe_core::dom::SubmitOutcome;
use webprobe_core::{ElementId, ElementTree, EngineError, EngineResult, ErrorRecord, ExecutionStatus, Timing};
use webprobe_validation::{FormValidationCoordinator, FormValidationResult};

use crate::executor::StepExecutor;

pub const FILL_STEP: &str = "Fill Form Fields";
pub const VALIDATE_STEP: &str = "Form Validation";
pub const SUBMIT_STEP: &str = "Form Submission Test";
pub const RESET_STEP: &str = "Form Reset Test";

/// Value typed into (or toggled on) a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldInput {
    Checked(bool),
    Text(String),
}

impl From<&str> for FieldInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<bool> for FieldInput {
    fn from(value: bool) -> Self {
        Self::Checked(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormTestData {
    /// Field name (or id) to input, filled in key order.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldInput>,
    #[serde(default = "default_submit_form")]
    pub submit_form: bool,
    #[serde(default)]
    pub test_reset: bool,
}

fn default_submit_form() -> bool {
    true
}

impl Default for FormTestData {
    fn default() -> Self {
        Self {
            fields: BTreeMap::new(),
            submit_form: true,
            test_reset: false,
        }
    }
}

impl FormTestData {
    pub fn field(mut self, name: impl Into<String>, value: impl Into<FieldInput>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowStepStatus {
    Completed,
    Partial,
    Failed,
    NoSubmission,
}

impl FlowStepStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
            Self::NoSubmission => "no-submission",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillAction {
    pub field: String,
    pub value: FieldInput,
    #[serde(rename = "type")]
    pub input_type: String,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldState {
    pub name: String,
    pub value: String,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetCheck {
    pub successful: bool,
    pub before_reset: Vec<FieldState>,
    pub after_reset: Vec<FieldState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowStep {
    pub name: String,
    pub status: FlowStepStatus,
    #[serde(flatten)]
    pub timing: Timing,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<FillAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<FormValidationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission: Option<SubmitOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset: Option<ResetCheck>,
}

impl FlowStep {
    fn new(name: &str, start_ms: u64) -> Self {
        Self {
            name: name.to_string(),
            status: FlowStepStatus::Completed,
            timing: Timing::between(start_ms, start_ms),
            errors: Vec::new(),
            actions: Vec::new(),
            validation: None,
            submission: None,
            reset: None,
        }
    }

    fn fail(&mut self, err: &EngineError) {
        self.status = FlowStepStatus::Failed;
        self.errors.push(err.to_string());
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowPerformance {
    pub total_duration: u64,
    pub steps_completed: usize,
    pub steps_failed: usize,
    pub average_step_duration: f64,
}

impl FlowPerformance {
    fn measure(timing: &Timing, steps: &[FlowStep]) -> Self {
        let average_step_duration = if steps.is_empty() {
            0.0
        } else {
            steps.iter().map(|s| s.timing.duration_ms as f64).sum::<f64>() / steps.len() as f64
        };
        Self {
            total_duration: timing.duration_ms,
            steps_completed: steps
                .iter()
                .filter(|s| s.status == FlowStepStatus::Completed)
                .count(),
            steps_failed: steps
                .iter()
                .filter(|s| s.status == FlowStepStatus::Failed)
                .count(),
            average_step_duration,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormInteractionResult {
    pub id: Uuid,
    pub form_selector: String,
    pub status: ExecutionStatus,
    #[serde(flatten)]
    pub timing: Timing,
    pub steps: Vec<FlowStep>,
    #[serde(default)]
    pub errors: Vec<ErrorRecord>,
    pub performance: FlowPerformance,
}

pub struct FormInteraction<'a> {
    executor: &'a StepExecutor,
    coordinator: &'a FormValidationCoordinator,
}

impl<'a> FormInteraction<'a> {
    pub fn new(executor: &'a StepExecutor, coordinator: &'a FormValidationCoordinator) -> Self {
        Self {
            executor,
            coordinator,
        }
    }

    /// Run the flow against the form resolved by `form_selector`. A missing
    /// form fails the whole run; phase failures are kept on their steps.
    pub async fn run(&self, form_selector: &str, data: &FormTestData) -> FormInteractionResult {
        let form = self.resolve_form(form_selector).await;
        self.run_resolved(form_selector, form, data).await
    }

    /// Run the flow against an already resolved form. `label` names the form
    /// in the result.
    pub async fn run_form(&self, form: ElementId, label: &str, data: &FormTestData) -> FormInteractionResult {
        self.run_resolved(label, Ok(form), data).await
    }

    async fn run_resolved(
        &self,
        label: &str,
        form: EngineResult<ElementId>,
        data: &FormTestData,
    ) -> FormInteractionResult {
        let clock = self.executor.clock();
        let start_ms = clock.now_ms();
        let mut steps = Vec::new();
        let mut errors = Vec::new();

        let status = match form {
            Ok(form) => {
                steps.push(self.fill(form, data).await);
                steps.push(self.validate(form).await);
                if data.submit_form {
                    steps.push(self.submit(form).await);
                }
                if data.test_reset {
                    steps.push(self.reset(form).await);
                }
                ExecutionStatus::Completed
            }
            Err(err) => {
                warn!(form = label, error = %err, "Form interaction aborted");
                errors.push(ErrorRecord::from_error(&err));
                ExecutionStatus::Failed
            }
        };

        let timing = Timing::since(clock, start_ms);
        let performance = FlowPerformance::measure(&timing, &steps);
        info!(
            form = label,
            status = %status,
            steps_completed = performance.steps_completed,
            steps_failed = performance.steps_failed,
            duration_ms = timing.duration_ms,
            "Form interaction finished"
        );

        FormInteractionResult {
            id: Uuid::new_v4(),
            form_selector: label.to_string(),
            status,
            timing,
            steps,
            errors,
            performance,
        }
    }

    async fn resolve_form(&self, selector: &str) -> EngineResult<ElementId> {
        self.executor
            .tree()
            .resolve(selector)
            .await?
            .ok_or_else(|| EngineError::not_found("Form", selector))
    }

    async fn fill(&self, form: ElementId, data: &FormTestData) -> FlowStep {
        let clock = self.executor.clock();
        let mut step = FlowStep::new(FILL_STEP, clock.now_ms());

        for (name, input) in &data.fields {
            match self.fill_field(form, name, input).await {
                Ok(Some(action)) => step.actions.push(action),
                Ok(None) => step.errors.push(format!("Field not found: {name}")),
                Err(err) => {
                    step.fail(&err);
                    break;
                }
            }
        }
        if step.status != FlowStepStatus::Failed && !step.errors.is_empty() {
            step.status = FlowStepStatus::Partial;
        }

        step.timing = Timing::since(clock, step.timing.start_ms);
        step
    }

    async fn fill_field(
        &self,
        form: ElementId,
        name: &str,
        input: &FieldInput,
    ) -> EngineResult<Option<FillAction>> {
        let tree = self.executor.tree();
        let Some(id) = find_field(tree, form, name).await? else {
            return Ok(None);
        };
        let snapshot = tree.snapshot(id).await?;

        match input {
            FieldInput::Text(value) => self.executor.type_text(id, value).await?,
            FieldInput::Checked(checked) => {
                tree.set_checked(id, *checked).await?;
                tree.dispatch(id, webprobe_core::dom::DomEvent::Change).await?;
            }
        }

        Ok(Some(FillAction {
            field: name.to_string(),
            value: input.clone(),
            input_type: snapshot.input_type().to_string(),
            success: true,
        }))
    }

    async fn validate(&self, form: ElementId) -> FlowStep {
        let clock = self.executor.clock();
        let mut step = FlowStep::new(VALIDATE_STEP, clock.now_ms());

        match self
            .coordinator
            .validate_form_element(self.executor.tree(), form)
            .await
        {
            Ok(result) => {
                if !result.is_valid {
                    step.status = FlowStepStatus::Failed;
                    step.errors
                        .extend(result.errors.iter().map(|e| e.message.clone()));
                }
                step.validation = Some(result);
            }
            Err(err) => step.fail(&err),
        }

        step.timing = Timing::since(clock, step.timing.start_ms);
        step
    }

    async fn submit(&self, form: ElementId) -> FlowStep {
        let clock = self.executor.clock();
        let mut step = FlowStep::new(SUBMIT_STEP, clock.now_ms());

        match self.executor.tree().submit_form(form).await {
            Ok(outcome) => {
                pause(self.executor.timing().submit_settle_ms).await;
                if outcome.captured {
                    step.submission = Some(outcome);
                } else {
                    step.status = FlowStepStatus::NoSubmission;
                    step.errors.push("No submission event captured".to_string());
                }
            }
            Err(err) => step.fail(&err),
        }

        step.timing = Timing::since(clock, step.timing.start_ms);
        step
    }

    async fn reset(&self, form: ElementId) -> FlowStep {
        let clock = self.executor.clock();
        let mut step = FlowStep::new(RESET_STEP, clock.now_ms());

        match self.check_reset(form).await {
            Ok(check) => {
                if !check.successful {
                    step.status = FlowStepStatus::Failed;
                    step.errors.push("Form did not reset properly".to_string());
                }
                step.reset = Some(check);
            }
            Err(err) => step.fail(&err),
        }

        step.timing = Timing::since(clock, step.timing.start_ms);
        step
    }

    async fn check_reset(&self, form: ElementId) -> EngineResult<ResetCheck> {
        let tree = self.executor.tree();
        let before_reset = field_states(tree, form).await?;
        tree.reset_form(form).await?;
        pause(self.executor.timing().focus_settle_ms).await;
        let after_reset = field_states(tree, form).await?;

        let mut successful = true;
        for id in tree.form_fields(form).await? {
            let snapshot = tree.snapshot(id).await?;
            let cleared = match snapshot.input_type() {
                "checkbox" | "radio" => !snapshot.checked,
                _ => snapshot.value.is_empty(),
            };
            successful &= cleared;
        }

        Ok(ResetCheck {
            successful,
            before_reset,
            after_reset,
        })
    }
}

async fn find_field(tree: &dyn ElementTree, form: ElementId, name: &str) -> EngineResult<Option<ElementId>> {
    let escaped = name.replace('"', "\\\"");
    for selector in [format!("[name=\"{escaped}\"]"), format!("[id=\"{escaped}\"]")] {
        if let Some(id) = tree.query_within(form, &selector).await?.into_iter().next() {
            return Ok(Some(id));
        }
    }
    Ok(None)
}

async fn field_states(tree: &dyn ElementTree, form: ElementId) -> EngineResult<Vec<FieldState>> {
    let mut states = Vec::new();
    for id in tree.form_fields(form).await? {
        let snapshot = tree.snapshot(id).await?;
        states.push(FieldState {
            name: snapshot.field_key().to_string(),
            value: snapshot.value,
            checked: snapshot.checked,
        });
    }
    Ok(states)
}

/// Plausible input for every named field of a form, chosen by input type.
/// Radio groups are skipped; checkboxes get a random state.
pub async fn generate_test_data(tree: &dyn ElementTree, form: ElementId) -> EngineResult<FormTestData> {
    let mut data = FormTestData::default();

    for id in tree.form_fields(form).await? {
        let field = tree.snapshot(id).await?;
        let name = field.field_key().to_string();
        if name.is_empty() {
            continue;
        }

        let input = match field.input_type() {
            "email" => Some(FieldInput::from("test@example.com")),
            "password" => Some(FieldInput::from("TestPassword123!")),
            "tel" => Some(FieldInput::from("+1234567890")),
            "url" => Some(FieldInput::from("https://example.com")),
            "number" => Some(FieldInput::from("42")),
            "date" => Some(FieldInput::from("2023-12-25")),
            "checkbox" => Some(FieldInput::Checked(rand::random())),
            "radio" => None,
            _ if field.tag == "select" => field.options.get(1).cloned().map(FieldInput::Text),
            _ => Some(FieldInput::Text(format!("Test {name}"))),
        };

        if let Some(input) = input {
            data.fields.insert(name, input);
        }
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use webprobe_core::dom::{ElementFixture, MemoryTree};

    use super::*;

    #[tokio::test]
    async fn test_generate_by_type() {
        let tree = MemoryTree::new();
        let form = tree.insert(
            None,
            ElementFixture::new("form")
                .child(ElementFixture::new("input").attr("type", "email").attr("name", "email"))
                .child(ElementFixture::new("input").attr("type", "tel").attr("id", "phone"))
                .child(ElementFixture::new("input").attr("type", "radio").attr("name", "plan"))
                .child(ElementFixture::new("input").attr("type", "checkbox").attr("name", "terms"))
                .child(ElementFixture::new("input").attr("type", "text"))
                .child(ElementFixture::new("textarea").attr("name", "bio"))
                .child(
                    ElementFixture::new("select")
                        .attr("name", "country")
                        .options(&["", "NZ", "AU"]),
                )
                .child(ElementFixture::new("select").attr("name", "empty").options(&["only"])),
        );

        let data = generate_test_data(&tree, form).await.unwrap();
        assert_eq!(data.fields["email"], FieldInput::from("test@example.com"));
        assert_eq!(data.fields["phone"], FieldInput::from("+1234567890"));
        assert_eq!(data.fields["bio"], FieldInput::from("Test bio"));
        assert_eq!(data.fields["country"], FieldInput::from("NZ"));
        assert!(matches!(data.fields["terms"], FieldInput::Checked(_)));
        assert!(!data.fields.contains_key("plan"));
        assert!(!data.fields.contains_key("empty"));
        assert_eq!(data.fields.len(), 5);
        assert!(data.submit_form);
    }

    #[test]
    fn test_test_data_serde_defaults() {
        let data: FormTestData =
            serde_json::from_value(serde_json::json!({"fields": {"terms": true, "name": "Ada"}})).unwrap();
        assert!(data.submit_form);
        assert!(!data.test_reset);
        assert_eq!(data.fields["terms"], FieldInput::Checked(true));
        assert_eq!(data.fields["name"], FieldInput::from("Ada"));
    }

    #[test]
    fn test_flow_performance() {
        let mut fast = FlowStep::new(FILL_STEP, 0);
        fast.timing = Timing::between(0, 100);
        let mut slow = FlowStep::new(VALIDATE_STEP, 100);
        slow.timing = Timing::between(100, 150);
        slow.status = FlowStepStatus::Failed;

        let perf = FlowPerformance::measure(&Timing::between(0, 150), &[fast, slow]);
        assert_eq!(perf.steps_completed, 1);
        assert_eq!(perf.steps_failed, 1);
        assert_eq!(perf.average_step_duration, 75.0);
        assert_eq!(perf.total_duration, 150);

        assert_eq!(FlowPerformance::measure(&Timing::between(0, 0), &[]).average_step_duration, 0.0);
    }
}
