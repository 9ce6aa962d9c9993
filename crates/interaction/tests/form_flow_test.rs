use std::sync::Arc;

use webprobe_core::dom::{DomEvent, ElementFixture, MemoryTree, PageFixture};
use webprobe_core::{ElementTree, EngineClock, ExecutionStatus, TimingConfig};
use webprobe_interaction::form_flow::{FILL_STEP, RESET_STEP, SUBMIT_STEP, VALIDATE_STEP};
use webprobe_interaction::{
    generate_test_data, FlowStepStatus, FormInteraction, FormTestData, StepExecutor,
};
use webprobe_validation::{FieldValidator, FormValidationCoordinator, ValidationRuleSet};

fn signup(with_submit: bool) -> Arc<MemoryTree> {
    let mut form = ElementFixture::new("form")
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
                .attr("type", "password")
                .attr("name", "password")
                .labelled(),
        )
        .child(
            ElementFixture::new("input")
                .attr("type", "checkbox")
                .attr("name", "terms")
                .labelled(),
        );
    if with_submit {
        form = form.child(ElementFixture::new("button").attr("type", "submit").text("Sign up"));
    }
    Arc::new(MemoryTree::from_fixture(PageFixture {
        url: Some("http://localhost:3000/signup".into()),
        elements: vec![form],
    }))
}

fn coordinator() -> FormValidationCoordinator {
    FormValidationCoordinator::new(FieldValidator::new(Arc::new(ValidationRuleSet::new().unwrap())))
}

#[tokio::test(start_paused = true)]
async fn test_fills_validates_submits_and_resets() {
    let tree = signup(true);
    let executor = StepExecutor::new(tree.clone(), TimingConfig::default(), EngineClock::new());
    let coordinator = coordinator();

    let data = FormTestData {
        test_reset: true,
        ..FormTestData::default()
    }
    .field("email", "ada@example.com")
    .field("password", "Analytic4l")
    .field("terms", true);

    let result = FormInteraction::new(&executor, &coordinator)
        .run("#signup", &data)
        .await;

    assert_eq!(result.status, ExecutionStatus::Completed);
    let names: Vec<_> = result.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec![FILL_STEP, VALIDATE_STEP, SUBMIT_STEP, RESET_STEP]);
    for step in &result.steps {
        assert_eq!(step.status, FlowStepStatus::Completed, "{} failed: {:?}", step.name, step.errors);
    }
    assert_eq!(result.steps[0].actions.len(), 3);
    assert_eq!(result.performance.steps_completed, 4);
    assert_eq!(result.performance.total_duration, result.timing.duration_ms);

    let email = tree.resolve("[name=\"email\"]").await.unwrap().unwrap();
    let typed = tree
        .events_for(email)
        .iter()
        .filter(|e| **e == DomEvent::Input)
        .count();
    assert_eq!(typed, "ada@example.com".len());
    // reset restores the empty defaults
    assert_eq!(tree.value_of(email).as_deref(), Some(""));
}

#[tokio::test(start_paused = true)]
async fn test_missing_fields_make_fill_partial() {
    let tree = signup(true);
    let executor = StepExecutor::new(tree, TimingConfig::default(), EngineClock::new());
    let coordinator = coordinator();

    let data = FormTestData::default()
        .field("email", "ada@example.com")
        .field("nickname", "ada");
    let result = FormInteraction::new(&executor, &coordinator)
        .run("#signup", &data)
        .await;

    assert_eq!(result.steps[0].status, FlowStepStatus::Partial);
    assert_eq!(result.steps[0].errors, vec!["Field not found: nickname".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_form_and_missing_submit_control() {
    let tree = signup(false);
    let executor = StepExecutor::new(tree, TimingConfig::default(), EngineClock::new());
    let coordinator = coordinator();

    let data = FormTestData::default().field("password", "short");
    let result = FormInteraction::new(&executor, &coordinator)
        .run("form", &data)
        .await;

    let validation = &result.steps[1];
    assert_eq!(validation.status, FlowStepStatus::Failed);
    assert!(validation.errors.contains(&"This field is required".to_string()));
    assert_eq!(result.steps[2].status, FlowStepStatus::NoSubmission);
    assert_eq!(result.performance.steps_failed, 1);
    assert_eq!(result.status, ExecutionStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_form_fails_run() {
    let tree = signup(true);
    let executor = StepExecutor::new(tree, TimingConfig::default(), EngineClock::new());
    let coordinator = coordinator();

    let result = FormInteraction::new(&executor, &coordinator)
        .run("#checkout", &FormTestData::default())
        .await;

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert!(result.steps.is_empty());
    assert_eq!(result.errors[0].message, "Form not found: #checkout");
}

#[tokio::test(start_paused = true)]
async fn test_generated_data_passes_validation() {
    let tree = signup(true);
    let form = tree.resolve("#signup").await.unwrap().unwrap();
    let data = generate_test_data(tree.as_ref(), form).await.unwrap();

    let executor = StepExecutor::new(tree, TimingConfig::default(), EngineClock::new());
    let coordinator = coordinator();
    let result = FormInteraction::new(&executor, &coordinator)
        .run("#signup", &data)
        .await;

    assert_eq!(result.steps[1].status, FlowStepStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_bracketed_and_comma_field_names_are_filled() {
    let tree = Arc::new(MemoryTree::from_fixture(PageFixture {
        url: None,
        elements: vec![ElementFixture::new("form")
            .attr("id", "account")
            .child(
                ElementFixture::new("input")
                    .attr("type", "email")
                    .attr("name", "user[email]")
                    .labelled(),
            )
            .child(ElementFixture::new("input").attr("name", "first,last").labelled())
            .child(ElementFixture::new("button").attr("type", "submit"))],
    }));
    let executor = StepExecutor::new(tree.clone(), TimingConfig::default(), EngineClock::new());
    let coordinator = coordinator();

    let data = FormTestData::default()
        .field("user[email]", "ada@example.com")
        .field("first,last", "Ada Lovelace");
    let result = FormInteraction::new(&executor, &coordinator)
        .run("#account", &data)
        .await;

    let fill = &result.steps[0];
    assert_eq!(fill.name, FILL_STEP);
    assert_eq!(fill.status, FlowStepStatus::Completed, "{:?}", fill.errors);
    assert_eq!(fill.actions.len(), 2);

    let email = tree.resolve("[name=\"user[email]\"]").await.unwrap().unwrap();
    assert_eq!(tree.value_of(email).as_deref(), Some("ada@example.com"));
    let name = tree.resolve("[name='first,last']").await.unwrap().unwrap();
    assert_eq!(tree.value_of(name).as_deref(), Some("Ada Lovelace"));
}
