//! Suites registered at engine start.

use async_trait::async_trait;
use serde_json::{json, Value};
use webprobe_core::EngineResult;
use webprobe_interaction::{generate_test_data, FormInteraction};

use crate::case::{CaseContext, Priority, TestCase};
use crate::registry::TestSuite;

pub const BASIC_FORM_VALIDATION: &str = "basicFormValidation";
pub const USER_INTERACTION: &str = "userInteraction";

const EMAIL_SAMPLES: [&str; 4] = ["invalid-email", "test@", "@test.com", "test@valid.com"];
const VALID_EMAIL_SAMPLE: &str = "test@valid.com";

pub fn all() -> Vec<(&'static str, TestSuite)> {
    vec![
        (BASIC_FORM_VALIDATION, basic_form_validation()),
        (USER_INTERACTION, user_interaction()),
    ]
}

pub fn basic_form_validation() -> TestSuite {
    TestSuite::new("Basic Form Validation", "Tests basic form field validation")
        .case(RequiredFields)
        .case(EmailValidation)
}

pub fn user_interaction() -> TestSuite {
    TestSuite::new(
        "User Interaction Testing",
        "Tests complex user interaction sequences",
    )
    .case(FormFillAndSubmit)
}

/// Clears every required field and expects it to be reported invalid.
/// Original values are restored afterwards.
pub struct RequiredFields;

#[async_trait]
impl TestCase for RequiredFields {
    fn id(&self) -> &str {
        "required-fields"
    }

    fn name(&self) -> &str {
        "Required Fields"
    }

    fn priority(&self) -> Priority {
        Priority::High
    }

    async fn execute(&self, ctx: &CaseContext<'_>) -> anyhow::Result<Value> {
        let tree = ctx.tree();
        let mut results = Vec::new();

        for id in ctx.query("[required]").await? {
            let original = tree.snapshot(id).await?;
            tree.set_value(id, "").await?;
            let validation = ctx.validator.validate_element(tree, id).await;
            tree.set_value(id, &original.value).await?;
            let validation = validation?;

            results.push(json!({
                "field": original.field_key(),
                "passed": !validation.is_valid,
                "message": validation.message,
            }));
        }

        Ok(Value::Array(results))
    }
}

/// Runs the sample values through every email field; only the well-formed
/// address should pass.
pub struct EmailValidation;

#[async_trait]
impl TestCase for EmailValidation {
    fn id(&self) -> &str {
        "email-validation"
    }

    fn name(&self) -> &str {
        "Email Validation"
    }

    async fn execute(&self, ctx: &CaseContext<'_>) -> anyhow::Result<Value> {
        let tree = ctx.tree();
        let mut results = Vec::new();

        for id in ctx.query("[type=\"email\"]").await? {
            let original = tree.snapshot(id).await?;
            let checked: EngineResult<()> = async {
                for sample in EMAIL_SAMPLES {
                    tree.set_value(id, sample).await?;
                    let validation = ctx.validator.validate_element(tree, id).await?;
                    let expected = sample == VALID_EMAIL_SAMPLE;
                    results.push(json!({
                        "field": original.field_key(),
                        "value": sample,
                        "passed": validation.is_valid == expected,
                        "expected": expected,
                        "actual": validation.is_valid,
                    }));
                }
                Ok(())
            }
            .await;
            tree.set_value(id, &original.value).await?;
            checked?;
        }

        Ok(Value::Array(results))
    }
}

/// Generates plausible data for every form and runs the interaction flow.
pub struct FormFillAndSubmit;

#[async_trait]
impl TestCase for FormFillAndSubmit {
    fn id(&self) -> &str {
        "form-fill-and-submit"
    }

    fn name(&self) -> &str {
        "Form Fill and Submit"
    }

    async fn execute(&self, ctx: &CaseContext<'_>) -> anyhow::Result<Value> {
        let tree = ctx.tree();
        let flow = FormInteraction::new(ctx.executor, ctx.validator);
        let mut results = Vec::new();

        for (index, form) in tree.resolve_all("form").await?.into_iter().enumerate() {
            let snapshot = tree.snapshot(form).await?;
            let label = match snapshot.dom_id() {
                Some(id) => format!("#{id}"),
                None => format!("form:nth-of-type({})", index + 1),
            };
            let data = generate_test_data(tree, form).await?;
            results.push(flow.run_form(form, &label, &data).await);
        }

        Ok(serde_json::to_value(results)?)
    }
}
