//! Form validation coordinator — runs every field of a form through the
//! field validator and aggregates a form-level verdict.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use webprobe_core::{ElementId, ElementTree, EngineError, EngineResult};

use crate::field::{FieldDescriptor, FieldValidationResult, FieldValidator};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    pub value: String,
}

/// `is_valid` is the conjunction of every field result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormValidationResult {
    pub is_valid: bool,
    pub fields: BTreeMap<String, FieldValidationResult>,
    pub errors: Vec<FieldError>,
    pub warnings: Vec<String>,
}

impl FormValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            fields: BTreeMap::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Fold one field result in, preserving declaration order of errors and
    /// warnings.
    pub fn record(&mut self, field: &FieldDescriptor, result: FieldValidationResult) {
        let key = field.key().to_string();
        if !result.is_valid {
            self.is_valid = false;
            self.errors.push(FieldError {
                field: key.clone(),
                message: result.message.clone(),
                value: field.value.clone(),
            });
        }
        self.warnings.extend(result.warnings.iter().cloned());
        self.fields.insert(key, result);
    }
}

impl Default for FormValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct FormValidationCoordinator {
    validator: FieldValidator,
}

impl FormValidationCoordinator {
    pub fn new(validator: FieldValidator) -> Self {
        Self { validator }
    }

    pub fn field_validator(&self) -> &FieldValidator {
        &self.validator
    }

    /// Validate the form resolved by `selector`. Fails with `NotFound` when
    /// nothing matches.
    pub async fn validate_form(
        &self,
        tree: &dyn ElementTree,
        selector: &str,
    ) -> EngineResult<FormValidationResult> {
        let form = tree
            .resolve(selector)
            .await?
            .ok_or_else(|| EngineError::not_found("Form", selector))?;
        let result = self.validate_form_element(tree, form).await?;
        info!(
            form = selector,
            valid = result.is_valid,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "Form validated"
        );
        Ok(result)
    }

    pub async fn validate_form_element(
        &self,
        tree: &dyn ElementTree,
        form: ElementId,
    ) -> EngineResult<FormValidationResult> {
        let mut result = FormValidationResult::new();
        for id in tree.form_fields(form).await? {
            let snapshot = tree.snapshot(id).await?;
            let descriptor = FieldDescriptor::from(&snapshot);
            let field_result = self.validator.validate(&descriptor);
            if !field_result.is_valid {
                warn!(field = descriptor.key(), message = %field_result.message, "Field invalid");
            }
            result.record(&descriptor, field_result);
        }
        Ok(result)
    }

    /// Validate a single element handle as a field.
    pub async fn validate_element(
        &self,
        tree: &dyn ElementTree,
        id: ElementId,
    ) -> EngineResult<FieldValidationResult> {
        let snapshot = tree.snapshot(id).await?;
        Ok(self.validator.validate(&FieldDescriptor::from(&snapshot)))
    }
}
