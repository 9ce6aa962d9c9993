//! Field validator — applies the rule set plus structural checks (required,
//! pattern, length, accessibility) to one field.

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use webprobe_core::ElementSnapshot;

use crate::rules::{RuleKind, ValidationRuleSet};

pub const REQUIRED_MESSAGE: &str = "This field is required";
pub const INVALID_FORMAT_MESSAGE: &str = "Invalid format";
pub const UNLABELLED_WARNING: &str = "Field lacks proper labeling for accessibility";

/// Everything the validator needs to know about one field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "default_input_type", rename = "type")]
    pub input_type: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
    /// A label, `aria-label` or `aria-labelledby` is present.
    #[serde(default)]
    pub labelled: bool,
}

fn default_input_type() -> String {
    "text".to_string()
}

impl FieldDescriptor {
    pub fn new(input_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            input_type: input_type.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn labelled(mut self) -> Self {
        self.labelled = true;
        self
    }

    /// `name`, falling back to `id`, falling back to empty.
    pub fn key(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| self.id.as_deref().filter(|n| !n.is_empty()))
            .unwrap_or("")
    }
}

impl From<&ElementSnapshot> for FieldDescriptor {
    fn from(el: &ElementSnapshot) -> Self {
        let aria = |name: &str| el.attribute(name).is_some_and(|v| !v.trim().is_empty());
        Self {
            name: el.name().map(str::to_string),
            id: el.dom_id().map(str::to_string),
            input_type: el.input_type().to_string(),
            value: el.value.clone(),
            required: el.required(),
            pattern: el.pattern().map(str::to_string),
            title: el.title().map(str::to_string),
            min_length: el.min_length(),
            max_length: el.max_length(),
            labelled: el.has_label || aria("aria-label") || aria("aria-labelledby"),
        }
    }
}

/// Result for one field. Warnings never affect `is_valid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidationResult {
    pub is_valid: bool,
    pub message: String,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

impl FieldValidationResult {
    fn valid() -> Self {
        Self {
            is_valid: true,
            message: String::new(),
            warnings: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    fn fail(&mut self, message: impl Into<String>) {
        self.is_valid = false;
        self.message = message.into();
    }
}

#[derive(Debug, Clone)]
pub struct FieldValidator {
    rules: Arc<ValidationRuleSet>,
}

impl FieldValidator {
    pub fn new(rules: Arc<ValidationRuleSet>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ValidationRuleSet {
        &self.rules
    }

    /// Checks run in a fixed order; the first blocking failure ends the
    /// blocking checks. The accessibility warning is attached afterwards.
    pub fn validate(&self, field: &FieldDescriptor) -> FieldValidationResult {
        let mut result = FieldValidationResult::valid();
        let value = field.value.trim();

        if field.required && value.is_empty() {
            result.fail(REQUIRED_MESSAGE);
            return result;
        }
        if value.is_empty() {
            return result;
        }

        self.blocking_checks(field, value, &mut result);

        if !field.labelled {
            result.warnings.push(UNLABELLED_WARNING.to_string());
        }

        debug!(
            field = field.key(),
            valid = result.is_valid,
            message = %result.message,
            "field validated"
        );
        result
    }

    fn blocking_checks(&self, field: &FieldDescriptor, value: &str, result: &mut FieldValidationResult) {
        if let Some(kind) = RuleKind::for_input_type(&field.input_type) {
            let outcome = self.rules.apply(kind, value);
            if !outcome.valid {
                result.fail(outcome.message);
                result.suggestions = outcome.suggestions;
                return;
            }
        }

        let key = field.key().to_lowercase();
        if key.contains("credit") || key.contains("card") {
            let outcome = self.rules.apply(RuleKind::CreditCard, value);
            if !outcome.valid {
                result.fail(outcome.message);
                return;
            }
        }

        if let Some(pattern) = &field.pattern {
            let message = field.title.as_deref().unwrap_or(INVALID_FORMAT_MESSAGE);
            match Regex::new(pattern) {
                Ok(re) if re.is_match(value) => {}
                Ok(_) => {
                    result.fail(message);
                    return;
                }
                Err(e) => {
                    result.fail(message);
                    result.warnings.push(format!("Pattern attribute could not be compiled: {e}"));
                    return;
                }
            }
        }

        let length = value.chars().count();
        if let Some(min) = field.min_length.filter(|&m| m > 0) {
            if length < min {
                result.fail(format!("Minimum {min} characters required"));
                return;
            }
        }
        if let Some(max) = field.max_length {
            if length > max {
                result.fail(format!("Maximum {max} characters allowed"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> FieldValidator {
        FieldValidator::new(Arc::new(ValidationRuleSet::new().unwrap()))
    }

    #[test]
    fn test_required_empty_stops() {
        let field = FieldDescriptor::new("email", "   ").required();
        let r = validator().validate(&field);
        assert!(!r.is_valid);
        assert_eq!(r.message, REQUIRED_MESSAGE);
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn test_empty_optional_skips_everything() {
        let mut field = FieldDescriptor::new("email", "");
        field.min_length = Some(5);
        let r = validator().validate(&field);
        assert!(r.is_valid);
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn test_type_rule() {
        let v = validator();
        let r = v.validate(&FieldDescriptor::new("email", "test@").labelled());
        assert!(!r.is_valid);
        assert_eq!(r.message, "Please enter a valid email address");

        let r = v.validate(&FieldDescriptor::new("password", "pass").labelled());
        assert!(!r.is_valid);
        assert!(r.suggestions.contains(&"Include numbers".to_string()));

        let r = v.validate(&FieldDescriptor::new("password", "Passw0rd").labelled());
        assert!(r.is_valid);
        assert!(r.suggestions.is_empty());
    }

    #[test]
    fn test_card_name_heuristic_ignores_type() {
        let v = validator();
        let bad = FieldDescriptor::new("text", "1234567812345678").named("creditCardNumber");
        assert_eq!(
            v.validate(&bad).message,
            "Please enter a valid credit card number"
        );

        let mut good = FieldDescriptor::new("text", "1234 5678 1234 5670");
        good.id = Some("Card".into());
        assert!(v.validate(&good).is_valid);
    }

    #[test]
    fn test_pattern_uses_title() {
        let v = validator();
        let mut field = FieldDescriptor::new("text", "abc").named("zip");
        field.pattern = Some("^[0-9]{4}$".into());
        assert_eq!(v.validate(&field).message, INVALID_FORMAT_MESSAGE);

        field.title = Some("Four digit postcode".into());
        assert_eq!(v.validate(&field).message, "Four digit postcode");

        field.value = "0150".into();
        assert!(v.validate(&field).is_valid);
    }

    #[test]
    fn test_length_bounds() {
        let v = validator();
        let mut field = FieldDescriptor::new("text", "ab").named("nick");
        field.min_length = Some(3);
        assert_eq!(v.validate(&field).message, "Minimum 3 characters required");

        field.min_length = None;
        field.max_length = Some(1);
        assert_eq!(v.validate(&field).message, "Maximum 1 characters allowed");
    }

    #[test]
    fn test_first_failure_wins() {
        let mut field = FieldDescriptor::new("email", "nope").named("email");
        field.max_length = Some(2);
        let r = validator().validate(&field);
        assert_eq!(r.message, "Please enter a valid email address");
    }

    #[test]
    fn test_accessibility_warning_never_blocks() {
        let r = validator().validate(&FieldDescriptor::new("text", "hello"));
        assert!(r.is_valid);
        assert_eq!(r.warnings, vec![UNLABELLED_WARNING.to_string()]);
    }

    #[test]
    fn test_descriptor_from_snapshot() {
        let mut snap = ElementSnapshot {
            tag: "input".into(),
            value: "x".into(),
            ..Default::default()
        };
        snap.attributes.insert("type".into(), "tel".into());
        snap.attributes.insert("aria-label".into(), "Phone".into());
        snap.attributes.insert("maxlength".into(), "12".into());
        let d = FieldDescriptor::from(&snap);
        assert_eq!(d.input_type, "tel");
        assert!(d.labelled);
        assert_eq!(d.max_length, Some(12));
    }
}
