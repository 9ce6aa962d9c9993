//! Field and form validation for webprobe.
//!
//! # Modules
//! - `rules` — the immutable rule set (email, phone, url, password, Luhn)
//! - `field` — per-field checks in a fixed order
//! - `form` — form-level aggregation over an element tree

pub mod field;
pub mod form;
pub mod rules;

pub use field::{FieldDescriptor, FieldValidationResult, FieldValidator};
pub use form::{FieldError, FormValidationCoordinator, FormValidationResult};
pub use rules::{luhn_valid, PasswordCriteria, RuleKind, RuleOutcome, ValidationRuleSet};
