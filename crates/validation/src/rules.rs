//! Validation rule set — the registry of value-level validators (email,
//! phone, url, password, credit card). Built once, read-only afterwards.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use webprobe_core::{EngineError, EngineResult};

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
const PHONE_PATTERN: &str = r"^[+]?[1-9][0-9]{0,15}$";
const URL_PATTERN: &str = r"^https?://(www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}(?-u:\b)([-a-zA-Z0-9()@:%_+.~#?&/=]*)$";
const PASSWORD_SPECIAL_CHARS: &str = r#"!@#$%^&*(),.?":{}|<>"#;
const PASSWORD_MIN_LENGTH: usize = 8;

/// Identifier of a registered rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleKind {
    Email,
    Phone,
    Url,
    Password,
    CreditCard,
}

impl RuleKind {
    pub const ALL: [RuleKind; 5] = [
        RuleKind::Email,
        RuleKind::Phone,
        RuleKind::Url,
        RuleKind::Password,
        RuleKind::CreditCard,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Url => "url",
            Self::Password => "password",
            Self::CreditCard => "creditCard",
        }
    }

    /// Rule applied to an `<input>` of the given declared type, if any.
    pub fn for_input_type(input_type: &str) -> Option<Self> {
        match input_type {
            "email" => Some(Self::Email),
            "tel" => Some(Self::Phone),
            "url" => Some(Self::Url),
            "password" => Some(Self::Password),
            _ => None,
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| EngineError::UnknownValidationType(s.to_string()))
    }
}

/// Per-criterion outcome of the password policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordCriteria {
    pub length: bool,
    pub uppercase: bool,
    pub lowercase: bool,
    pub numbers: bool,
    pub special_chars: bool,
}

impl PasswordCriteria {
    pub fn evaluate(value: &str) -> Self {
        Self {
            length: value.encode_utf16().count() >= PASSWORD_MIN_LENGTH,
            uppercase: value.chars().any(|c| c.is_ascii_uppercase()),
            lowercase: value.chars().any(|c| c.is_ascii_lowercase()),
            numbers: value.chars().any(|c| c.is_ascii_digit()),
            special_chars: value.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c)),
        }
    }

    /// Special characters are tracked but not required.
    pub fn is_valid(&self) -> bool {
        self.length && self.uppercase && self.lowercase && self.numbers
    }

    pub fn suggestions(&self) -> Vec<String> {
        let mut suggestions = Vec::new();
        if !self.length {
            suggestions.push("Use at least 8 characters".to_string());
        }
        if !self.uppercase {
            suggestions.push("Include uppercase letters".to_string());
        }
        if !self.lowercase {
            suggestions.push("Include lowercase letters".to_string());
        }
        if !self.numbers {
            suggestions.push("Include numbers".to_string());
        }
        if !self.special_chars {
            suggestions.push("Consider adding special characters for extra security".to_string());
        }
        suggestions
    }
}

/// Luhn checksum over the digits of `value`; non-digits are ignored.
pub fn luhn_valid(value: &str) -> bool {
    let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 13 || digits.len() > 19 {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

/// Outcome of applying one rule to one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub rule: RuleKind,
    pub valid: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<PasswordCriteria>,
}

#[derive(Debug, Clone)]
pub struct ValidationRuleSet {
    email: Regex,
    phone: Regex,
    url: Regex,
}

impl ValidationRuleSet {
    pub fn new() -> EngineResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| EngineError::Config(format!("rule pattern: {e}")))
        };
        Ok(Self {
            email: compile(EMAIL_PATTERN)?,
            phone: compile(PHONE_PATTERN)?,
            url: compile(URL_PATTERN)?,
        })
    }

    pub fn message(kind: RuleKind) -> &'static str {
        match kind {
            RuleKind::Email => "Please enter a valid email address",
            RuleKind::Phone => "Please enter a valid phone number",
            RuleKind::Url => "Please enter a valid URL",
            RuleKind::Password => {
                "Password must be at least 8 characters with uppercase, lowercase, and numbers"
            }
            RuleKind::CreditCard => "Please enter a valid credit card number",
        }
    }

    pub fn is_valid(&self, kind: RuleKind, value: &str) -> bool {
        match kind {
            RuleKind::Email => self.email.is_match(value),
            RuleKind::Phone => {
                let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
                self.phone.is_match(&compact)
            }
            RuleKind::Url => self.url.is_match(value),
            RuleKind::Password => PasswordCriteria::evaluate(value).is_valid(),
            RuleKind::CreditCard => luhn_valid(value),
        }
    }

    pub fn apply(&self, kind: RuleKind, value: &str) -> RuleOutcome {
        let (valid, suggestions, password) = match kind {
            RuleKind::Password => {
                let criteria = PasswordCriteria::evaluate(value);
                let suggestions = if criteria.is_valid() {
                    Vec::new()
                } else {
                    criteria.suggestions()
                };
                (criteria.is_valid(), suggestions, Some(criteria))
            }
            _ => (self.is_valid(kind, value), Vec::new(), None),
        };

        RuleOutcome {
            rule: kind,
            valid,
            message: if valid {
                String::new()
            } else {
                Self::message(kind).to_string()
            },
            suggestions,
            password,
        }
    }

    /// Apply a rule named by an external descriptor.
    pub fn apply_named(&self, rule: &str, value: &str) -> EngineResult<RuleOutcome> {
        Ok(self.apply(rule.parse()?, value))
    }
}
