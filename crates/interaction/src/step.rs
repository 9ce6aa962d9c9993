//! Step descriptors — the closed set of interaction kinds a sequence can
//! contain, and strict parsing of author-supplied step JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use webprobe_core::dom::{ScrollAlign, ScrollBehavior};
use webprobe_core::{EngineError, EngineResult};

/// Discriminant of a step, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepType {
    Click,
    Input,
    Scroll,
    Wait,
    WaitForElement,
    Screenshot,
    Validate,
    Custom,
}

impl StepType {
    pub const ALL: [StepType; 8] = [
        StepType::Click,
        StepType::Input,
        StepType::Scroll,
        StepType::Wait,
        StepType::WaitForElement,
        StepType::Screenshot,
        StepType::Validate,
        StepType::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Input => "input",
            Self::Scroll => "scroll",
            Self::Wait => "wait",
            Self::WaitForElement => "waitForElement",
            Self::Screenshot => "screenshot",
            Self::Validate => "validate",
            Self::Custom => "custom",
        }
    }

    pub fn parse(name: &str) -> EngineResult<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| EngineError::UnknownStepType(name.to_string()))
    }
}

impl std::fmt::Display for StepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickOptions {
    #[serde(default = "default_true")]
    pub scroll_into_view: bool,
}

impl Default for ClickOptions {
    fn default() -> Self {
        Self {
            scroll_into_view: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollStepOptions {
    #[serde(default = "default_true")]
    pub smooth: bool,
    #[serde(default)]
    pub block: ScrollAlign,
    /// Settle time after scrolling; the configured default when absent.
    #[serde(default)]
    pub wait_after: Option<u64>,
}

impl Default for ScrollStepOptions {
    fn default() -> Self {
        Self {
            smooth: true,
            block: ScrollAlign::Start,
            wait_after: None,
        }
    }
}

impl ScrollStepOptions {
    pub fn behavior(&self) -> ScrollBehavior {
        if self.smooth {
            ScrollBehavior::Smooth
        } else {
            ScrollBehavior::Auto
        }
    }
}

/// A selector or a viewport coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScrollTarget {
    Selector(String),
    Point {
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
    },
}

/// Assertion kinds for `validate` steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ElementAssertion {
    Exists,
    Visible,
    Text {
        #[serde(default)]
        equals: Option<String>,
        #[serde(default)]
        contains: Option<String>,
    },
    Value {
        #[serde(default)]
        equals: Option<String>,
    },
    Attribute {
        attribute: String,
        #[serde(default)]
        equals: Option<String>,
    },
}

impl ElementAssertion {
    pub const KINDS: [&'static str; 5] = ["exists", "visible", "text", "value", "attribute"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StepAction {
    Click {
        selector: String,
        #[serde(default)]
        options: ClickOptions,
    },
    Input {
        selector: String,
        value: String,
    },
    Scroll {
        target: ScrollTarget,
        #[serde(default)]
        options: ScrollStepOptions,
    },
    Wait {
        duration: u64,
    },
    WaitForElement {
        selector: String,
        #[serde(default)]
        timeout: Option<u64>,
    },
    Screenshot {
        #[serde(default)]
        options: Value,
    },
    Validate {
        selector: String,
        validation: ElementAssertion,
    },
    Custom {
        action: String,
        #[serde(default)]
        params: Value,
    },
}

impl StepAction {
    pub fn step_type(&self) -> StepType {
        match self {
            Self::Click { .. } => StepType::Click,
            Self::Input { .. } => StepType::Input,
            Self::Scroll { .. } => StepType::Scroll,
            Self::Wait { .. } => StepType::Wait,
            Self::WaitForElement { .. } => StepType::WaitForElement,
            Self::Screenshot { .. } => StepType::Screenshot,
            Self::Validate { .. } => StepType::Validate,
            Self::Custom { .. } => StepType::Custom,
        }
    }
}

/// One scripted interaction plus its sequencing metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Delay applied after the step when the sequence continues.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_after: Option<u64>,
    #[serde(flatten)]
    pub action: StepAction,
}

impl InteractionStep {
    pub fn new(action: StepAction) -> Self {
        Self {
            name: None,
            wait_after: None,
            action,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn wait_after(mut self, ms: u64) -> Self {
        self.wait_after = Some(ms);
        self
    }

    pub fn click(selector: impl Into<String>) -> Self {
        Self::new(StepAction::Click {
            selector: selector.into(),
            options: ClickOptions::default(),
        })
    }

    pub fn input(selector: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(StepAction::Input {
            selector: selector.into(),
            value: value.into(),
        })
    }

    pub fn wait(duration: u64) -> Self {
        Self::new(StepAction::Wait { duration })
    }

    pub fn wait_for_element(selector: impl Into<String>, timeout: Option<u64>) -> Self {
        Self::new(StepAction::WaitForElement {
            selector: selector.into(),
            timeout,
        })
    }

    pub fn validate(selector: impl Into<String>, validation: ElementAssertion) -> Self {
        Self::new(StepAction::Validate {
            selector: selector.into(),
            validation,
        })
    }

    pub fn custom(action: impl Into<String>) -> Self {
        Self::new(StepAction::Custom {
            action: action.into(),
            params: Value::Null,
        })
    }

    pub fn step_type(&self) -> StepType {
        self.action.step_type()
    }

    /// Display name: the author's, or `Step <n>` (1-based).
    pub fn display_name(&self, index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("Step {}", index + 1))
    }

    /// Parse an untrusted descriptor. The `type` and `validation.type`
    /// discriminants are checked before the payload is decoded.
    pub fn from_value(value: Value) -> EngineResult<Self> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| EngineError::UnknownStepType(describe(value.get("type"))))?;
        let kind = StepType::parse(kind)?;

        if kind == StepType::Validate {
            let validation = value
                .get("validation")
                .and_then(|v| v.get("type"))
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    EngineError::UnknownValidationType(describe(
                        value.get("validation").and_then(|v| v.get("type")),
                    ))
                })?;
            if !ElementAssertion::KINDS.contains(&validation) {
                return Err(EngineError::UnknownValidationType(validation.to_string()));
            }
        }

        Ok(serde_json::from_value(value)?)
    }
}

fn describe(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "<missing>".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_each_kind() {
        let steps = [
            json!({"type": "click", "selector": "#go"}),
            json!({"type": "input", "selector": "#q", "value": "rust"}),
            json!({"type": "scroll", "target": "#footer", "options": {"smooth": false, "block": "center"}}),
            json!({"type": "scroll", "target": {"x": 0, "y": 400}}),
            json!({"type": "wait", "duration": 250}),
            json!({"type": "waitForElement", "selector": ".toast", "timeout": 500}),
            json!({"type": "screenshot", "options": {"fullPage": true}}),
            json!({"type": "validate", "selector": "h1", "validation": {"type": "text", "contains": "Hi"}}),
            json!({"type": "custom", "action": "login", "name": "Log in", "waitAfter": 10}),
        ];
        let parsed: Vec<InteractionStep> = steps
            .into_iter()
            .map(|s| InteractionStep::from_value(s).unwrap())
            .collect();

        assert_eq!(parsed[0].step_type(), StepType::Click);
        assert!(matches!(
            &parsed[0].action,
            StepAction::Click { options, .. } if options.scroll_into_view
        ));
        assert!(matches!(
            &parsed[2].action,
            StepAction::Scroll { target: ScrollTarget::Selector(s), options }
                if s == "#footer" && !options.smooth && options.block == ScrollAlign::Center
        ));
        assert!(matches!(
            &parsed[3].action,
            StepAction::Scroll { target: ScrollTarget::Point { y, .. }, .. } if *y == 400.0
        ));
        assert_eq!(parsed[5].step_type(), StepType::WaitForElement);
        assert_eq!(parsed[8].name.as_deref(), Some("Log in"));
        assert_eq!(parsed[8].wait_after, Some(10));
    }

    #[test]
    fn test_unknown_step_type() {
        let err = InteractionStep::from_value(json!({"type": "hover", "selector": "a"})).unwrap_err();
        assert!(matches!(err, EngineError::UnknownStepType(ref t) if t == "hover"));

        let err = InteractionStep::from_value(json!({"selector": "a"})).unwrap_err();
        assert!(matches!(err, EngineError::UnknownStepType(_)));
    }

    #[test]
    fn test_unknown_validation_type() {
        let err = InteractionStep::from_value(json!({
            "type": "validate",
            "selector": "a",
            "validation": {"type": "color"}
        }))
        .unwrap_err();
        assert!(matches!(err, EngineError::UnknownValidationType(ref t) if t == "color"));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(InteractionStep::wait(5).display_name(2), "Step 3");
        assert_eq!(InteractionStep::wait(5).named("pause").display_name(2), "pause");
    }

    #[test]
    fn test_serialize_shape() {
        let v = serde_json::to_value(InteractionStep::wait_for_element(".x", None).wait_after(5)).unwrap();
        assert_eq!(v["type"], "waitForElement");
        assert_eq!(v["waitAfter"], 5);
    }
}
