//! Element-tree adapter — the narrow capability set the engine uses to read
//! and mutate the page under test.
//!
//! The engine is written against [`ElementTree`] only. [`MemoryTree`] is an
//! in-process implementation used for headless runs and tests; a browser
//! driver implements the same trait.

mod memory;
mod selector;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;

pub use memory::{ElementFixture, MemoryTree, PageFixture, RecordedEvent};
pub use selector::Selector;

/// Opaque handle to an element inside one [`ElementTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

/// Element geometry in viewport coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn center(&self) -> (f64, f64) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }
}

/// Read-only view of an element at one point in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub tag: String,
    pub value: String,
    pub text: String,
    pub checked: bool,
    pub visible: bool,
    pub has_label: bool,
    pub rect: Rect,
    pub attributes: BTreeMap<String, String>,
    /// Option values, for `select` elements.
    #[serde(default)]
    pub options: Vec<String>,
}

impl ElementSnapshot {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.attribute("name").filter(|n| !n.is_empty())
    }

    pub fn dom_id(&self) -> Option<&str> {
        self.attribute("id").filter(|n| !n.is_empty())
    }

    /// `name`, falling back to `id`, falling back to empty.
    pub fn field_key(&self) -> &str {
        self.name().or_else(|| self.dom_id()).unwrap_or("")
    }

    /// Declared input type. Non-input controls report their tag.
    pub fn input_type(&self) -> &str {
        match self.tag.as_str() {
            "input" => self.attribute("type").unwrap_or("text"),
            "select" => "select-one",
            other => other,
        }
    }

    pub fn required(&self) -> bool {
        self.attributes.contains_key("required")
    }

    pub fn pattern(&self) -> Option<&str> {
        self.attribute("pattern").filter(|p| !p.is_empty())
    }

    pub fn title(&self) -> Option<&str> {
        self.attribute("title").filter(|t| !t.is_empty())
    }

    pub fn min_length(&self) -> Option<usize> {
        self.attribute("minlength").and_then(|v| v.parse().ok())
    }

    pub fn max_length(&self) -> Option<usize> {
        self.attribute("maxlength").and_then(|v| v.parse().ok())
    }

    pub fn is_form_control(&self) -> bool {
        matches!(self.tag.as_str(), "input" | "textarea" | "select")
    }
}

/// Notifications dispatched against an element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DomEvent {
    MouseDown { x: f64, y: f64 },
    MouseUp { x: f64, y: f64 },
    Click { x: f64, y: f64 },
    Input,
    KeyUp,
    Change,
}

impl DomEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MouseDown { .. } => "mousedown",
            Self::MouseUp { .. } => "mouseup",
            Self::Click { .. } => "click",
            Self::Input => "input",
            Self::KeyUp => "keyup",
            Self::Change => "change",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollBehavior {
    #[default]
    Smooth,
    Auto,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollAlign {
    #[default]
    Start,
    Center,
    End,
    Nearest,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollOptions {
    pub behavior: ScrollBehavior,
    pub block: ScrollAlign,
}

/// What happened when a form submission was requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    /// A submit notification was observed.
    pub captured: bool,
    /// The page cancelled the default submission.
    pub prevented: bool,
}

#[async_trait]
pub trait ElementTree: Send + Sync {
    /// First element matching `selector`, in document order.
    async fn resolve(&self, selector: &str) -> EngineResult<Option<ElementId>>;

    /// Every element matching `selector`, in document order.
    async fn resolve_all(&self, selector: &str) -> EngineResult<Vec<ElementId>>;

    /// Descendants of `scope` matching `selector`, in document order.
    async fn query_within(&self, scope: ElementId, selector: &str)
        -> EngineResult<Vec<ElementId>>;

    async fn snapshot(&self, id: ElementId) -> EngineResult<ElementSnapshot>;

    /// The input, textarea and select descendants of a form, in declaration order.
    async fn form_fields(&self, form: ElementId) -> EngineResult<Vec<ElementId>> {
        self.query_within(form, "input, textarea, select").await
    }

    async fn set_value(&self, id: ElementId, value: &str) -> EngineResult<()>;

    async fn set_checked(&self, id: ElementId, checked: bool) -> EngineResult<()>;

    async fn focus(&self, id: ElementId) -> EngineResult<()>;

    async fn blur(&self, id: ElementId) -> EngineResult<()>;

    async fn dispatch(&self, id: ElementId, event: DomEvent) -> EngineResult<()>;

    async fn scroll_into_view(&self, id: ElementId, options: ScrollOptions) -> EngineResult<()>;

    async fn scroll_viewport(&self, x: f64, y: f64, behavior: ScrollBehavior)
        -> EngineResult<()>;

    async fn submit_form(&self, form: ElementId) -> EngineResult<SubmitOutcome>;

    async fn reset_form(&self, form: ElementId) -> EngineResult<()>;
}

/// Optional screenshot collaborator.
#[async_trait]
pub trait ScreenshotCapture: Send + Sync {
    /// Capture the page and return an opaque reference to the image.
    async fn capture(&self, options: &serde_json::Value) -> EngineResult<String>;
}
