//! In-memory element tree. Backs headless runs from page fixtures and every
//! adapter-dependent test.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    DomEvent, ElementId, ElementSnapshot, ElementTree, Rect, ScrollBehavior, ScrollOptions,
    Selector, SubmitOutcome,
};
use crate::error::{EngineError, EngineResult};

/// Declarative description of one element and its subtree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementFixture {
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub checked: bool,
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// The element has an associated `<label>`.
    #[serde(default)]
    pub label: bool,
    #[serde(default)]
    pub rect: Rect,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub children: Vec<ElementFixture>,
}

fn default_visible() -> bool {
    true
}

impl ElementFixture {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            visible: true,
            ..Default::default()
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn labelled(mut self) -> Self {
        self.label = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn rect(mut self, left: f64, top: f64, width: f64, height: f64) -> Self {
        self.rect = Rect {
            left,
            top,
            width,
            height,
        };
        self
    }

    pub fn options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|o| o.to_string()).collect();
        self
    }

    pub fn child(mut self, child: ElementFixture) -> Self {
        self.children.push(child);
        self
    }
}

/// A whole page: top-level elements in document order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageFixture {
    #[serde(default)]
    pub url: Option<String>,
    pub elements: Vec<ElementFixture>,
}

/// One notification dispatched through the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub element: ElementId,
    pub event: DomEvent,
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<ElementId>,
    tag: String,
    attributes: BTreeMap<String, String>,
    value: String,
    default_value: String,
    text: String,
    checked: bool,
    default_checked: bool,
    visible: bool,
    label: bool,
    rect: Rect,
    options: Vec<String>,
    removed: bool,
}

#[derive(Debug, Default)]
struct TreeState {
    nodes: Vec<Node>,
    events: Vec<RecordedEvent>,
    focused: Option<ElementId>,
    viewport: (f64, f64),
    scrolled_into_view: Vec<ElementId>,
    submissions: Vec<ElementId>,
    detached: bool,
}

#[derive(Debug, Default)]
pub struct MemoryTree {
    state: RwLock<TreeState>,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(page: PageFixture) -> Self {
        let tree = Self::new();
        for element in page.elements {
            tree.insert(None, element);
        }
        tree
    }

    /// Insert `fixture` (and its children) under `parent`. Returns the new
    /// element's handle.
    pub fn insert(&self, parent: Option<ElementId>, fixture: ElementFixture) -> ElementId {
        let mut state = self.state.write();
        insert_node(&mut state, parent, fixture)
    }

    /// Remove an element and its subtree from the document.
    pub fn remove(&self, id: ElementId) {
        let mut state = self.state.write();
        let doomed: Vec<ElementId> = (0..state.nodes.len() as u64)
            .map(ElementId)
            .filter(|&candidate| is_self_or_descendant(&state, candidate, id))
            .collect();
        for node in doomed {
            state.nodes[node.0 as usize].removed = true;
        }
    }

    pub fn set_visible(&self, id: ElementId, visible: bool) {
        if let Some(node) = self.state.write().nodes.get_mut(id.0 as usize) {
            node.visible = visible;
        }
    }

    pub fn set_attribute(&self, id: ElementId, name: &str, value: &str) {
        if let Some(node) = self.state.write().nodes.get_mut(id.0 as usize) {
            node.attributes.insert(name.to_string(), value.to_string());
        }
    }

    /// Simulate the page going away; every later call fails.
    pub fn detach(&self) {
        self.state.write().detached = true;
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.state.read().events.clone()
    }

    pub fn events_for(&self, id: ElementId) -> Vec<DomEvent> {
        self.state
            .read()
            .events
            .iter()
            .filter(|e| e.element == id)
            .map(|e| e.event)
            .collect()
    }

    pub fn value_of(&self, id: ElementId) -> Option<String> {
        self.state
            .read()
            .nodes
            .get(id.0 as usize)
            .map(|n| n.value.clone())
    }

    pub fn focused(&self) -> Option<ElementId> {
        self.state.read().focused
    }

    pub fn viewport(&self) -> (f64, f64) {
        self.state.read().viewport
    }

    pub fn scrolled_into_view(&self) -> Vec<ElementId> {
        self.state.read().scrolled_into_view.clone()
    }

    pub fn submissions(&self) -> Vec<ElementId> {
        self.state.read().submissions.clone()
    }

    fn with_node_mut<T>(
        &self,
        id: ElementId,
        f: impl FnOnce(&mut TreeState, ElementId) -> T,
    ) -> EngineResult<T> {
        let mut state = self.state.write();
        check_attached(&state)?;
        live_node(&state, id)?;
        Ok(f(&mut state, id))
    }

    fn matching(&self, scope: Option<ElementId>, selector: &str) -> EngineResult<Vec<ElementId>> {
        let selector = Selector::parse(selector)?;
        let state = self.state.read();
        check_attached(&state)?;
        if let Some(scope) = scope {
            live_node(&state, scope)?;
        }

        Ok(document_order(&state)
            .into_iter()
            .filter(|&id| {
                let node = &state.nodes[id.0 as usize];
                let in_scope = match scope {
                    Some(scope) => id != scope && is_self_or_descendant(&state, id, scope),
                    None => true,
                };
                in_scope && selector.matches(&node.tag, &node.attributes)
            })
            .collect())
    }
}

fn insert_node(state: &mut TreeState, parent: Option<ElementId>, fixture: ElementFixture) -> ElementId {
    let id = ElementId(state.nodes.len() as u64);
    state.nodes.push(Node {
        parent,
        tag: fixture.tag.to_ascii_lowercase(),
        attributes: fixture.attributes,
        default_value: fixture.value.clone(),
        value: fixture.value,
        text: fixture.text,
        default_checked: fixture.checked,
        checked: fixture.checked,
        visible: fixture.visible,
        label: fixture.label,
        rect: fixture.rect,
        options: fixture.options,
        removed: false,
    });
    for child in fixture.children {
        insert_node(state, Some(id), child);
    }
    id
}

fn check_attached(state: &TreeState) -> EngineResult<()> {
    if state.detached {
        Err(EngineError::TargetDetached("document is no longer attached".into()))
    } else {
        Ok(())
    }
}

fn live_node(state: &TreeState, id: ElementId) -> EngineResult<&Node> {
    state
        .nodes
        .get(id.0 as usize)
        .filter(|n| !n.removed)
        .ok_or_else(|| EngineError::Adapter(format!("stale element handle {}", id.0)))
}

fn is_self_or_descendant(state: &TreeState, candidate: ElementId, ancestor: ElementId) -> bool {
    let mut cursor = Some(candidate);
    while let Some(id) = cursor {
        if id == ancestor {
            return true;
        }
        cursor = state.nodes[id.0 as usize].parent;
    }
    false
}

/// Pre-order traversal; insertion order among siblings.
fn document_order(state: &TreeState) -> Vec<ElementId> {
    fn visit(state: &TreeState, parent: Option<ElementId>, out: &mut Vec<ElementId>) {
        for (idx, node) in state.nodes.iter().enumerate() {
            if node.parent == parent && !node.removed {
                let id = ElementId(idx as u64);
                out.push(id);
                visit(state, Some(id), out);
            }
        }
    }
    let mut out = Vec::with_capacity(state.nodes.len());
    visit(state, None, &mut out);
    out
}

fn effectively_visible(state: &TreeState, id: ElementId) -> bool {
    let mut cursor = Some(id);
    while let Some(current) = cursor {
        let node = &state.nodes[current.0 as usize];
        if !node.visible {
            return false;
        }
        cursor = node.parent;
    }
    true
}

#[async_trait]
impl ElementTree for MemoryTree {
    async fn resolve(&self, selector: &str) -> EngineResult<Option<ElementId>> {
        Ok(self.matching(None, selector)?.into_iter().next())
    }

    async fn resolve_all(&self, selector: &str) -> EngineResult<Vec<ElementId>> {
        self.matching(None, selector)
    }

    async fn query_within(
        &self,
        scope: ElementId,
        selector: &str,
    ) -> EngineResult<Vec<ElementId>> {
        self.matching(Some(scope), selector)
    }

    async fn snapshot(&self, id: ElementId) -> EngineResult<ElementSnapshot> {
        let state = self.state.read();
        check_attached(&state)?;
        let node = live_node(&state, id)?;
        Ok(ElementSnapshot {
            tag: node.tag.clone(),
            value: node.value.clone(),
            text: node.text.clone(),
            checked: node.checked,
            visible: effectively_visible(&state, id),
            has_label: node.label,
            rect: node.rect,
            attributes: node.attributes.clone(),
            options: node.options.clone(),
        })
    }

    async fn set_value(&self, id: ElementId, value: &str) -> EngineResult<()> {
        self.with_node_mut(id, |state, id| {
            state.nodes[id.0 as usize].value = value.to_string();
        })
    }

    async fn set_checked(&self, id: ElementId, checked: bool) -> EngineResult<()> {
        self.with_node_mut(id, |state, id| {
            state.nodes[id.0 as usize].checked = checked;
        })
    }

    async fn focus(&self, id: ElementId) -> EngineResult<()> {
        self.with_node_mut(id, |state, id| state.focused = Some(id))
    }

    async fn blur(&self, id: ElementId) -> EngineResult<()> {
        self.with_node_mut(id, |state, id| {
            if state.focused == Some(id) {
                state.focused = None;
            }
        })
    }

    async fn dispatch(&self, id: ElementId, event: DomEvent) -> EngineResult<()> {
        debug!(element = id.0, event = event.name(), "dispatch");
        self.with_node_mut(id, |state, element| {
            state.events.push(RecordedEvent { element, event });
        })
    }

    async fn scroll_into_view(&self, id: ElementId, _options: ScrollOptions) -> EngineResult<()> {
        self.with_node_mut(id, |state, id| {
            let rect = state.nodes[id.0 as usize].rect;
            state.viewport = (rect.left, rect.top);
            state.scrolled_into_view.push(id);
        })
    }

    async fn scroll_viewport(
        &self,
        x: f64,
        y: f64,
        _behavior: ScrollBehavior,
    ) -> EngineResult<()> {
        let mut state = self.state.write();
        check_attached(&state)?;
        state.viewport = (x, y);
        Ok(())
    }

    async fn submit_form(&self, form: ElementId) -> EngineResult<SubmitOutcome> {
        let controls = self.matching(
            Some(form),
            "button, input[type=\"submit\"], input[type=\"image\"]",
        )?;
        let mut state = self.state.write();
        check_attached(&state)?;
        // A submit notification only fires when a submit control exists;
        // programmatic submission bypasses it.
        let has_submit_control = controls.iter().any(|&id| {
            let node = &state.nodes[id.0 as usize];
            node.tag != "button"
                || matches!(node.attributes.get("type").map(String::as_str), None | Some("submit"))
        });
        let prevented = state.nodes[form.0 as usize]
            .attributes
            .contains_key("data-prevent-submit");
        state.submissions.push(form);
        Ok(SubmitOutcome {
            captured: has_submit_control,
            prevented: has_submit_control && prevented,
        })
    }

    async fn reset_form(&self, form: ElementId) -> EngineResult<()> {
        let fields = self.matching(Some(form), "input, textarea, select")?;
        let mut state = self.state.write();
        check_attached(&state)?;
        for id in fields {
            let node = &mut state.nodes[id.0 as usize];
            node.value = node.default_value.clone();
            node.checked = node.default_checked;
        }
        Ok(())
    }
}
