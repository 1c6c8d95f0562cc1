//! Retained-mode element tree ("Toolkit") and its backend adapter.
//!
//! The tree is an arena of nodes. Panels are root containers; every other node
//! hangs off a panel. The host application owns the tree through
//! [`SharedToolkit`] and mutates it while the agent inspects.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::errors::{SentinelError, SentinelResult};
use crate::ui::traits::{should_report, UiBackend, UiControl};
use crate::ui::types::{ElementDescriptor, ElementKind, Rect, UiEvent, UiSystem};
use crate::ui::walk::{self, NodeId, PathCounter};

pub type SharedToolkit = Arc<RwLock<ToolkitTree>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PickingMode {
    #[default]
    Position,
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolkitKind {
    VisualElement,
    Label,
    Image,
    Button,
    TextField,
    Toggle,
    ScrollView,
    DropdownField,
    Slider,
}

impl ToolkitKind {
    /// Controls take pointer input by default; decoration does not.
    pub fn default_picking(self) -> PickingMode {
        match self {
            ToolkitKind::VisualElement | ToolkitKind::Label | ToolkitKind::Image => PickingMode::Ignore,
            _ => PickingMode::Position,
        }
    }

    fn element_kind(self) -> ElementKind {
        match self {
            ToolkitKind::VisualElement => ElementKind::Container,
            ToolkitKind::Label => ElementKind::Label,
            ToolkitKind::Image => ElementKind::Image,
            ToolkitKind::Button => ElementKind::Button,
            ToolkitKind::TextField => ElementKind::TextField,
            ToolkitKind::Toggle => ElementKind::Toggle,
            ToolkitKind::ScrollView => ElementKind::ScrollView,
            ToolkitKind::DropdownField => ElementKind::Dropdown,
            ToolkitKind::Slider => ElementKind::Slider,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolkitNode {
    #[serde(default)]
    pub name: Option<String>,
    pub kind: ToolkitKind,
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// `display: flex` when true, `display: none` when false.
    #[serde(default = "default_true")]
    pub displayed: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub picking: PickingMode,
    #[serde(default)]
    pub layout: Rect,
    /// Toggle state.
    #[serde(default)]
    pub checked: bool,
    /// Slider value or selected dropdown index.
    #[serde(default)]
    pub value: f32,
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub scroll_offset: f32,
    /// Total content height of a scroll view; the viewport is `layout.height`.
    #[serde(default)]
    pub content_height: f32,
    #[serde(skip)]
    pub events: Vec<UiEvent>,
    #[serde(skip)]
    parent: Option<NodeId>,
    #[serde(skip)]
    children: Vec<NodeId>,
}

fn default_true() -> bool {
    true
}

impl ToolkitNode {
    pub fn new(kind: ToolkitKind, name: Option<&str>) -> Self {
        Self {
            name: name.map(str::to_string),
            kind,
            text: String::new(),
            enabled: true,
            displayed: true,
            visible: true,
            picking: kind.default_picking(),
            layout: Rect::default(),
            checked: false,
            value: 0.0,
            choices: Vec::new(),
            scroll_offset: 0.0,
            content_height: 0.0,
            events: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn container(name: Option<&str>) -> Self {
        Self::new(ToolkitKind::VisualElement, name)
    }

    pub fn button(name: &str, text: &str) -> Self {
        Self::new(ToolkitKind::Button, Some(name)).with_text(text)
    }

    pub fn label(name: Option<&str>, text: &str) -> Self {
        Self::new(ToolkitKind::Label, name).with_text(text)
    }

    pub fn text_field(name: &str, value: &str) -> Self {
        Self::new(ToolkitKind::TextField, Some(name)).with_text(value)
    }

    pub fn toggle(name: &str, label: &str, checked: bool) -> Self {
        Self {
            checked,
            ..Self::new(ToolkitKind::Toggle, Some(name)).with_text(label)
        }
    }

    pub fn scroll_view(name: &str, viewport_height: f32, content_height: f32) -> Self {
        Self {
            content_height,
            layout: Rect::new(0.0, 0.0, 300.0, viewport_height),
            ..Self::new(ToolkitKind::ScrollView, Some(name))
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn at(mut self, layout: Rect) -> Self {
        self.layout = layout;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn not_displayed(mut self) -> Self {
        self.displayed = false;
        self
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    fn max_scroll(&self) -> f32 {
        (self.content_height - self.layout.height).max(0.0)
    }
}

/// Arena holding every panel and node.
#[derive(Debug, Default)]
pub struct ToolkitTree {
    nodes: Vec<ToolkitNode>,
    roots: Vec<NodeId>,
}

impl ToolkitTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> SharedToolkit {
        Arc::new(RwLock::new(self))
    }

    /// Adds a panel (root container).
    pub fn add_panel(&mut self, name: &str) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(ToolkitNode::container(Some(name)));
        self.roots.push(id);
        id
    }

    pub fn add_child(&mut self, parent: NodeId, mut node: ToolkitNode) -> NodeId {
        let id = self.nodes.len();
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(id);
        }
        id
    }

    /// Detaches a node (and with it its subtree) from its parent or the panel list.
    pub fn detach(&mut self, id: NodeId) {
        match self.nodes.get(id).and_then(|n| n.parent) {
            Some(parent) => self.nodes[parent].children.retain(|&c| c != id),
            None => self.roots.retain(|&r| r != id),
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&ToolkitNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut ToolkitNode> {
        self.nodes.get_mut(id)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    fn visits(&self, paths: &mut PathCounter) -> Vec<walk::Visit<Inherited>> {
        walk::depth_first(
            &self.roots,
            paths,
            |id| self.nodes[id].children.as_slice(),
            |id| self.nodes[id].name.as_deref(),
            |id, parent| {
                let node = &self.nodes[id];
                let parent = parent.copied().unwrap_or(Inherited::ROOT);
                Inherited {
                    displayed: parent.displayed && node.displayed,
                    visible: parent.visible && node.visible,
                    enabled: parent.enabled && node.enabled,
                }
            },
        )
    }
}

/// Effective flags after combining a node with its ancestors.
#[derive(Debug, Clone, Copy)]
struct Inherited {
    displayed: bool,
    visible: bool,
    enabled: bool,
}

impl Inherited {
    const ROOT: Inherited = Inherited {
        displayed: true,
        visible: true,
        enabled: true,
    };
}

fn read(tree: &SharedToolkit) -> RwLockReadGuard<'_, ToolkitTree> {
    tree.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(tree: &SharedToolkit) -> RwLockWriteGuard<'_, ToolkitTree> {
    tree.write().unwrap_or_else(PoisonError::into_inner)
}

pub struct ToolkitBackend {
    tree: SharedToolkit,
}

impl ToolkitBackend {
    pub fn new(tree: SharedToolkit) -> Self {
        Self { tree }
    }

    fn control(&self, visit: walk::Visit<Inherited>) -> Box<dyn UiControl> {
        Box::new(ToolkitControl {
            tree: Arc::clone(&self.tree),
            id: visit.id,
            path: visit.path,
            inherited: visit.inherited,
        })
    }
}

impl UiBackend for ToolkitBackend {
    fn system(&self) -> UiSystem {
        UiSystem::Toolkit
    }

    fn collect_into(&self, paths: &mut PathCounter) -> Vec<ElementDescriptor> {
        let tree = read(&self.tree);
        tree.visits(paths)
            .into_iter()
            .filter_map(|visit| {
                let node = &tree.nodes[visit.id];
                let kind = node.kind.element_kind();
                let visible = visit.inherited.displayed && visit.inherited.visible;
                let interactable = visible && node.picking == PickingMode::Position;
                if !should_report(kind, interactable, visible, &node.text) {
                    return None;
                }
                Some(ElementDescriptor {
                    name: node.name.clone().unwrap_or_default(),
                    kind,
                    ui_system: UiSystem::Toolkit,
                    path: visit.path,
                    text: node.text.clone(),
                    enabled: visit.inherited.enabled,
                    visible,
                    interactable,
                })
            })
            .collect()
    }

    fn resolve_exact(&self, path: &str, paths: &mut PathCounter) -> Option<Box<dyn UiControl>> {
        let tree = read(&self.tree);
        let visit = tree.visits(paths).into_iter().find(|v| v.path == path)?;
        Some(self.control(visit))
    }

    fn find_by_name(&self, name: &str, paths: &mut PathCounter) -> Option<Box<dyn UiControl>> {
        let tree = read(&self.tree);
        let visits = tree.visits(paths);
        let id = walk::breadth_first_by_name(
            &tree.roots,
            |id| tree.nodes[id].children.as_slice(),
            |id| tree.nodes[id].name.as_deref(),
            name,
        )?;
        let visit = visits.into_iter().find(|v| v.id == id)?;
        Some(self.control(visit))
    }
}

/// Adapter over one resolved Toolkit node.
struct ToolkitControl {
    tree: SharedToolkit,
    id: NodeId,
    path: String,
    inherited: Inherited,
}

impl ToolkitControl {
    fn with_node<R>(&self, f: impl FnOnce(&ToolkitNode) -> R) -> Option<R> {
        read(&self.tree).nodes.get(self.id).map(f)
    }

    fn with_node_mut<R>(&self, f: impl FnOnce(&mut ToolkitNode) -> R) -> SentinelResult<R> {
        write(&self.tree)
            .nodes
            .get_mut(self.id)
            .map(f)
            .ok_or_else(|| SentinelError::element_not_found(&self.path))
    }

    fn require_interactable(&self, action: &str) -> SentinelResult<()> {
        if !self.is_interactable() {
            return Err(SentinelError::unsupported(action, &self.path, "element is not interactable"));
        }
        if !self.is_enabled() {
            return Err(SentinelError::unsupported(action, &self.path, "element is disabled"));
        }
        Ok(())
    }
}

impl UiControl for ToolkitControl {
    fn path(&self) -> &str {
        &self.path
    }

    fn name(&self) -> String {
        self.with_node(|n| n.name.clone().unwrap_or_default())
            .unwrap_or_default()
    }

    fn ui_system(&self) -> UiSystem {
        UiSystem::Toolkit
    }

    fn kind(&self) -> ElementKind {
        self.with_node(|n| n.kind.element_kind())
            .unwrap_or(ElementKind::Container)
    }

    fn is_enabled(&self) -> bool {
        self.inherited.enabled && self.with_node(|n| n.enabled).unwrap_or(false)
    }

    fn is_visible(&self) -> bool {
        self.inherited.displayed && self.inherited.visible
    }

    fn is_interactable(&self) -> bool {
        self.is_visible()
            && self
                .with_node(|n| n.picking == PickingMode::Position)
                .unwrap_or(false)
    }

    fn text(&self) -> String {
        self.with_node(|n| n.text.clone()).unwrap_or_default()
    }

    fn value(&self) -> Option<serde_json::Value> {
        self.with_node(|n| match n.kind {
            ToolkitKind::Toggle => Some(serde_json::json!(n.checked)),
            ToolkitKind::Slider => Some(serde_json::json!(n.value)),
            ToolkitKind::DropdownField => Some(serde_json::json!({
                "index": n.value as usize,
                "choices": n.choices,
            })),
            ToolkitKind::ScrollView => Some(serde_json::json!(n.scroll_offset)),
            _ => None,
        })
        .flatten()
    }

    fn set_text(&self, text: &str) -> SentinelResult<()> {
        if self.kind() != ElementKind::TextField {
            return Err(SentinelError::unsupported("type_text", &self.path, "element is not a text field"));
        }
        self.require_interactable("type_text")?;
        self.with_node_mut(|n| {
            let previous = std::mem::replace(&mut n.text, text.to_string());
            n.events.push(UiEvent::ValueChanged {
                previous,
                value: text.to_string(),
            });
        })
    }

    fn invoke_click(&self) -> SentinelResult<()> {
        self.require_interactable("click")?;
        self.with_node_mut(|n| {
            let (x, y) = n.layout.center();
            n.events.push(UiEvent::PointerDown { x, y });
            n.events.push(UiEvent::PointerUp { x, y });
            n.events.push(UiEvent::Click { x, y });
            if n.kind == ToolkitKind::Toggle {
                n.checked = !n.checked;
            }
        })
    }

    fn scroll_by(&self, delta: f32) -> SentinelResult<()> {
        if self.kind() != ElementKind::ScrollView {
            return Err(SentinelError::unsupported("scroll", &self.path, "element is not a scroll container"));
        }
        self.require_interactable("scroll")?;
        self.with_node_mut(|n| {
            n.scroll_offset = (n.scroll_offset + delta).clamp(0.0, n.max_scroll());
            n.events.push(UiEvent::Scrolled {
                offset: n.scroll_offset,
            });
        })
    }
}
