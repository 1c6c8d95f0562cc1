use serde::{Deserialize, Serialize};

/// Which UI paradigm an element came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UiSystem {
    /// Retained-mode element tree.
    Toolkit,
    /// Scene-graph objects carrying widget components.
    Legacy,
}

/// Paradigms present in one inspection snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UiAggregate {
    None,
    Toolkit,
    Legacy,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Button,
    TextField,
    Toggle,
    ScrollView,
    Dropdown,
    Slider,
    Label,
    Image,
    Container,
}

impl ElementKind {
    /// The allow-list of semantically meaningful controls.
    pub fn is_control(&self) -> bool {
        matches!(
            self,
            ElementKind::Button
                | ElementKind::TextField
                | ElementKind::Toggle
                | ElementKind::ScrollView
                | ElementKind::Dropdown
                | ElementKind::Slider
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Synthetic events recorded on the element that received them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UiEvent {
    PointerDown { x: f32, y: f32 },
    PointerUp { x: f32, y: f32 },
    Click { x: f32, y: f32 },
    ValueChanged { previous: String, value: String },
    Scrolled { offset: f32 },
}

/// One discovered element. Recomputed on every inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub ui_system: UiSystem,
    pub path: String,
    pub text: String,
    pub enabled: bool,
    pub visible: bool,
    pub interactable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchySnapshot {
    pub ui_type: UiAggregate,
    pub toolkit_count: usize,
    pub legacy_count: usize,
    pub elements: Vec<ElementDescriptor>,
}

impl HierarchySnapshot {
    pub fn from_elements(elements: Vec<ElementDescriptor>) -> Self {
        let toolkit_count = elements
            .iter()
            .filter(|e| e.ui_system == UiSystem::Toolkit)
            .count();
        let legacy_count = elements.len() - toolkit_count;
        let ui_type = match (toolkit_count > 0, legacy_count > 0) {
            (true, true) => UiAggregate::Both,
            (true, false) => UiAggregate::Toolkit,
            (false, true) => UiAggregate::Legacy,
            (false, false) => UiAggregate::None,
        };
        Self {
            ui_type,
            toolkit_count,
            legacy_count,
            elements,
        }
    }
}

/// Detailed state of one element, resolved fresh on request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementState {
    pub path: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub ui_system: UiSystem,
    pub text: String,
    pub enabled: bool,
    pub visible: bool,
    pub interactable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}
