//! Legacy scene-graph widgets.
//!
//! Scene objects are generic nodes; what an object *is* comes from the
//! components attached to it. The adapter discovers capabilities by probing
//! for components, never by the object's name.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::errors::{SentinelError, SentinelResult};
use crate::ui::traits::{should_report, UiBackend, UiControl};
use crate::ui::types::{ElementDescriptor, ElementKind, UiEvent, UiSystem};
use crate::ui::walk::{self, NodeId, PathCounter};

pub type SharedScene = Arc<RwLock<SceneGraph>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "component", rename_all = "snake_case")]
pub enum Component {
    /// Marks a root container.
    Canvas,
    CanvasGroup {
        alpha: f32,
        interactable: bool,
    },
    /// Any drawable; only raycast targets receive pointer input.
    Graphic {
        raycast_target: bool,
    },
    Text {
        text: String,
        #[serde(default)]
        raycast_target: bool,
    },
    Button {
        #[serde(default = "default_true")]
        interactable: bool,
        #[serde(default)]
        clicks: u32,
    },
    Toggle {
        #[serde(default = "default_true")]
        interactable: bool,
        #[serde(default)]
        is_on: bool,
    },
    InputField {
        #[serde(default = "default_true")]
        interactable: bool,
        #[serde(default)]
        text: String,
    },
    /// `vertical_position` is normalized: 1.0 = top, 0.0 = bottom.
    ScrollRect {
        #[serde(default = "default_one")]
        vertical_position: f32,
        content_height: f32,
        viewport_height: f32,
    },
    Dropdown {
        #[serde(default = "default_true")]
        interactable: bool,
        #[serde(default)]
        options: Vec<String>,
        #[serde(default)]
        value: usize,
    },
    Slider {
        #[serde(default = "default_true")]
        interactable: bool,
        #[serde(default)]
        value: f32,
    },
    /// Generic pointer-click receiver without a dedicated widget.
    PointerClickHandler {
        #[serde(default)]
        clicks: u32,
    },
}

fn default_true() -> bool {
    true
}

fn default_one() -> f32 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    #[serde(default = "default_true")]
    pub active_self: bool,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(skip)]
    pub events: Vec<UiEvent>,
    #[serde(skip)]
    parent: Option<NodeId>,
    #[serde(skip)]
    children: Vec<NodeId>,
}

impl SceneObject {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            active_self: true,
            components: Vec::new(),
            events: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn button(name: &str) -> Self {
        Self::new(name)
            .with(Component::Graphic {
                raycast_target: true,
            })
            .with(Component::Button {
                interactable: true,
                clicks: 0,
            })
    }

    pub fn text(name: &str, text: &str) -> Self {
        Self::new(name).with(Component::Text {
            text: text.to_string(),
            raycast_target: false,
        })
    }

    pub fn input_field(name: &str, text: &str) -> Self {
        Self::new(name)
            .with(Component::Graphic {
                raycast_target: true,
            })
            .with(Component::InputField {
                interactable: true,
                text: text.to_string(),
            })
    }

    pub fn toggle(name: &str, is_on: bool) -> Self {
        Self::new(name)
            .with(Component::Graphic {
                raycast_target: true,
            })
            .with(Component::Toggle {
                interactable: true,
                is_on,
            })
    }

    pub fn scroll_rect(name: &str, viewport_height: f32, content_height: f32) -> Self {
        Self::new(name)
            .with(Component::Graphic {
                raycast_target: true,
            })
            .with(Component::ScrollRect {
                vertical_position: 1.0,
                content_height,
                viewport_height,
            })
    }

    pub fn inactive(mut self) -> Self {
        self.active_self = false;
        self
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    fn raycast_target(&self) -> bool {
        self.components.iter().any(|c| {
            matches!(
                c,
                Component::Graphic {
                    raycast_target: true
                } | Component::Text {
                    raycast_target: true,
                    ..
                }
            )
        })
    }

    /// Capability probe, most specific widget first.
    fn kind(&self) -> ElementKind {
        let has = |pred: fn(&Component) -> bool| self.components.iter().any(pred);
        if has(|c| matches!(c, Component::InputField { .. })) {
            ElementKind::TextField
        } else if has(|c| matches!(c, Component::Toggle { .. })) {
            ElementKind::Toggle
        } else if has(|c| matches!(c, Component::Dropdown { .. })) {
            ElementKind::Dropdown
        } else if has(|c| matches!(c, Component::Slider { .. })) {
            ElementKind::Slider
        } else if has(|c| matches!(c, Component::ScrollRect { .. })) {
            ElementKind::ScrollView
        } else if has(|c| matches!(c, Component::Button { .. } | Component::PointerClickHandler { .. })) {
            ElementKind::Button
        } else if has(|c| matches!(c, Component::Text { .. })) {
            ElementKind::Label
        } else if has(|c| matches!(c, Component::Graphic { .. })) {
            ElementKind::Image
        } else {
            ElementKind::Container
        }
    }

    /// `interactable` flag of the widget component, true when it has none.
    fn widget_interactable(&self) -> bool {
        self.components.iter().all(|c| match c {
            Component::Button { interactable, .. }
            | Component::Toggle { interactable, .. }
            | Component::InputField { interactable, .. }
            | Component::Dropdown { interactable, .. }
            | Component::Slider { interactable, .. } => *interactable,
            _ => true,
        })
    }

    fn own_text(&self) -> Option<String> {
        self.components.iter().find_map(|c| match c {
            Component::InputField { text, .. } | Component::Text { text, .. } => Some(text.clone()),
            _ => None,
        })
    }
}

/// Arena holding every scene object. Objects carrying a `Canvas` component are
/// added as roots via [`SceneGraph::add_canvas`].
#[derive(Debug, Default)]
pub struct SceneGraph {
    objects: Vec<SceneObject>,
    roots: Vec<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> SharedScene {
        Arc::new(RwLock::new(self))
    }

    pub fn add_canvas(&mut self, name: &str) -> NodeId {
        let id = self.objects.len();
        self.objects.push(SceneObject::new(name).with(Component::Canvas));
        self.roots.push(id);
        id
    }

    pub fn add_child(&mut self, parent: NodeId, mut object: SceneObject) -> NodeId {
        let id = self.objects.len();
        object.parent = Some(parent);
        object.children.clear();
        self.objects.push(object);
        if let Some(p) = self.objects.get_mut(parent) {
            p.children.push(id);
        }
        id
    }

    pub fn set_active(&mut self, id: NodeId, active: bool) {
        if let Some(obj) = self.objects.get_mut(id) {
            obj.active_self = active;
        }
    }

    pub fn object(&self, id: NodeId) -> Option<&SceneObject> {
        self.objects.get(id)
    }

    pub fn object_mut(&mut self, id: NodeId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// First text found on the object or, depth-first, its descendants.
    fn display_text(&self, id: NodeId) -> String {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let obj = &self.objects[current];
            if let Some(text) = obj.own_text() {
                return text;
            }
            stack.extend(obj.children.iter().rev().copied());
        }
        String::new()
    }

    fn visits(&self, paths: &mut PathCounter) -> Vec<walk::Visit<Inherited>> {
        walk::depth_first(
            &self.roots,
            paths,
            |id| self.objects[id].children.as_slice(),
            |id| Some(self.objects[id].name.as_str()),
            |id, parent| {
                let obj = &self.objects[id];
                let mut state = parent.copied().unwrap_or(Inherited::ROOT);
                state.active = state.active && obj.active_self;
                for c in &obj.components {
                    if let Component::CanvasGroup {
                        alpha,
                        interactable,
                    } = c
                    {
                        state.alpha *= alpha.clamp(0.0, 1.0);
                        state.group_interactable = state.group_interactable && *interactable;
                    }
                }
                state
            },
        )
    }
}

/// Effective state after combining an object with its ancestors.
#[derive(Debug, Clone, Copy)]
struct Inherited {
    active: bool,
    alpha: f32,
    group_interactable: bool,
}

impl Inherited {
    const ROOT: Inherited = Inherited {
        active: true,
        alpha: 1.0,
        group_interactable: true,
    };

    fn visible(&self) -> bool {
        self.active && self.alpha > 0.0
    }
}

fn read(scene: &SharedScene) -> RwLockReadGuard<'_, SceneGraph> {
    scene.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(scene: &SharedScene) -> RwLockWriteGuard<'_, SceneGraph> {
    scene.write().unwrap_or_else(PoisonError::into_inner)
}

pub struct LegacyBackend {
    scene: SharedScene,
}

impl LegacyBackend {
    pub fn new(scene: SharedScene) -> Self {
        Self { scene }
    }

    fn control(&self, visit: walk::Visit<Inherited>) -> Box<dyn UiControl> {
        Box::new(LegacyControl {
            scene: Arc::clone(&self.scene),
            id: visit.id,
            path: visit.path,
            inherited: visit.inherited,
        })
    }
}

impl UiBackend for LegacyBackend {
    fn system(&self) -> UiSystem {
        UiSystem::Legacy
    }

    fn collect_into(&self, paths: &mut PathCounter) -> Vec<ElementDescriptor> {
        let scene = read(&self.scene);
        scene
            .visits(paths)
            .into_iter()
            .filter_map(|visit| {
                let obj = &scene.objects[visit.id];
                let kind = obj.kind();
                let visible = visit.inherited.visible();
                let interactable = visible && obj.raycast_target();
                let text = if kind == ElementKind::Label {
                    obj.own_text().unwrap_or_default()
                } else {
                    scene.display_text(visit.id)
                };
                if !should_report(kind, interactable, visible, &text) {
                    return None;
                }
                Some(ElementDescriptor {
                    name: obj.name.clone(),
                    kind,
                    ui_system: UiSystem::Legacy,
                    path: visit.path,
                    text,
                    enabled: visit.inherited.group_interactable && obj.widget_interactable(),
                    visible,
                    interactable,
                })
            })
            .collect()
    }

    fn resolve_exact(&self, path: &str, paths: &mut PathCounter) -> Option<Box<dyn UiControl>> {
        let scene = read(&self.scene);
        let visit = scene.visits(paths).into_iter().find(|v| v.path == path)?;
        Some(self.control(visit))
    }

    fn find_by_name(&self, name: &str, paths: &mut PathCounter) -> Option<Box<dyn UiControl>> {
        let scene = read(&self.scene);
        let visits = scene.visits(paths);
        let id = walk::breadth_first_by_name(
            &scene.roots,
            |id| scene.objects[id].children.as_slice(),
            |id| Some(scene.objects[id].name.as_str()),
            name,
        )?;
        let visit = visits.into_iter().find(|v| v.id == id)?;
        Some(self.control(visit))
    }
}

/// Adapter over one resolved scene object.
struct LegacyControl {
    scene: SharedScene,
    id: NodeId,
    path: String,
    inherited: Inherited,
}

impl LegacyControl {
    fn with_object<R>(&self, f: impl FnOnce(&SceneObject) -> R) -> Option<R> {
        read(&self.scene).objects.get(self.id).map(f)
    }

    fn with_object_mut<R>(&self, f: impl FnOnce(&mut SceneObject) -> R) -> SentinelResult<R> {
        write(&self.scene)
            .objects
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

impl UiControl for LegacyControl {
    fn path(&self) -> &str {
        &self.path
    }

    fn name(&self) -> String {
        self.with_object(|o| o.name.clone()).unwrap_or_default()
    }

    fn ui_system(&self) -> UiSystem {
        UiSystem::Legacy
    }

    fn kind(&self) -> ElementKind {
        self.with_object(SceneObject::kind)
            .unwrap_or(ElementKind::Container)
    }

    fn is_enabled(&self) -> bool {
        self.inherited.group_interactable
            && self
                .with_object(SceneObject::widget_interactable)
                .unwrap_or(false)
    }

    fn is_visible(&self) -> bool {
        self.inherited.visible()
    }

    fn is_interactable(&self) -> bool {
        self.is_visible()
            && self
                .with_object(SceneObject::raycast_target)
                .unwrap_or(false)
    }

    fn text(&self) -> String {
        read(&self.scene).display_text(self.id)
    }

    fn value(&self) -> Option<serde_json::Value> {
        self.with_object(|o| {
            o.components.iter().find_map(|c| match c {
                Component::Toggle { is_on, .. } => Some(serde_json::json!(is_on)),
                Component::Slider { value, .. } => Some(serde_json::json!(value)),
                Component::Dropdown { options, value, .. } => Some(serde_json::json!({
                    "index": value,
                    "choices": options,
                })),
                Component::ScrollRect {
                    vertical_position, ..
                } => Some(serde_json::json!(vertical_position)),
                _ => None,
            })
        })
        .flatten()
    }

    fn set_text(&self, text: &str) -> SentinelResult<()> {
        if self.kind() != ElementKind::TextField {
            return Err(SentinelError::unsupported("type_text", &self.path, "element has no input field"));
        }
        self.require_interactable("type_text")?;
        self.with_object_mut(|o| {
            let mut changed = None;
            for c in o.components.iter_mut() {
                if let Component::InputField { text: current, .. } = c {
                    changed = Some(std::mem::replace(current, text.to_string()));
                    break;
                }
            }
            if let Some(previous) = changed {
                o.events.push(UiEvent::ValueChanged {
                    previous,
                    value: text.to_string(),
                });
            }
        })
    }

    fn invoke_click(&self) -> SentinelResult<()> {
        self.require_interactable("click")?;
        let handled = self.with_object_mut(|o| {
            // Explicit widget handlers first, generic pointer receiver last.
            let mut handled = false;
            for c in o.components.iter_mut() {
                match c {
                    Component::Button { clicks, .. } => {
                        *clicks += 1;
                        handled = true;
                        break;
                    }
                    Component::Toggle { is_on, .. } => {
                        *is_on = !*is_on;
                        handled = true;
                        break;
                    }
                    _ => {}
                }
            }
            if !handled {
                for c in o.components.iter_mut() {
                    if let Component::PointerClickHandler { clicks } = c {
                        *clicks += 1;
                        handled = true;
                        break;
                    }
                }
            }
            if handled {
                o.events.push(UiEvent::Click { x: 0.0, y: 0.0 });
            }
            handled
        })?;

        if handled {
            Ok(())
        } else {
            Err(SentinelError::unsupported("click", &self.path, "no click handler on element"))
        }
    }

    fn scroll_by(&self, delta: f32) -> SentinelResult<()> {
        if self.kind() != ElementKind::ScrollView {
            return Err(SentinelError::unsupported("scroll", &self.path, "element has no scroll rect"));
        }
        self.require_interactable("scroll")?;
        self.with_object_mut(|o| {
            let mut offset = None;
            for c in o.components.iter_mut() {
                if let Component::ScrollRect {
                    vertical_position,
                    content_height,
                    viewport_height,
                } = c
                {
                    let extent = *content_height - *viewport_height;
                    if extent > 0.0 {
                        *vertical_position = (*vertical_position - delta / extent).clamp(0.0, 1.0);
                    }
                    offset = Some(*vertical_position);
                    break;
                }
            }
            if let Some(offset) = offset {
                o.events.push(UiEvent::Scrolled { offset });
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hud() -> (SharedScene, NodeId, NodeId, NodeId) {
        let mut scene = SceneGraph::new();
        let canvas = scene.add_canvas("HUD");
        let pause = scene.add_child(canvas, SceneObject::button("PauseButton"));
        scene.add_child(pause, SceneObject::text("Label", "Pause"));
        scene.add_child(canvas, SceneObject::text("Score", "Score: 10"));
        let hidden_group = scene.add_child(
            canvas,
            SceneObject::new("Faded").with(Component::CanvasGroup {
                alpha: 0.0,
                interactable: true,
            }),
        );
        scene.add_child(hidden_group, SceneObject::button("Ghost"));
        let list = scene.add_child(canvas, SceneObject::scroll_rect("Inventory", 100.0, 500.0));
        let banner = scene.add_child(
            canvas,
            SceneObject::new("Banner")
                .with(Component::Graphic {
                    raycast_target: true,
                })
                .with(Component::PointerClickHandler { clicks: 0 }),
        );
        (scene.into_shared(), pause, list, banner)
    }

    #[test]
    fn collect_uses_component_probing_and_alpha() {
        let (scene, ..) = hud();
        let backend = LegacyBackend::new(scene);
        let elements = backend.collect();
        let summary: Vec<(&str, ElementKind, &str)> = elements
            .iter()
            .map(|e| (e.path.as_str(), e.kind, e.text.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("HUD/PauseButton", ElementKind::Button, "Pause"),
                ("HUD/PauseButton/Label", ElementKind::Label, "Pause"),
                ("HUD/Score", ElementKind::Label, "Score: 10"),
                ("HUD/Inventory", ElementKind::ScrollView, ""),
                ("HUD/Banner", ElementKind::Button, ""),
            ]
        );
        assert!(elements.iter().all(|e| e.ui_system == UiSystem::Legacy));
    }

    #[test]
    fn inactive_parent_blocks_click() {
        let (scene, pause, ..) = hud();
        let backend = LegacyBackend::new(scene.clone());
        scene.write().unwrap().set_active(pause, false);
        let control = backend.resolve("HUD/PauseButton").unwrap();
        let err = control.invoke_click().unwrap_err();
        assert!(matches!(err, SentinelError::ActionUnsupported { .. }));
    }

    #[test]
    fn button_click_invokes_handler() {
        let (scene, pause, ..) = hud();
        let backend = LegacyBackend::new(scene.clone());
        backend.resolve("PauseButton").unwrap().invoke_click().unwrap();
        let s = scene.read().unwrap();
        assert!(s
            .object(pause)
            .unwrap()
            .components
            .contains(&Component::Button {
                interactable: true,
                clicks: 1
            }));
    }

    #[test]
    fn generic_pointer_handler_is_the_fallback() {
        let (scene, _, _, banner) = hud();
        let backend = LegacyBackend::new(scene.clone());
        backend.resolve("HUD/Banner").unwrap().invoke_click().unwrap();
        let s = scene.read().unwrap();
        assert!(s
            .object(banner)
            .unwrap()
            .components
            .contains(&Component::PointerClickHandler { clicks: 1 }));
    }

    #[test]
    fn disabled_button_is_a_defined_failure() {
        let mut scene = SceneGraph::new();
        let canvas = scene.add_canvas("Menu");
        scene.add_child(
            canvas,
            SceneObject::new("Buy")
                .with(Component::Graphic {
                    raycast_target: true,
                })
                .with(Component::Button {
                    interactable: false,
                    clicks: 0,
                }),
        );
        let backend = LegacyBackend::new(scene.into_shared());
        let control = backend.resolve("Menu/Buy").unwrap();
        assert!(!control.is_enabled());
        assert!(control.invoke_click().is_err());
    }

    #[test]
    fn positive_delta_scrolls_down_in_pixels() {
        let (scene, _, list, _) = hud();
        let backend = LegacyBackend::new(scene.clone());
        let control = backend.resolve("HUD/Inventory").unwrap();
        control.scroll_by(100.0).unwrap();
        assert_eq!(control.value(), Some(serde_json::json!(0.75)));
        control.scroll_by(-1000.0).unwrap();
        assert_eq!(control.value(), Some(serde_json::json!(1.0)));
        assert_eq!(scene.read().unwrap().object(list).unwrap().events.len(), 2);
    }
}
