use crate::errors::SentinelResult;
use crate::ui::types::{ElementDescriptor, ElementKind, ElementState, UiSystem};
use crate::ui::walk::{self, PathCounter};

/// Uniform capability surface over one resolved element, whatever paradigm
/// it lives in. Adapters re-read the live tree on every call.
pub trait UiControl: Send + Sync {
    fn path(&self) -> &str;
    fn name(&self) -> String;
    fn ui_system(&self) -> UiSystem;
    fn kind(&self) -> ElementKind;

    fn is_enabled(&self) -> bool;
    /// Displayed and visible, ignoring pointer eligibility.
    fn is_visible(&self) -> bool;
    /// Positioned for pointer interaction, displayed and visible.
    fn is_interactable(&self) -> bool;

    fn text(&self) -> String;
    /// Kind-specific value (toggle state, slider value, scroll offset, ...).
    fn value(&self) -> Option<serde_json::Value> {
        None
    }

    fn set_text(&self, text: &str) -> SentinelResult<()>;
    fn invoke_click(&self) -> SentinelResult<()>;
    /// `delta` in pixels, positive moves further down the content.
    fn scroll_by(&self, delta: f32) -> SentinelResult<()>;

    fn state(&self) -> ElementState {
        ElementState {
            path: self.path().to_string(),
            name: self.name(),
            kind: self.kind(),
            ui_system: self.ui_system(),
            text: self.text(),
            enabled: self.is_enabled(),
            visible: self.is_visible(),
            interactable: self.is_interactable(),
            value: self.value(),
        }
    }
}

/// One UI paradigm the engine can walk and address.
pub trait UiBackend: Send + Sync {
    fn system(&self) -> UiSystem;

    /// Interactable controls plus visible non-empty labels, in traversal
    /// order. Paths are made unique through `paths`, which the surface shares
    /// across paradigms.
    fn collect_into(&self, paths: &mut PathCounter) -> Vec<ElementDescriptor>;

    /// Element whose walk path equals `path`. Always walks the whole tree so
    /// `paths` ends in the same state as after `collect_into`.
    fn resolve_exact(&self, path: &str, paths: &mut PathCounter) -> Option<Box<dyn UiControl>>;

    /// First element named `name` in breadth-first order across all roots.
    fn find_by_name(&self, name: &str, paths: &mut PathCounter) -> Option<Box<dyn UiControl>>;

    fn collect(&self) -> Vec<ElementDescriptor> {
        self.collect_into(&mut PathCounter::default())
    }

    /// Exact path, then trailing name, within this paradigm alone.
    fn resolve(&self, path: &str) -> Option<Box<dyn UiControl>> {
        self.resolve_exact(path, &mut PathCounter::default())
            .or_else(|| self.find_by_name(walk::trailing_segment(path), &mut PathCounter::default()))
    }
}

/// Inclusion rule shared by both paradigms.
pub(crate) fn should_report(kind: ElementKind, interactable: bool, visible: bool, text: &str) -> bool {
    if kind.is_control() {
        return interactable;
    }
    kind == ElementKind::Label && visible && !text.trim().is_empty()
}
