use crate::errors::{SentinelError, SentinelResult};
use crate::ui::types::{ElementState, HierarchySnapshot};
use crate::ui::UiSurface;

/// Read-only discovery over every paradigm on the surface. Nothing is cached:
/// each call walks the live trees again.
#[derive(Clone)]
pub struct UiInspector {
    surface: UiSurface,
}

impl UiInspector {
    pub fn new(surface: UiSurface) -> Self {
        Self { surface }
    }

    pub fn get_ui_hierarchy(&self) -> HierarchySnapshot {
        let elements = self.surface.collect();
        let snapshot = HierarchySnapshot::from_elements(elements);
        tracing::debug!(
            ui_type = ?snapshot.ui_type,
            toolkit = snapshot.toolkit_count,
            legacy = snapshot.legacy_count,
            "UI hierarchy collected"
        );
        snapshot
    }

    /// Snapshot serialized as pretty JSON for the model.
    pub fn hierarchy_json(&self) -> SentinelResult<String> {
        Ok(serde_json::to_string_pretty(&self.get_ui_hierarchy())?)
    }

    pub fn element_exists(&self, path: &str) -> bool {
        self.surface.resolve(path).is_some()
    }

    pub fn get_element_state(&self, path: &str) -> SentinelResult<ElementState> {
        self.surface
            .resolve(path)
            .map(|control| control.state())
            .ok_or_else(|| SentinelError::element_not_found(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::legacy::{SceneGraph, SceneObject};
    use crate::ui::toolkit::{ToolkitNode, ToolkitTree};
    use crate::ui::types::{ElementKind, UiAggregate, UiSystem};

    fn both() -> UiInspector {
        let mut tree = ToolkitTree::new();
        let panel = tree.add_panel("Settings");
        tree.add_child(panel, ToolkitNode::toggle("Music", "Music", true));

        let mut scene = SceneGraph::new();
        let canvas = scene.add_canvas("HUD");
        scene.add_child(canvas, SceneObject::button("Pause"));

        UiInspector::new(UiSurface::from_trees(
            Some(tree.into_shared()),
            Some(scene.into_shared()),
        ))
    }

    #[test]
    fn snapshot_tags_paradigms() {
        let snapshot = both().get_ui_hierarchy();
        assert_eq!(snapshot.ui_type, UiAggregate::Both);
        assert_eq!(snapshot.toolkit_count, 1);
        assert_eq!(snapshot.legacy_count, 1);
        assert_eq!(snapshot.elements[0].ui_system, UiSystem::Toolkit);
        assert_eq!(snapshot.elements[1].ui_system, UiSystem::Legacy);
    }

    #[test]
    fn empty_surface_reports_none() {
        let inspector = UiInspector::new(UiSurface::empty());
        let snapshot = inspector.get_ui_hierarchy();
        assert_eq!(snapshot.ui_type, UiAggregate::None);
        assert!(snapshot.elements.is_empty());
        assert!(!inspector.element_exists("anything"));
    }

    #[test]
    fn state_query_reports_value() {
        let state = both().get_element_state("Settings/Music").unwrap();
        assert_eq!(state.kind, ElementKind::Toggle);
        assert_eq!(state.value, Some(serde_json::json!(true)));
        assert!(state.enabled && state.visible && state.interactable);
    }

    #[test]
    fn missing_state_carries_path() {
        let err = both().get_element_state("Nowhere/Thing").unwrap_err();
        match err {
            SentinelError::ElementNotFound { path } => assert_eq!(path, "Nowhere/Thing"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn json_uses_type_key() {
        let json = both().hierarchy_json().unwrap();
        assert!(json.contains("\"type\": \"toggle\""));
        assert!(json.contains("\"ui_type\": \"Both\""));
    }
}
