pub mod fixture;
pub mod inspector;
pub mod interactor;
pub mod legacy;
pub mod toolkit;
pub mod traits;
pub mod types;
pub mod walk;

use std::sync::Arc;

use crate::ui::legacy::{LegacyBackend, SharedScene};
use crate::ui::toolkit::{SharedToolkit, ToolkitBackend};
use crate::ui::traits::{UiBackend, UiControl};
use crate::ui::types::ElementDescriptor;
use crate::ui::walk::PathCounter;

/// The live UI as seen by the automation engine: an ordered list of paradigm
/// backends, Toolkit before Legacy. Paths are unique across the whole surface:
/// a path repeated in a later paradigm continues the earlier one's `#n` count.
#[derive(Clone, Default)]
pub struct UiSurface {
    backends: Vec<Arc<dyn UiBackend>>,
}

impl UiSurface {
    pub fn new(backends: Vec<Arc<dyn UiBackend>>) -> Self {
        Self { backends }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_trees(toolkit: Option<SharedToolkit>, legacy: Option<SharedScene>) -> Self {
        let mut backends: Vec<Arc<dyn UiBackend>> = Vec::new();
        if let Some(tree) = toolkit {
            backends.push(Arc::new(ToolkitBackend::new(tree)));
        }
        if let Some(scene) = legacy {
            backends.push(Arc::new(LegacyBackend::new(scene)));
        }
        Self { backends }
    }

    /// Every reported element across paradigms, in backend order.
    pub fn collect(&self) -> Vec<ElementDescriptor> {
        let mut paths = PathCounter::default();
        self.backends
            .iter()
            .flat_map(|b| b.collect_into(&mut paths))
            .collect()
    }

    /// Exact path in every paradigm first, then the trailing name segment in
    /// every paradigm.
    pub fn resolve(&self, path: &str) -> Option<Box<dyn UiControl>> {
        let mut paths = PathCounter::default();
        for backend in &self.backends {
            if let Some(control) = backend.resolve_exact(path, &mut paths) {
                return Some(control);
            }
        }

        let name = walk::trailing_segment(path);
        let mut paths = PathCounter::default();
        for backend in &self.backends {
            if let Some(control) = backend.find_by_name(name, &mut paths) {
                tracing::debug!(path, resolved = control.path(), system = ?backend.system(), "resolved by trailing name");
                return Some(control);
            }
        }
        tracing::trace!(path, "not resolved in any paradigm");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::legacy::{Component, SceneGraph, SceneObject};
    use crate::ui::toolkit::{ToolkitNode, ToolkitTree};
    use crate::ui::types::UiSystem;

    fn pause_in(toolkit_panel: &str) -> (UiSurface, SharedToolkit, SharedScene, walk::NodeId, walk::NodeId) {
        let mut tree = ToolkitTree::new();
        let panel = tree.add_panel(toolkit_panel);
        let menu_pause = tree.add_child(panel, ToolkitNode::button("Pause", "Pause"));
        let tree = tree.into_shared();

        let mut scene = SceneGraph::new();
        let canvas = scene.add_canvas("HUD");
        let hud_pause = scene.add_child(canvas, SceneObject::button("Pause"));
        let scene = scene.into_shared();

        let surface = UiSurface::from_trees(Some(tree.clone()), Some(scene.clone()));
        (surface, tree, scene, menu_pause, hud_pause)
    }

    fn legacy_clicks(scene: &SharedScene, id: walk::NodeId) -> u32 {
        let s = scene.read().unwrap();
        s.object(id)
            .unwrap()
            .components
            .iter()
            .find_map(|c| match c {
                Component::Button { clicks, .. } => Some(*clicks),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn exact_path_in_a_later_paradigm_beats_a_name_match() {
        let (surface, tree, scene, menu_pause, hud_pause) = pause_in("Menu");

        let control = surface.resolve("HUD/Pause").unwrap();
        assert_eq!(control.ui_system(), UiSystem::Legacy);
        assert_eq!(control.path(), "HUD/Pause");

        control.invoke_click().unwrap();
        assert_eq!(legacy_clicks(&scene, hud_pause), 1);
        assert!(tree.read().unwrap().node(menu_pause).unwrap().events.is_empty());

        // Bare names still fall back to the first paradigm.
        assert_eq!(surface.resolve("Pause").unwrap().ui_system(), UiSystem::Toolkit);
    }

    #[test]
    fn repeated_paths_stay_unique_across_paradigms() {
        let (surface, _, scene, _, hud_pause) = pause_in("HUD");

        let paths: Vec<(UiSystem, String)> = surface
            .collect()
            .into_iter()
            .map(|e| (e.ui_system, e.path))
            .collect();
        assert_eq!(
            paths,
            vec![
                (UiSystem::Toolkit, "HUD/Pause".to_string()),
                (UiSystem::Legacy, "HUD/Pause#2".to_string()),
            ]
        );

        let control = surface.resolve("HUD/Pause#2").unwrap();
        assert_eq!(control.ui_system(), UiSystem::Legacy);
        assert_eq!(control.path(), "HUD/Pause#2");
        control.invoke_click().unwrap();
        assert_eq!(legacy_clicks(&scene, hud_pause), 1);
    }
}
